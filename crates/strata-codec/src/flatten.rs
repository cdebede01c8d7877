use std::collections::BTreeMap;

use strata_schema::{reference_name, FieldKind, FieldMut, FieldRef, Modelable, Schema};
use strata_types::{CastError, Key, Property, PropertyList, Value};

use crate::error::{CodecError, CodecResult};

/// Flatten the entity's own record.
///
/// Nested entities contribute only their key, and only once they have one.
pub fn flatten(entity: &dyn Modelable, schema: &Schema) -> CodecResult<PropertyList> {
    let mut props = PropertyList::new();
    for field in schema.fields() {
        let name = field.name;
        let access = entity.field(name);
        match (&field.kind, access) {
            (FieldKind::Scalar, Some(FieldRef::Value(v))) => {
                props.push(Property::new(name, v));
            }
            (FieldKind::Repeated, Some(FieldRef::Values(vs))) => {
                for v in vs {
                    props.push(Property::multi(name, v));
                }
            }
            (FieldKind::Plain, Some(FieldRef::Plain(plain))) => {
                for (sub, v) in plain.save() {
                    props.push(Property::new(format!("{name}.{sub}"), v));
                }
            }
            (FieldKind::PlainList, Some(FieldRef::PlainList(items))) => {
                for item in items {
                    for (sub, v) in item.save() {
                        props.push(Property::multi(format!("{name}.{sub}"), v));
                    }
                }
            }
            (FieldKind::Entity(_), Some(FieldRef::Entity(child))) => {
                if let Some(key) = child.model().key() {
                    props.push(Property::new(
                        reference_name(schema.kind(), name),
                        Value::Key(key.clone()),
                    ));
                }
            }
            (FieldKind::Reference { .. }, Some(FieldRef::Reference(key))) => {
                if let Some(key) = key {
                    props.push(Property::new(
                        reference_name(schema.kind(), name),
                        Value::Key(key.clone()),
                    ));
                }
            }
            _ => return Err(accessor(schema, name)),
        }
    }
    Ok(props)
}

/// Load a record into the entity.
///
/// Fields absent from `props` are reset to their zero value. Nested entities
/// receive only their key; their own fields are left for the caller to load.
pub fn unflatten(props: &PropertyList, schema: &Schema, entity: &mut dyn Modelable) -> CodecResult<()> {
    let kind = schema.kind();
    for field in schema.fields() {
        let name = field.name;
        let cast = |source: CastError| CodecError::Cast {
            kind,
            field: name.to_string(),
            source,
        };
        match (&field.kind, entity.field_mut(name)) {
            (FieldKind::Scalar, Some(FieldMut::Value(slot))) => {
                let v = props.get(name).cloned().unwrap_or(Value::Null);
                slot.assign(v).map_err(cast)?;
            }
            (FieldKind::Repeated, Some(FieldMut::Values(slot))) => {
                slot.assign_all(props.values(name).cloned().collect())
                    .map_err(cast)?;
            }
            (FieldKind::Plain, Some(FieldMut::Plain(plain))) => {
                for (sub, _) in plain.save() {
                    let v = props
                        .get(&format!("{name}.{sub}"))
                        .cloned()
                        .unwrap_or(Value::Null);
                    plain.load(sub, v).map_err(|source| CodecError::Cast {
                        kind,
                        field: format!("{name}.{sub}"),
                        source,
                    })?;
                }
            }
            (FieldKind::PlainList, Some(FieldMut::PlainList(slot))) => {
                // Element i is rebuilt from the i-th value of each sub-property.
                let mut columns: BTreeMap<&str, Vec<Value>> = BTreeMap::new();
                for (sub, v) in props.nested(name) {
                    columns.entry(sub).or_default().push(v.clone());
                }
                let len = columns.values().map(Vec::len).max().unwrap_or(0);
                slot.reset(len);
                for (sub, values) in columns {
                    for (i, v) in values.into_iter().enumerate() {
                        if let Some(element) = slot.element_mut(i) {
                            element.load(sub, v).map_err(|source| CodecError::Cast {
                                kind,
                                field: format!("{name}.{sub}"),
                                source,
                            })?;
                        }
                    }
                }
            }
            (FieldKind::Entity(_), Some(FieldMut::Entity(child))) => {
                match stored_key(props, kind, name).map_err(cast)? {
                    Some(key) => child.model_mut().set_key(key),
                    None => {
                        child.model_mut().clear_key();
                    }
                }
            }
            (FieldKind::Reference { .. }, Some(FieldMut::Reference(slot))) => {
                *slot = stored_key(props, kind, name).map_err(cast)?;
            }
            _ => return Err(accessor(schema, name)),
        }
    }
    Ok(())
}

/// `true` when every field of the entity, recursively, holds its zero value.
///
/// Keys do not count: a keyed entity whose fields are all zero is empty.
pub fn is_empty(entity: &dyn Modelable, schema: &Schema) -> CodecResult<bool> {
    for field in schema.fields() {
        let empty = match (&field.kind, entity.field(field.name)) {
            (FieldKind::Scalar, Some(FieldRef::Value(v))) => v.is_zero(),
            (FieldKind::Repeated, Some(FieldRef::Values(vs))) => vs.is_empty(),
            (FieldKind::Plain, Some(FieldRef::Plain(plain))) => plain.is_zero(),
            (FieldKind::PlainList, Some(FieldRef::PlainList(items))) => items.is_empty(),
            (FieldKind::Entity(nested), Some(FieldRef::Entity(child))) => is_empty(child, nested)?,
            (FieldKind::Reference { .. }, Some(FieldRef::Reference(key))) => key.is_none(),
            _ => return Err(accessor(schema, field.name)),
        };
        if !empty {
            return Ok(false);
        }
    }
    Ok(true)
}

fn stored_key(props: &PropertyList, kind: &str, field: &str) -> Result<Option<Key>, CastError> {
    match props.get(&reference_name(kind, field)) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Key(key)) => Ok(Some(key.clone())),
        Some(other) => Err(CastError::new("key", other.type_name())),
    }
}

fn accessor(schema: &Schema, field: &'static str) -> CodecError {
    CodecError::Accessor {
        kind: schema.kind(),
        field,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use strata_schema::fixtures::{
        sample_parent, Attribute, MultipleModel, NoModel, Parent, Pet,
    };
    use strata_schema::SchemaRegistry;

    use super::*;

    fn schema_of<T: strata_schema::Entity>() -> Arc<Schema> {
        SchemaRegistry::global().ensure::<T>().unwrap()
    }

    #[test]
    fn parent_record_holds_own_fields_and_child_keys() {
        let schema = schema_of::<Parent>();
        let mut parent = sample_parent("p", 3);
        parent.child.model.set_key(Key::new("Child", 9));

        let props = flatten(&parent, &schema).unwrap();
        assert_eq!(props.get("Name"), Some(&Value::from("p")));
        assert_eq!(props.get("Num"), Some(&Value::Int(3)));
        assert_eq!(props.get("Nomo.Name"), Some(&Value::from("p-nomo")));
        assert_eq!(props.values("Tags").count(), 2);
        assert_eq!(
            props.get("Parent.Child"),
            Some(&Value::Key(Key::new("Child", 9)))
        );
        // Unkeyed children and child fields stay out of the parent record.
        assert!(!props.contains("Parent.ReadonlyChild"));
        assert!(!props.contains("Child.Name"));
    }

    #[test]
    fn unflatten_restores_fields_and_child_keys() {
        let schema = schema_of::<Parent>();
        let mut parent = sample_parent("p", 3);
        parent.child.model.set_key(Key::new("Child", 9));
        let props = flatten(&parent, &schema).unwrap();

        let mut loaded = Parent::default();
        unflatten(&props, &schema, &mut loaded).unwrap();
        assert_eq!(loaded.name, "p");
        assert_eq!(loaded.num, 3);
        assert_eq!(loaded.nomo, parent.nomo);
        assert_eq!(loaded.tags, parent.tags);
        assert_eq!(loaded.child.model.key(), Some(&Key::new("Child", 9)));
        assert!(loaded.child.name.is_empty());
        assert!(loaded.readonly_child.model.key().is_none());
    }

    #[test]
    fn unflatten_resets_absent_fields() {
        let schema = schema_of::<Parent>();
        let mut parent = sample_parent("stale", 7);
        parent.empty_child.model.set_key(Key::new("EmptyChild", 1));
        unflatten(&PropertyList::new(), &schema, &mut parent).unwrap();
        assert!(parent.name.is_empty());
        assert_eq!(parent.num, 0);
        assert!(parent.tags.is_empty());
        assert_eq!(parent.nomo, NoModel::default());
        assert!(parent.empty_child.model.key().is_none());
    }

    #[test]
    fn type_mismatch_reports_field() {
        let schema = schema_of::<Parent>();
        let props = PropertyList::from(vec![Property::new("Num", "eleven")]);
        let err = unflatten(&props, &schema, &mut Parent::default()).unwrap_err();
        match err {
            CodecError::Cast { kind, field, .. } => {
                assert_eq!(kind, "Parent");
                assert_eq!(field, "Num");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn plain_list_zips_by_index() {
        let schema = schema_of::<MultipleModel>();
        let multiple = MultipleModel {
            attributes: vec![
                Attribute::new("color", "red"),
                Attribute::new("size", "xl"),
            ],
            ..Default::default()
        };
        let props = flatten(&multiple, &schema).unwrap();
        let names: Vec<_> = props.values("Attributes.Name").collect();
        assert_eq!(names, vec![&Value::from("color"), &Value::from("size")]);

        let mut loaded = MultipleModel::default();
        unflatten(&props, &schema, &mut loaded).unwrap();
        assert_eq!(loaded.attributes, multiple.attributes);
    }

    #[test]
    fn reference_round_trips_without_loading() {
        let schema = schema_of::<Pet>();
        let pet = Pet {
            name: "rex".into(),
            owner: Some(Key::new("Parent", 4)),
            ..Default::default()
        };
        let props = flatten(&pet, &schema).unwrap();
        assert_eq!(
            props.get("Pet.Owner"),
            Some(&Value::Key(Key::new("Parent", 4)))
        );
        let mut loaded = Pet::default();
        unflatten(&props, &schema, &mut loaded).unwrap();
        assert_eq!(loaded.owner, pet.owner);
    }

    #[test]
    fn emptiness_is_recursive_and_ignores_keys() {
        let schema = schema_of::<Parent>();
        let mut parent = Parent::default();
        parent.model.set_key(Key::new("Parent", 1));
        assert!(is_empty(&parent, &schema).unwrap());

        parent.child.grandchild.grandchild_num = 1;
        assert!(!is_empty(&parent, &schema).unwrap());

        let child_schema = schema.field("EmptyChild").unwrap().nested().unwrap().clone();
        parent.empty_child.emptiness = 2;
        assert!(!is_empty(&parent.empty_child, &child_schema).unwrap());
    }

    proptest! {
        #[test]
        fn flatten_then_unflatten_preserves_parent_fields(
            name in "[a-z]{0,12}",
            num in any::<i64>(),
            tags in proptest::collection::vec("[a-z]{1,6}", 0..5),
            nomo in "[a-z]{0,8}",
        ) {
            let schema = schema_of::<Parent>();
            let parent = Parent {
                name,
                num,
                tags,
                nomo: NoModel { name: nomo },
                ..Default::default()
            };
            let props = flatten(&parent, &schema).unwrap();
            let mut loaded = Parent::default();
            unflatten(&props, &schema, &mut loaded).unwrap();
            prop_assert_eq!(loaded, parent);
        }
    }
}
