use std::any::TypeId;
use std::sync::Arc;

use crate::error::SchemaError;

/// Write policy of a nested entity field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Policy {
    /// Always written along with the parent.
    #[default]
    Always,
    /// Skipped (and its key left unset) while every field is a zero value.
    Zero,
    /// Written once at creation, never on update.
    Readonly,
}

impl Policy {
    /// Parse a field annotation. The empty annotation means [`Policy::Always`].
    pub fn parse(annotation: &str) -> Option<Self> {
        match annotation.trim() {
            "" | "always" => Some(Self::Always),
            "zero" => Some(Self::Zero),
            "readonly" => Some(Self::Readonly),
            _ => None,
        }
    }
}

/// How a field is persisted.
#[derive(Clone, Debug, PartialEq)]
pub enum FieldKind {
    Scalar,
    Repeated,
    Plain,
    PlainList,
    Entity(Arc<Schema>),
    Reference { target: &'static str },
}

/// One persistent field of a schema.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub kind: FieldKind,
    pub policy: Policy,
}

impl FieldDescriptor {
    /// The nested schema, for entity fields.
    pub fn nested(&self) -> Option<&Arc<Schema>> {
        match &self.kind {
            FieldKind::Entity(schema) => Some(schema),
            _ => None,
        }
    }

    /// `true` for fields whose stored property is a key (nested entities and
    /// references).
    pub fn is_keyed(&self) -> bool {
        matches!(self.kind, FieldKind::Entity(_) | FieldKind::Reference { .. })
    }
}

/// The computed schema of an entity type.
#[derive(Debug, PartialEq)]
pub struct Schema {
    kind: &'static str,
    type_id: TypeId,
    fields: Vec<FieldDescriptor>,
}

impl Schema {
    pub(crate) fn new(
        kind: &'static str,
        type_id: TypeId,
        fields: Vec<FieldDescriptor>,
    ) -> Result<Self, SchemaError> {
        if kind.is_empty() {
            return Err(SchemaError::EmptyKind);
        }
        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(SchemaError::DuplicateField {
                    kind,
                    field: field.name,
                });
            }
        }
        Ok(Self {
            kind,
            type_id,
            fields,
        })
    }

    pub fn kind(&self) -> &'static str {
        self.kind
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Resolve a dot-separated path through nested entity schemas.
    ///
    /// `"Child.Grandchild.GrandchildNum"` resolves on a schema whose `Child`
    /// field nests a schema with a `Grandchild` field, and so on.
    pub fn resolve(&self, path: &str) -> Option<&FieldDescriptor> {
        match path.split_once('.') {
            None => self.field(path),
            Some((head, rest)) => self.field(head)?.nested()?.resolve(rest),
        }
    }

    /// Every field reachable from this schema, depth-first in declaration
    /// order, with its dot-joined path.
    pub fn walk(&self) -> Vec<(String, &FieldDescriptor)> {
        let mut out = Vec::new();
        self.walk_into("", &mut out);
        out
    }

    fn walk_into<'a>(&'a self, prefix: &str, out: &mut Vec<(String, &'a FieldDescriptor)>) {
        for field in &self.fields {
            let path = if prefix.is_empty() {
                field.name.to_string()
            } else {
                format!("{prefix}.{}", field.name)
            };
            if let Some(nested) = field.nested() {
                out.push((path.clone(), field));
                nested.walk_into(&path, out);
            } else {
                out.push((path, field));
            }
        }
    }
}

/// Property name under which `kind` stores the key held by `field`.
///
/// Used for nested entity and reference fields, and by queries that filter
/// on them.
pub fn reference_name(kind: &str, field: &str) -> String {
    format!("{kind}.{field}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parse() {
        assert_eq!(Policy::parse(""), Some(Policy::Always));
        assert_eq!(Policy::parse("zero"), Some(Policy::Zero));
        assert_eq!(Policy::parse(" readonly "), Some(Policy::Readonly));
        assert_eq!(Policy::parse("sometimes"), None);
    }

    #[test]
    fn duplicate_fields_rejected() {
        let field = FieldDescriptor {
            name: "Name",
            kind: FieldKind::Scalar,
            policy: Policy::Always,
        };
        let err = Schema::new("Dup", TypeId::of::<u8>(), vec![field.clone(), field]).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateField {
                kind: "Dup",
                field: "Name"
            }
        );
    }

    #[test]
    fn reference_name_joins_kind_and_field() {
        assert_eq!(reference_name("Parent", "Child"), "Parent.Child");
    }
}
