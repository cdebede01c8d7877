//! Compute-once schema cache.
//!
//! Each entity type gets one cell. Nested schemas are resolved before the
//! parent's cell is initialised, so a build never re-enters the registry
//! while holding a cell. Concurrent first uses of the same type block on the
//! cell and all observe the single result.

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, RwLock};

use tracing::debug;

use crate::decl::{FieldDecl, FieldShape, TypeDecl};
use crate::entity::{Entity, FieldMut, Modelable};
use crate::error::SchemaError;
use crate::schema::{FieldDescriptor, FieldKind, Policy, Schema};

type Cell = Arc<OnceLock<Result<Arc<Schema>, SchemaError>>>;

/// Cache of computed schemas keyed by entity type.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    cells: RwLock<HashMap<TypeId, Cell>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide registry.
    pub fn global() -> &'static SchemaRegistry {
        static GLOBAL: OnceLock<SchemaRegistry> = OnceLock::new();
        GLOBAL.get_or_init(SchemaRegistry::new)
    }

    /// Schema of `T`, computing and caching it (and every nested schema) on
    /// first use.
    pub fn ensure<T: Entity>(&self) -> Result<Arc<Schema>, SchemaError> {
        self.ensure_decl(&TypeDecl::of::<T>())
    }

    /// Schema for a type declaration.
    pub fn ensure_decl(&self, decl: &TypeDecl) -> Result<Arc<Schema>, SchemaError> {
        self.resolve(decl, &mut Vec::new())
    }

    /// Ensure the schema of `T` and mark `entity` and every nested entity
    /// as registered.
    pub fn index<T: Entity>(&self, entity: &mut T) -> Result<Arc<Schema>, SchemaError> {
        let schema = self.ensure::<T>()?;
        mark_registered(entity, &schema);
        Ok(schema)
    }

    /// Already-computed schema of `T`, without computing it.
    pub fn get<T: Entity>(&self) -> Option<Arc<Schema>> {
        self.lookup(TypeId::of::<T>())
    }

    /// Number of types with a computed schema.
    pub fn len(&self) -> usize {
        let cells = self.cells.read().expect("lock poisoned");
        cells.values().filter(|c| matches!(c.get(), Some(Ok(_)))).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lookup(&self, type_id: TypeId) -> Option<Arc<Schema>> {
        let cells = self.cells.read().expect("lock poisoned");
        match cells.get(&type_id)?.get()? {
            Ok(schema) => Some(Arc::clone(schema)),
            Err(_) => None,
        }
    }

    fn cell(&self, type_id: TypeId) -> Cell {
        if let Some(cell) = self.cells.read().expect("lock poisoned").get(&type_id) {
            return Arc::clone(cell);
        }
        let mut cells = self.cells.write().expect("lock poisoned");
        Arc::clone(cells.entry(type_id).or_default())
    }

    fn resolve(
        &self,
        decl: &TypeDecl,
        visiting: &mut Vec<TypeDecl>,
    ) -> Result<Arc<Schema>, SchemaError> {
        let cell = self.cell(decl.type_id);
        if let Some(done) = cell.get() {
            return done.clone();
        }
        if visiting.iter().any(|d| d.type_id == decl.type_id) {
            let mut path: Vec<&str> = visiting.iter().map(|d| d.kind).collect();
            path.push(decl.kind);
            return Err(SchemaError::Cycle {
                kind: decl.kind,
                path: path.join(" -> "),
            });
        }

        let fields = (decl.fields)();
        visiting.push(*decl);
        let mut kinds = Vec::with_capacity(fields.len());
        for field in &fields {
            kinds.push(match field.shape {
                FieldShape::Value => FieldKind::Scalar,
                FieldShape::Repeated => FieldKind::Repeated,
                FieldShape::Plain => FieldKind::Plain,
                FieldShape::PlainList => FieldKind::PlainList,
                FieldShape::Entity(child) => FieldKind::Entity(self.resolve(&child, visiting)?),
                FieldShape::Reference(target) => FieldKind::Reference { target },
            });
        }
        visiting.pop();

        cell.get_or_init(|| {
            let schema = build(decl, &fields, kinds).map(Arc::new);
            match &schema {
                Ok(s) => debug!(kind = s.kind(), fields = s.fields().len(), "schema indexed"),
                Err(e) => debug!(kind = decl.kind, error = %e, "schema rejected"),
            }
            schema
        })
        .clone()
    }
}

fn build(
    decl: &TypeDecl,
    fields: &[FieldDecl],
    kinds: Vec<FieldKind>,
) -> Result<Schema, SchemaError> {
    let mut descriptors = Vec::with_capacity(fields.len());
    for (field, kind) in fields.iter().zip(kinds) {
        // Annotations only carry meaning on nested entities.
        let policy = match kind {
            FieldKind::Entity(_) => {
                Policy::parse(field.annotation).ok_or(SchemaError::InvalidAnnotation {
                    kind: decl.kind,
                    field: field.name,
                    annotation: field.annotation,
                })?
            }
            _ => Policy::Always,
        };
        descriptors.push(FieldDescriptor {
            name: field.name,
            kind,
            policy,
        });
    }
    Schema::new(decl.kind, decl.type_id, descriptors)
}

fn mark_registered(entity: &mut dyn Modelable, schema: &Schema) {
    entity.model_mut().mark_registered();
    for field in schema.fields() {
        if let Some(nested) = field.nested() {
            if let Some(FieldMut::Entity(child)) = entity.field_mut(field.name) {
                mark_registered(child, nested);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;
    use crate::fixtures::{Child, EmptyChild, Grandchild, MultipleModel, Parent, Pet};
    use crate::model::Model;
    use crate::entity::{FieldRef, Modelable};

    #[test]
    fn parent_schema_policies() {
        let registry = SchemaRegistry::new();
        let schema = registry.ensure::<Parent>().unwrap();
        assert_eq!(schema.kind(), "Parent");
        assert_eq!(schema.field("Child").unwrap().policy, Policy::Always);
        assert_eq!(schema.field("EmptyChild").unwrap().policy, Policy::Zero);
        assert_eq!(schema.field("ReadonlyChild").unwrap().policy, Policy::Readonly);
        assert_eq!(schema.field("Nomo").unwrap().kind, FieldKind::Plain);
        assert_eq!(schema.field("Tags").unwrap().kind, FieldKind::Repeated);
    }

    #[test]
    fn nested_schemas_cached_independently() {
        let registry = SchemaRegistry::new();
        let parent = registry.ensure::<Parent>().unwrap();
        let child = registry.get::<Child>().expect("child indexed with parent");
        assert!(Arc::ptr_eq(parent.field("Child").unwrap().nested().unwrap(), &child));
        assert!(registry.get::<Grandchild>().is_some());
        assert!(registry.get::<EmptyChild>().is_some());
    }

    #[test]
    fn ensure_is_idempotent() {
        let registry = SchemaRegistry::new();
        let a = registry.ensure::<Parent>().unwrap();
        let b = registry.ensure::<Parent>().unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        let fresh = SchemaRegistry::new().ensure::<Parent>().unwrap();
        assert_eq!(*a, *fresh);
    }

    #[test]
    fn concurrent_first_use_builds_once() {
        let registry = Arc::new(SchemaRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.ensure::<Parent>().unwrap())
            })
            .collect();
        let schemas: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(schemas.iter().all(|s| Arc::ptr_eq(s, &schemas[0])));
    }

    #[test]
    fn resolve_and_walk_use_dotted_paths() {
        let schema = SchemaRegistry::new().ensure::<Parent>().unwrap();
        let gc = schema.resolve("Child.Grandchild.GrandchildNum").unwrap();
        assert_eq!(gc.kind, FieldKind::Scalar);
        assert!(schema.resolve("Child.Nope").is_none());
        assert!(schema.resolve("Nomo.Name").is_none());

        let paths: Vec<String> = schema.walk().into_iter().map(|(p, _)| p).collect();
        assert!(paths.contains(&"Child.Grandchild.GrandchildNum".to_string()));
        assert!(paths.contains(&"ReadonlyChild.Value".to_string()));
    }

    #[test]
    fn reference_fields_record_target_kind() {
        let schema = SchemaRegistry::new().ensure::<Pet>().unwrap();
        assert_eq!(
            schema.field("Owner").unwrap().kind,
            FieldKind::Reference { target: "Parent" }
        );
    }

    #[test]
    fn index_marks_whole_graph_registered() {
        let registry = SchemaRegistry::new();
        let mut parent = Parent::default();
        registry.index(&mut parent).unwrap();
        assert!(parent.model.is_registered());
        assert!(parent.child.model.is_registered());
        assert!(parent.child.grandchild.model.is_registered());
        assert!(parent.readonly_child.model.is_registered());

        let mut multiple = MultipleModel::default();
        registry.index(&mut multiple).unwrap();
        assert!(multiple.model.is_registered());
    }

    // --- malformed declarations ---

    #[derive(Default)]
    struct Loop {
        model: Model,
    }

    impl Modelable for Loop {
        fn model(&self) -> &Model {
            &self.model
        }
        fn model_mut(&mut self) -> &mut Model {
            &mut self.model
        }
        fn field(&self, _name: &str) -> Option<FieldRef<'_>> {
            None
        }
        fn field_mut(&mut self, _name: &str) -> Option<FieldMut<'_>> {
            None
        }
    }

    impl Entity for Loop {
        const KIND: &'static str = "Loop";
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::entity::<Loop>("Again")]
        }
    }

    #[derive(Default)]
    struct BadTag {
        model: Model,
    }

    impl Modelable for BadTag {
        fn model(&self) -> &Model {
            &self.model
        }
        fn model_mut(&mut self) -> &mut Model {
            &mut self.model
        }
        fn field(&self, _name: &str) -> Option<FieldRef<'_>> {
            None
        }
        fn field_mut(&mut self, _name: &str) -> Option<FieldMut<'_>> {
            None
        }
    }

    impl Entity for BadTag {
        const KIND: &'static str = "BadTag";
        fn fields() -> Vec<FieldDecl> {
            vec![FieldDecl::entity::<Grandchild>("Child").annotated("sometimes")]
        }
    }

    #[test]
    fn self_nesting_is_a_cycle() {
        let err = SchemaRegistry::new().ensure::<Loop>().unwrap_err();
        assert!(matches!(err, SchemaError::Cycle { kind: "Loop", .. }));
    }

    #[test]
    fn unknown_annotation_rejected_and_cached() {
        let registry = SchemaRegistry::new();
        let err = registry.ensure::<BadTag>().unwrap_err();
        assert_eq!(
            err,
            SchemaError::InvalidAnnotation {
                kind: "BadTag",
                field: "Child",
                annotation: "sometimes"
            }
        );
        assert_eq!(registry.ensure::<BadTag>().unwrap_err(), err);
        assert!(registry.get::<BadTag>().is_none());
    }
}
