use std::any::TypeId;
use std::fmt;

use crate::entity::Entity;

/// Static description of an entity type: its kind and field declarations.
#[derive(Clone, Copy)]
pub struct TypeDecl {
    pub kind: &'static str,
    pub type_id: TypeId,
    pub fields: fn() -> Vec<FieldDecl>,
}

impl TypeDecl {
    pub fn of<T: Entity>() -> Self {
        Self {
            kind: T::KIND,
            type_id: TypeId::of::<T>(),
            fields: T::fields,
        }
    }
}

impl fmt::Debug for TypeDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeDecl").field("kind", &self.kind).finish()
    }
}

/// The declared shape of a field.
#[derive(Clone, Copy, Debug)]
pub enum FieldShape {
    /// A single scalar value.
    Value,
    /// A list of scalar values, stored as a multi-valued property.
    Repeated,
    /// A plain composite value stored inline.
    Plain,
    /// A list of plain composite values.
    PlainList,
    /// A nested entity with its own record.
    Entity(TypeDecl),
    /// The key of another entity, stored without loading it.
    Reference(&'static str),
}

/// One persistent field declaration.
///
/// ```ignore
/// fn fields() -> Vec<FieldDecl> {
///     vec![
///         FieldDecl::value("Name"),
///         FieldDecl::entity::<EmptyChild>("EmptyChild").annotated("zero"),
///     ]
/// }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct FieldDecl {
    pub name: &'static str,
    pub shape: FieldShape,
    /// Raw annotation text; only meaningful on nested entity fields.
    pub annotation: &'static str,
}

impl FieldDecl {
    fn new(name: &'static str, shape: FieldShape) -> Self {
        Self {
            name,
            shape,
            annotation: "",
        }
    }

    pub fn value(name: &'static str) -> Self {
        Self::new(name, FieldShape::Value)
    }

    pub fn repeated(name: &'static str) -> Self {
        Self::new(name, FieldShape::Repeated)
    }

    pub fn plain(name: &'static str) -> Self {
        Self::new(name, FieldShape::Plain)
    }

    pub fn plain_list(name: &'static str) -> Self {
        Self::new(name, FieldShape::PlainList)
    }

    pub fn entity<T: Entity>(name: &'static str) -> Self {
        Self::new(name, FieldShape::Entity(TypeDecl::of::<T>()))
    }

    pub fn reference<T: Entity>(name: &'static str) -> Self {
        Self::new(name, FieldShape::Reference(T::KIND))
    }

    pub fn annotated(mut self, annotation: &'static str) -> Self {
        self.annotation = annotation;
        self
    }
}
