//! Entity capabilities and field access.
//!
//! [`Modelable`] is the object-safe half: model access plus field access by
//! declared name. [`Entity`] adds the static half (kind name and field
//! declarations) and is what typed entry points take.

use strata_types::{CastError, Key, Value, ValueType};

use crate::decl::FieldDecl;
use crate::model::Model;

/// Object-safe access to an entity instance.
///
/// Field names are the ones returned by [`Entity::fields`]; asking for an
/// undeclared name returns `None`.
pub trait Modelable: Send + Sync {
    fn model(&self) -> &Model;
    fn model_mut(&mut self) -> &mut Model;
    fn field(&self, name: &str) -> Option<FieldRef<'_>>;
    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>>;
}

/// A persistable entity type.
pub trait Entity: Modelable + Default + 'static {
    /// Store kind name. Unique per type within a store.
    const KIND: &'static str;

    /// Declared persistent fields, in declaration order.
    fn fields() -> Vec<FieldDecl>;
}

/// Kind and key of any entity, for operations that address records by key
/// across entity types.
pub trait Keyed: Send + Sync {
    fn kind(&self) -> &'static str;
    fn key(&self) -> Option<&Key>;
}

impl<T: Entity> Keyed for T {
    fn kind(&self) -> &'static str {
        T::KIND
    }

    fn key(&self) -> Option<&Key> {
        self.model().key()
    }
}

/// Read access to one declared field.
pub enum FieldRef<'a> {
    Value(Value),
    Values(Vec<Value>),
    Plain(&'a dyn PlainValue),
    PlainList(Vec<&'a dyn PlainValue>),
    Entity(&'a dyn Modelable),
    Reference(Option<&'a Key>),
}

impl<'a> FieldRef<'a> {
    pub fn value<T: ValueType>(v: &T) -> Self {
        Self::Value(v.to_value())
    }

    pub fn values<T: ValueType>(vs: &[T]) -> Self {
        Self::Values(vs.iter().map(ValueType::to_value).collect())
    }

    pub fn plain_list<T: PlainValue>(vs: &'a [T]) -> Self {
        Self::PlainList(vs.iter().map(|v| v as &dyn PlainValue).collect())
    }

    pub fn reference(key: &'a Option<Key>) -> Self {
        Self::Reference(key.as_ref())
    }
}

/// Write access to one declared field.
pub enum FieldMut<'a> {
    Value(&'a mut dyn ValueSlot),
    Values(&'a mut dyn ValuesSlot),
    Plain(&'a mut dyn PlainValue),
    PlainList(&'a mut dyn PlainListSlot),
    Entity(&'a mut dyn Modelable),
    Reference(&'a mut Option<Key>),
}

/// A scalar field that can be assigned from a stored value.
///
/// `Value::Null` resets the field to its default.
pub trait ValueSlot: Send {
    fn assign(&mut self, value: Value) -> Result<(), CastError>;
}

impl<T: ValueType> ValueSlot for T {
    fn assign(&mut self, value: Value) -> Result<(), CastError> {
        *self = T::from_value(value)?;
        Ok(())
    }
}

/// A repeated scalar field.
pub trait ValuesSlot: Send {
    fn assign_all(&mut self, values: Vec<Value>) -> Result<(), CastError>;
}

impl<T: ValueType> ValuesSlot for Vec<T> {
    fn assign_all(&mut self, values: Vec<Value>) -> Result<(), CastError> {
        *self = values
            .into_iter()
            .map(T::from_value)
            .collect::<Result<_, _>>()?;
        Ok(())
    }
}

/// A plain composite value stored inline in its owner's record.
///
/// Sub-values persist as `<field>.<name>` properties. Plain values have no
/// key of their own and are never recursed into as entities.
pub trait PlainValue: Send + Sync {
    /// Sub-values to persist, in a stable order.
    fn save(&self) -> Vec<(&'static str, Value)>;

    /// Assign one stored sub-value. Unknown names are ignored.
    fn load(&mut self, name: &str, value: Value) -> Result<(), CastError>;

    /// `true` if every sub-value is a zero value.
    fn is_zero(&self) -> bool {
        self.save().iter().all(|(_, v)| v.is_zero())
    }
}

/// A repeated plain value field.
pub trait PlainListSlot: Send {
    /// Replace the contents with `len` default elements.
    fn reset(&mut self, len: usize);

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn PlainValue>;
}

impl<T: PlainValue + Default> PlainListSlot for Vec<T> {
    fn reset(&mut self, len: usize) {
        self.clear();
        self.resize_with(len, T::default);
    }

    fn element_mut(&mut self, index: usize) -> Option<&mut dyn PlainValue> {
        self.get_mut(index).map(|e| e as &mut dyn PlainValue)
    }
}
