//! A small entity graph used across the workspace's tests and benches.
//!
//! `Parent` nests an always-written `Child` (which nests a `Grandchild`),
//! an `EmptyChild` written only when non-empty, and a `ReadonlyChild` written
//! only at creation. It also carries a plain `NoModel` value and a repeated
//! scalar. `MultipleModel` holds a list of plain `Attribute`s and `Pet`
//! references a `Parent` by key.

use strata_types::{CastError, Key, Value, ValueType};

use crate::decl::FieldDecl;
use crate::entity::{Entity, FieldMut, FieldRef, Modelable, PlainValue};
use crate::model::Model;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Parent {
    pub model: Model,
    pub name: String,
    pub num: i64,
    pub child: Child,
    pub empty_child: EmptyChild,
    pub readonly_child: ReadonlyChild,
    pub nomo: NoModel,
    pub tags: Vec<String>,
}

impl Modelable for Parent {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        Some(match name {
            "Name" => FieldRef::value(&self.name),
            "Num" => FieldRef::value(&self.num),
            "Child" => FieldRef::Entity(&self.child),
            "EmptyChild" => FieldRef::Entity(&self.empty_child),
            "ReadonlyChild" => FieldRef::Entity(&self.readonly_child),
            "Nomo" => FieldRef::Plain(&self.nomo),
            "Tags" => FieldRef::values(&self.tags),
            _ => return None,
        })
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        Some(match name {
            "Name" => FieldMut::Value(&mut self.name),
            "Num" => FieldMut::Value(&mut self.num),
            "Child" => FieldMut::Entity(&mut self.child),
            "EmptyChild" => FieldMut::Entity(&mut self.empty_child),
            "ReadonlyChild" => FieldMut::Entity(&mut self.readonly_child),
            "Nomo" => FieldMut::Plain(&mut self.nomo),
            "Tags" => FieldMut::Values(&mut self.tags),
            _ => return None,
        })
    }
}

impl Entity for Parent {
    const KIND: &'static str = "Parent";

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::value("Name"),
            FieldDecl::value("Num"),
            FieldDecl::entity::<Child>("Child"),
            FieldDecl::entity::<EmptyChild>("EmptyChild").annotated("zero"),
            FieldDecl::entity::<ReadonlyChild>("ReadonlyChild").annotated("readonly"),
            FieldDecl::plain("Nomo"),
            FieldDecl::repeated("Tags"),
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Child {
    pub model: Model,
    pub name: String,
    pub grandchild: Grandchild,
}

impl Modelable for Child {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "Name" => Some(FieldRef::value(&self.name)),
            "Grandchild" => Some(FieldRef::Entity(&self.grandchild)),
            _ => None,
        }
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match name {
            "Name" => Some(FieldMut::Value(&mut self.name)),
            "Grandchild" => Some(FieldMut::Entity(&mut self.grandchild)),
            _ => None,
        }
    }
}

impl Entity for Child {
    const KIND: &'static str = "Child";

    fn fields() -> Vec<FieldDecl> {
        vec![
            FieldDecl::value("Name"),
            FieldDecl::entity::<Grandchild>("Grandchild"),
        ]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Grandchild {
    pub model: Model,
    pub grandchild_num: i64,
}

impl Modelable for Grandchild {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        (name == "GrandchildNum").then(|| FieldRef::value(&self.grandchild_num))
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        if name == "GrandchildNum" {
            Some(FieldMut::Value(&mut self.grandchild_num))
        } else {
            None
        }
    }
}

impl Entity for Grandchild {
    const KIND: &'static str = "Grandchild";

    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::value("GrandchildNum")]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct EmptyChild {
    pub model: Model,
    pub emptiness: i64,
}

impl Modelable for EmptyChild {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        (name == "Emptiness").then(|| FieldRef::value(&self.emptiness))
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        if name == "Emptiness" {
            Some(FieldMut::Value(&mut self.emptiness))
        } else {
            None
        }
    }
}

impl Entity for EmptyChild {
    const KIND: &'static str = "EmptyChild";

    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::value("Emptiness")]
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReadonlyChild {
    pub model: Model,
    pub value: i64,
}

impl Modelable for ReadonlyChild {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        (name == "Value").then(|| FieldRef::value(&self.value))
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        if name == "Value" {
            Some(FieldMut::Value(&mut self.value))
        } else {
            None
        }
    }
}

impl Entity for ReadonlyChild {
    const KIND: &'static str = "ReadonlyChild";

    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::value("Value")]
    }
}

/// A plain value: no model, stored inline in its owner.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NoModel {
    pub name: String,
}

impl PlainValue for NoModel {
    fn save(&self) -> Vec<(&'static str, Value)> {
        vec![("Name", self.name.to_value())]
    }

    fn load(&mut self, name: &str, value: Value) -> Result<(), CastError> {
        if name == "Name" {
            self.name = String::from_value(value)?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

impl PlainValue for Attribute {
    fn save(&self) -> Vec<(&'static str, Value)> {
        vec![
            ("Name", self.name.to_value()),
            ("Value", self.value.to_value()),
        ]
    }

    fn load(&mut self, name: &str, value: Value) -> Result<(), CastError> {
        match name {
            "Name" => self.name = String::from_value(value)?,
            "Value" => self.value = String::from_value(value)?,
            _ => {}
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct MultipleModel {
    pub model: Model,
    pub attributes: Vec<Attribute>,
}

impl Modelable for MultipleModel {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        (name == "Attributes").then(|| FieldRef::plain_list(&self.attributes))
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        if name == "Attributes" {
            Some(FieldMut::PlainList(&mut self.attributes))
        } else {
            None
        }
    }
}

impl Entity for MultipleModel {
    const KIND: &'static str = "MultipleModel";

    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::plain_list("Attributes")]
    }
}

/// Holds a reference to a [`Parent`] without nesting it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Pet {
    pub model: Model,
    pub name: String,
    pub owner: Option<Key>,
}

impl Modelable for Pet {
    fn model(&self) -> &Model {
        &self.model
    }

    fn model_mut(&mut self) -> &mut Model {
        &mut self.model
    }

    fn field(&self, name: &str) -> Option<FieldRef<'_>> {
        match name {
            "Name" => Some(FieldRef::value(&self.name)),
            "Owner" => Some(FieldRef::reference(&self.owner)),
            _ => None,
        }
    }

    fn field_mut(&mut self, name: &str) -> Option<FieldMut<'_>> {
        match name {
            "Name" => Some(FieldMut::Value(&mut self.name)),
            "Owner" => Some(FieldMut::Reference(&mut self.owner)),
            _ => None,
        }
    }
}

impl Entity for Pet {
    const KIND: &'static str = "Pet";

    fn fields() -> Vec<FieldDecl> {
        vec![FieldDecl::value("Name"), FieldDecl::reference::<Parent>("Owner")]
    }
}

/// A fully populated parent, as a test would build it.
pub fn sample_parent(name: &str, num: i64) -> Parent {
    Parent {
        name: name.into(),
        num,
        child: Child {
            name: format!("{name}-child"),
            grandchild: Grandchild {
                grandchild_num: num * 10,
                ..Default::default()
            },
            ..Default::default()
        },
        readonly_child: ReadonlyChild {
            value: num,
            ..Default::default()
        },
        nomo: NoModel {
            name: format!("{name}-nomo"),
        },
        tags: vec!["a".into(), format!("n{num}")],
        ..Default::default()
    }
}
