use strata_types::Key;

/// The marker every entity embeds.
///
/// Holds the entity's store key (unset until first persisted) and whether the
/// entity has been indexed by a [`SchemaRegistry`](crate::SchemaRegistry).
#[derive(Clone, Debug, Default)]
pub struct Model {
    key: Option<Key>,
    registered: bool,
}

impl Model {
    pub fn key(&self) -> Option<&Key> {
        self.key.as_ref()
    }

    pub fn has_key(&self) -> bool {
        self.key.is_some()
    }

    pub fn set_key(&mut self, key: Key) {
        self.key = Some(key);
    }

    /// Forget the key, returning the previous one.
    pub fn clear_key(&mut self) -> Option<Key> {
        self.key.take()
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn mark_registered(&mut self) {
        self.registered = true;
    }
}

/// Two markers are equal when they identify the same record; registration is
/// bookkeeping and does not take part.
impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Model {}
