use std::fmt;

use serde::{Deserialize, Serialize};

/// Store-assigned identity of a persisted entity.
///
/// A `Key` names the kind (the entity type's store name) and the numeric id
/// the store allocated for the record. Keys are immutable once assigned; an
/// entity that has never been persisted carries no key at all.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Key {
    kind: String,
    id: u64,
}

impl Key {
    /// Build a key from its parts. Stores call this when allocating.
    pub fn new(kind: impl Into<String>, id: u64) -> Self {
        Self {
            kind: kind.into(),
            id,
        }
    }

    /// The kind (entity store name) this key belongs to.
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// The numeric id within the kind.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Stable string form, used as the cache key.
    pub fn encode(&self) -> String {
        format!("{}:{}", self.kind, self.id)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Key({})", self.encode())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_form_is_unique_per_kind_and_id() {
        assert_eq!(Key::new("Entity", 42).encode(), "Entity:42");
        assert_ne!(Key::new("Entity", 1).encode(), Key::new("Entity", 11).encode());
        assert_ne!(Key::new("A", 1).encode(), Key::new("B", 1).encode());
    }

    #[test]
    fn display_and_debug() {
        let key = Key::new("Child", 3);
        assert_eq!(key.to_string(), "Child(3)");
        assert_eq!(format!("{key:?}"), "Key(Child:3)");
    }

    #[test]
    fn ordering_is_by_kind_then_id() {
        let a = Key::new("A", 9);
        let b = Key::new("B", 1);
        let a2 = Key::new("A", 10);
        assert!(a < b);
        assert!(a < a2);
    }
}
