use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque, forward-only position in a query's result stream.
///
/// A cursor is produced by a store's query iterator after it has yielded
/// some results; passing it back as the start of an otherwise identical
/// query resumes the scan right after the last yielded result.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cursor {
    position: u64,
}

impl Cursor {
    /// Build a cursor from a store-defined position. Stores call this.
    pub fn from_position(position: u64) -> Self {
        Self { position }
    }

    /// The store-defined position this cursor wraps.
    pub fn position(&self) -> u64 {
        self.position
    }

    /// Web-safe string form.
    pub fn encode(&self) -> String {
        format!("c{:x}", self.position)
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.encode())
    }
}
