use strata_types::Key;

/// Errors from store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A keyed write or delete referenced a key of the wrong shape.
    #[error("invalid key {0}")]
    InvalidKey(Key),

    /// The query could not be built or executed.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
