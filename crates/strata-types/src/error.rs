use thiserror::Error;

/// A stored value could not be materialized as the requested Rust type.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("cannot cast {found} into {expected}")]
pub struct CastError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl CastError {
    pub fn new(expected: &'static str, found: &'static str) -> Self {
        Self { expected, found }
    }
}
