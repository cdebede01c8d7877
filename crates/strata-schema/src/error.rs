use thiserror::Error;

/// A malformed entity declaration. These are programming errors: a valid
/// declaration never produces one.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("entity type declares an empty kind")]
    EmptyKind,

    #[error("{kind} declares field {field} more than once")]
    DuplicateField { kind: &'static str, field: &'static str },

    #[error("invalid annotation {annotation:?} on {kind}.{field}")]
    InvalidAnnotation {
        kind: &'static str,
        field: &'static str,
        annotation: &'static str,
    },

    #[error("entity {kind} nests itself: {path}")]
    Cycle { kind: &'static str, path: String },
}
