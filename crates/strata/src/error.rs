use strata_cache::CacheError;
use strata_codec::CodecError;
use strata_schema::SchemaError;
use strata_store::StoreError;
use strata_types::{CastError, Key};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("{kind} is not registered")]
    NotRegistered { kind: &'static str },

    #[error("{kind} has no field {field}")]
    FieldNotFound { kind: &'static str, field: String },

    #[error("invalid filter {filter:?} on {kind}: {reason}")]
    InvalidFilter {
        kind: &'static str,
        filter: String,
        reason: String,
    },

    #[error("{kind} has no key")]
    KeyNotSet { kind: &'static str },

    #[error("{kind} not found{}", describe_key(.key))]
    EntityNotFound { kind: &'static str, key: Option<Key> },

    #[error("cannot load {kind}.{field}: {source}")]
    Cast {
        kind: &'static str,
        field: String,
        #[source]
        source: CastError,
    },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("cache record encoding: {0}")]
    Encoding(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("operation deadline exceeded")]
    DeadlineExceeded,

    #[error("worker failed: {0}")]
    Worker(String),
}

impl Error {
    /// `true` for a missing record or an empty `first()` result.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::EntityNotFound { .. })
    }
}

impl From<CodecError> for Error {
    fn from(e: CodecError) -> Self {
        match e {
            CodecError::Cast {
                kind,
                field,
                source,
            } => Self::Cast {
                kind,
                field,
                source,
            },
            CodecError::Accessor { kind, field } => Self::FieldNotFound {
                kind,
                field: field.to_string(),
            },
        }
    }
}

fn describe_key(key: &Option<Key>) -> String {
    key.as_ref().map(|k| format!(" under {k}")).unwrap_or_default()
}

pub type Result<T> = std::result::Result<T, Error>;
