use strata_types::CastError;
use thiserror::Error;

/// Errors raised while converting between entities and property lists.
#[derive(Debug, Error)]
pub enum CodecError {
    /// A stored value does not fit the field it is loaded into.
    #[error("cannot load {kind}.{field}: {source}")]
    Cast {
        kind: &'static str,
        field: String,
        #[source]
        source: CastError,
    },

    /// The entity's field accessors disagree with its declared fields.
    #[error("{kind} declares {field} but its accessor does not expose it as declared")]
    Accessor { kind: &'static str, field: &'static str },
}

pub type CodecResult<T> = Result<T, CodecError>;
