//! Store-specific error types and conversions.

use schoolgate_core::error::GateError;
use schoolgate_core::models::limit::ResourceKind;

/// Store-layer error type.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Record not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Duplicate {entity}: {key}")]
    Duplicate { entity: String, key: String },

    #[error("Limit reached for {resource}: {current} of {max}")]
    LimitReached {
        resource: ResourceKind,
        current: u64,
        max: u64,
    },

    #[error("Password hashing failed: {0}")]
    Hashing(String),
}

impl From<StoreError> for GateError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => GateError::NotFound { entity, id },
            StoreError::Duplicate { entity, .. } => GateError::AlreadyExists { entity },
            other => GateError::Storage(other.to_string()),
        }
    }
}
