use auth_identity::{AllocationError, EntityKind, StoreError};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RecordError {
    #[error("{0}")]
    Validation(String),

    /// Absent, or not visible to the caller
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The store's unique index rejected a freshly allocated identifier
    #[error("Identifier {identifier} is already in use for another {kind}")]
    IdentifierCollision { kind: EntityKind, identifier: String },

    #[error("No free {kind} identifier after {attempts} attempts")]
    IdentifierExhausted { kind: EntityKind, attempts: u32 },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl From<AllocationError> for RecordError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Lookup(store) => RecordError::Store(store),
            AllocationError::Exhausted { kind, attempts } => {
                RecordError::IdentifierExhausted { kind, attempts }
            }
        }
    }
}

impl From<validator::ValidationErrors> for RecordError {
    fn from(errors: validator::ValidationErrors) -> Self {
        RecordError::Validation(auth_identity::describe_validation(&errors))
    }
}

pub type Result<T> = std::result::Result<T, RecordError>;
