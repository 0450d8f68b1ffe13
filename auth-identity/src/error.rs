use crate::ids::{AllocationError, EntityKind};
use thiserror::Error;

/// Failures raised by a credential or record store
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A unique index rejected the write. `field` names the indexed column.
    #[error("Unique constraint violated on {field}")]
    UniqueViolation { field: String },

    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505 = unique_violation
            if db_err.code().as_deref() == Some("23505") {
                let field = db_err
                    .constraint()
                    .map(field_from_constraint)
                    .unwrap_or_else(|| "unknown".to_string());
                return StoreError::UniqueViolation { field };
            }
        }
        StoreError::Backend(err.to_string())
    }
}

/// `patients_mobile_number_key` -> `mobile_number`
fn field_from_constraint(constraint: &str) -> String {
    let stem = constraint.strip_suffix("_key").unwrap_or(constraint);
    stem.split_once('_')
        .map(|(_, field)| field)
        .unwrap_or(stem)
        .to_string()
}

#[derive(Error, Debug)]
pub enum IdentityError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    DuplicatePrincipal(String),

    /// Shared by unknown identifiers and wrong passwords
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Principal not found")]
    PrincipalNotFound,

    #[error("No free {kind} identifier after {attempts} attempts")]
    IdentifierExhausted { kind: EntityKind, attempts: u32 },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Password hashing failed: {0}")]
    Hashing(String),

    #[error("Token signing failed: {0}")]
    Token(String),
}

impl From<AllocationError> for IdentityError {
    fn from(err: AllocationError) -> Self {
        match err {
            AllocationError::Lookup(store) => IdentityError::Store(store),
            AllocationError::Exhausted { kind, attempts } => {
                IdentityError::IdentifierExhausted { kind, attempts }
            }
        }
    }
}

impl From<validator::ValidationErrors> for IdentityError {
    fn from(errors: validator::ValidationErrors) -> Self {
        IdentityError::Validation(describe_validation(&errors))
    }
}

/// Flatten derive-validator output into one human-readable sentence list
pub fn describe_validation(errors: &validator::ValidationErrors) -> String {
    let mut messages = Vec::new();
    collect_messages(errors, &mut messages);
    messages.sort();
    messages.dedup();

    if messages.is_empty() {
        "Invalid input".to_string()
    } else {
        messages.join("; ")
    }
}

fn collect_messages(errors: &validator::ValidationErrors, out: &mut Vec<String>) {
    use validator::ValidationErrorsKind;

    for (field, kind) in errors.errors() {
        match kind {
            ValidationErrorsKind::Field(errs) => {
                out.extend(errs.iter().map(|e| match &e.message {
                    Some(message) => message.to_string(),
                    None => format!("{field} is invalid"),
                }));
            }
            ValidationErrorsKind::Struct(nested) => collect_messages(nested, out),
            ValidationErrorsKind::List(items) => {
                for nested in items.values() {
                    collect_messages(nested, out);
                }
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, IdentityError>;
