use askme_common::AskmeError;
use thiserror::Error;

/// Failure of a graph store operation.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error(transparent)]
    Neo4j(#[from] neo4rs::Error),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Malformed row: {0}")]
    Decode(String),
}

/// Server status code for a uniqueness constraint violation.
const CONSTRAINT_VIOLATION: &str = "Neo.ClientError.Schema.ConstraintValidationFailed";

impl StoreError {
    /// Classify a write error: constraint violations become `DuplicateKey`.
    pub(crate) fn from_write(err: neo4rs::Error, key: &str) -> Self {
        let code = match &err {
            neo4rs::Error::Neo4j(e) => Some(e.code().to_string()),
            _ => None,
        };
        if is_constraint_violation(code.as_deref(), &err.to_string()) {
            StoreError::DuplicateKey(key.to_string())
        } else {
            StoreError::Neo4j(err)
        }
    }
}

/// The server's status code decides when present. The message is only
/// consulted for errors that arrive without one.
fn is_constraint_violation(code: Option<&str>, message: &str) -> bool {
    match code {
        Some(code) => code == CONSTRAINT_VIOLATION,
        None => {
            message.contains("ConstraintValidationFailed")
                || message.to_lowercase().contains("already exists")
        }
    }
}

impl From<StoreError> for AskmeError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::DuplicateKey(key) => AskmeError::AlreadyExists(key),
            other => AskmeError::Store(other.to_string()),
        }
    }
}
