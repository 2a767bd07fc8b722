//! Ledger error types

use thiserror::Error;
use uuid::Uuid;

/// Errors from ledger updates and persistence
#[derive(Error, Debug)]
pub enum LedgerError {
    /// An update carried invalid data
    #[error("{0}")]
    Invalid(String),

    /// Lead id is unknown
    #[error("Lead not found: {0}")]
    LeadNotFound(Uuid),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Ledger file could not be read or written as JSON
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for LedgerError {
    fn from(err: serde_json::Error) -> Self {
        LedgerError::Serialization(err.to_string())
    }
}

/// Result type alias for ledger operations
pub type LedgerResult<T> = Result<T, LedgerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LedgerError::Invalid("Name and phone are required".into());
        assert_eq!(err.to_string(), "Name and phone are required");

        let id = Uuid::nil();
        assert_eq!(
            LedgerError::LeadNotFound(id).to_string(),
            format!("Lead not found: {}", id)
        );
    }

    #[test]
    fn test_from_json_error() {
        let err: LedgerError = serde_json::from_str::<u32>("nope").unwrap_err().into();
        assert!(matches!(err, LedgerError::Serialization(_)));
    }
}
