use std::result::Result as StdResult;

use thiserror::Error;

/// Unified error type for calculator, repository, storage, and settings layers.
#[derive(Error, Debug)]
pub enum QuoteError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("{kind} `{key}` already exists")]
    AlreadyExists { kind: &'static str, key: String },
    #[error("Please complete all fields: {0}")]
    IncompleteInput(String),
    #[error("Calculation error, check numeric values: {0}")]
    Calculation(String),
    #[error("Unknown filament type: {0}")]
    UnknownFilament(String),
    #[error("Validation failed: {0}")]
    Validation(String),
    #[error("Persistence error: {0}")]
    StorageError(String),
    #[error("Configuration error: {0}")]
    ConfigError(String),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Authentication failed: {0}")]
    AuthError(String),
}

impl QuoteError {
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        QuoteError::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub fn already_exists(kind: &'static str, key: impl Into<String>) -> Self {
        QuoteError::AlreadyExists {
            kind,
            key: key.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, QuoteError::NotFound { .. })
    }
}

pub type Result<T> = StdResult<T, QuoteError>;

/// User-facing CLI error wrapper.
#[derive(Error, Debug)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] QuoteError),
    #[error("Invalid input: {0}")]
    Input(String),
    #[error("Command failed: {0}")]
    Command(String),
}

impl From<std::io::Error> for QuoteError {
    fn from(err: std::io::Error) -> Self {
        QuoteError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for QuoteError {
    fn from(err: serde_json::Error) -> Self {
        QuoteError::StorageError(err.to_string())
    }
}

impl From<csv::Error> for QuoteError {
    fn from(err: csv::Error) -> Self {
        QuoteError::StorageError(format!("csv: {err}"))
    }
}

impl From<std::io::Error> for CliError {
    fn from(err: std::io::Error) -> Self {
        CliError::Core(QuoteError::from(err))
    }
}

impl From<rustyline::error::ReadlineError> for CliError {
    fn from(err: rustyline::error::ReadlineError) -> Self {
        CliError::Command(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_names_kind_and_id() {
        let err = QuoteError::not_found("Material", "abc");
        assert_eq!(err.to_string(), "Material not found: abc");
        assert!(err.is_not_found());
    }

    #[test]
    fn io_errors_become_storage_errors() {
        let io = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: QuoteError = io.into();
        assert!(matches!(err, QuoteError::StorageError(_)));
    }
}
