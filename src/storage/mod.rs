pub mod json_backend;

use std::path::PathBuf;

use crate::core::errors::QuoteError;

pub type Result<T> = std::result::Result<T, QuoteError>;

/// Abstraction over the place where whole-collection documents are kept.
///
/// Each entity type owns exactly one document addressed by file name. Writers
/// always replace the whole document.
pub trait StorageBackend: Send + Sync {
    /// Returns the raw document, or `None` when it was never written.
    fn read(&self, file_name: &str) -> Result<Option<String>>;
    fn write(&self, file_name: &str, contents: &str) -> Result<()>;
    fn location(&self, file_name: &str) -> PathBuf;
}

pub use json_backend::{BackupInfo, JsonStorage, DATA_FILES};
