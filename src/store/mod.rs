//! Processed-id persistence.
//!
//! Remembers which message identifiers were already handled so a re-run
//! never re-alerts for the same email. Whole-set read-modify-write
//! semantics: the monitor loads the set at run start and saves the union at
//! run end.

mod json_file;

use async_trait::async_trait;
use std::collections::HashSet;

pub use json_file::JsonFileStore;

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur during processed-id persistence.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Filesystem error.
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted file is not a valid id list.
    #[error("corrupt store file: {0}")]
    Corrupt(String),
}

/// Trait for processed-id persistence backends.
#[async_trait]
pub trait ProcessedIdStore: Send + Sync {
    /// Loads the full set of previously processed ids. A missing store is
    /// an empty set, not an error.
    async fn load(&self) -> Result<HashSet<String>>;

    /// Persists the full set, replacing any previous contents.
    async fn save(&self, ids: &HashSet<String>) -> Result<()>;
}
