//! Store errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot JSON is invalid: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot binary encoding is invalid: {0}")]
    Bincode(#[from] bincode::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    /// A change set names a changed or removed entity that is not stored.
    #[error("entity '{0}' does not exist in the store")]
    UnknownEntity(String),
}
