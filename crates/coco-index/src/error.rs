//! Error types for coco-index

use thiserror::Error;

/// Error type for index operations
#[derive(Error, Debug)]
pub enum Error {
    /// No usable index (never built, or the backing store is gone)
    #[error("code index unavailable: {0}")]
    Unavailable(String),

    /// Path outside the indexed root
    #[error("path outside index root: {0}")]
    OutsideRoot(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Background indexing task failed
    #[error("indexing task failed: {0}")]
    Task(String),
}

/// Result type for index operations
pub type Result<T> = std::result::Result<T, Error>;
