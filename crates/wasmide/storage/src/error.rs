use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Object-storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object not found: {0}")]
    NotFound(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A source file that is not valid UTF-8.
    #[error("object {0} is not valid UTF-8")]
    Encoding(String),

    #[error("backend error: {0}")]
    Backend(String),

    /// Some uploads of a batch failed. The others may have been written.
    #[error("{failed} of {total} uploads failed, first error: {first}")]
    BatchFailed {
        failed: usize,
        total: usize,
        first: Box<StorageError>,
    },
}
