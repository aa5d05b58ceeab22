use std::error::Error;
use thiserror::Error;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not be reached or rejected the operation.
    #[error("storage unavailable: {message}")]
    Unavailable {
        message: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The key path cannot address a node of the store.
    #[error("invalid store path `{path}`: {reason}")]
    InvalidPath { path: String, reason: &'static str },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }

    /// Construct an invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: &'static str) -> Self {
        StorageError::InvalidPath {
            path: path.into(),
            reason,
        }
    }
}
