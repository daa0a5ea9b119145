use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Operation not supported by this backend: {0}")]
    Unsupported(&'static str),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event handler error: {0}")]
    HandlerError(String),
}

impl Error {
    pub fn is_storage_error(&self) -> bool {
        matches!(self, Error::Storage(_))
    }

    /// True when the error only reports a missing optional backend
    /// capability rather than a failed operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::Storage(StorageError::Unsupported(_)))
    }
}
