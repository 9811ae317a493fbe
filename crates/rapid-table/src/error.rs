/// Errors from table operations.
#[derive(Debug, thiserror::Error)]
pub enum TableError {
    /// I/O error from the underlying storage backend.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A row or snapshot could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A backend lock was poisoned by a panicking writer.
    #[error("lock poisoned: {0}")]
    LockPoisoned(String),

    /// The backend cannot serve requests.
    #[error("table unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for TableError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serialization(e.to_string())
    }
}

/// Result alias for table operations.
pub type TableResult<T> = Result<T, TableError>;
