use rapid_table::TableError;
use rapid_types::{DocumentError, PathError};

/// Errors from storage engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The requested or derived path is malformed.
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// The document cannot be mapped onto rows.
    #[error("invalid document: {0}")]
    Document(#[from] DocumentError),

    /// The underlying table failed. Never retried.
    #[error("table error: {0}")]
    Table(#[from] TableError),

    /// Nesting went deeper than the configured limit.
    #[error("document nesting exceeds {max} levels at {path}")]
    DepthExceeded { max: usize, path: String },

    /// Every proposed id was claimed by a concurrent writer.
    #[error("could not allocate an id in {collection} after {attempts} attempts")]
    AllocationConflict { collection: String, attempts: u32 },

    /// The collection already holds the largest representable id.
    #[error("identifier space exhausted in {0}")]
    IdExhausted(String),
}

impl EngineError {
    /// Returns `true` when the caller supplied the malformed input.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Path(_) | Self::Document(_) | Self::DepthExceeded { .. }
        )
    }
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
