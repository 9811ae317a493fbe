use thiserror::Error;

/// Errors produced when parsing a store path.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    #[error("path must not be empty")]
    Empty,

    #[error("path must start with '/': {0}")]
    MissingLeadingSlash(String),

    #[error("path must name at least one segment: {0}")]
    Root(String),

    #[error("path contains an empty segment: {0}")]
    EmptySegment(String),

    #[error("path has {actual} segments, limit is {max}")]
    TooManySegments { max: usize, actual: usize },
}

/// Errors produced when converting untyped JSON into a [`crate::Document`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DocumentError {
    #[error("document must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("expected a scalar value, got {0}")]
    NotAScalar(&'static str),

    #[error("sequence field {field:?} holds a non-object at index {index}")]
    NonObjectElement { field: String, index: usize },

    #[error("field name {0:?} cannot be used as a path segment")]
    InvalidFieldName(String),

    #[error("field {field:?} must be a string path, got {found}")]
    InvalidPathField { field: String, found: &'static str },
}
