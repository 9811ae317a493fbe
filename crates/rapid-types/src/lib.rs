//! Foundation types for Rapid.
//!
//! Rapid exposes a hierarchical document store addressed by slash-delimited
//! paths on top of a flat, sorted key-value table. This crate holds the two
//! vocabularies every other Rapid crate speaks:
//!
//! # Key Types
//!
//! - [`StorePath`]: validated `/a/1/b` style address. The path classifier
//!   ([`is_collection_path`], [`parse_item_id`]) lives next to it.
//! - [`PathKind`]: whether a path names a single item or a collection
//! - [`Document`]: string-keyed mapping of field names to [`Value`]s
//! - [`Value`]: a [`Scalar`], a nested object, or a sequence of objects

pub mod document;
pub mod error;
pub mod path;

pub use document::{Document, Scalar, Value, PATH_FIELD};
pub use error::{DocumentError, PathError};
pub use path::{
    compare_paths, is_collection_path, is_numeric_segment, parse_item_id, PathKind, StorePath,
    MAX_PATH_SEGMENTS, SEPARATOR,
};
