//! Storage engine for Rapid.
//!
//! Maps nested documents onto the rows of a flat [`rapid_table::Table`] and
//! back. A document written at a path is split into one row per nesting
//! level, each keyed by its own path; a read scans the path's scope and
//! folds the rows back into trees.
//!
//! # Components
//!
//! - [`DocumentStore`]: the write / read / delete facade
//! - [`Decomposer`]: splits a document into rows, allocating ids as needed
//! - [`IdAllocator`]: next numeric id within a collection
//! - [`reconstruct`]: rebuilds nested documents from scanned rows
//! - [`RowStore`]: path-to-key mapping, paged prefix scans, bulk delete
//!
//! # Guarantees
//!
//! 1. Every row belongs to the scope of exactly one path; `/users` never
//!    reaches into `/users2`.
//! 2. Ids are claimed with a conditional put, so concurrent writers to one
//!    collection never share an id.
//! 3. Multi-row writes are not atomic. A failed write returns the first
//!    error and leaves the rows written before it.

pub mod allocator;
pub mod config;
pub mod decompose;
pub mod error;
pub mod merge;
pub mod rows;
pub mod store;

pub use allocator::IdAllocator;
pub use config::EngineConfig;
pub use decompose::Decomposer;
pub use error::{EngineError, EngineResult};
pub use merge::reconstruct;
pub use rows::{row_to_document, Fields, RowStore};
pub use store::{DocumentStore, ReadOutcome};
