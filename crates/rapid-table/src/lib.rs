//! Flat key-value table underneath the Rapid document store.
//!
//! The engine only assumes the shape offered by wide-column tables: rows
//! keyed by `(partition, sort_key)`, exact get/put/delete, and prefix range
//! scans over the lexicographically ordered sort keys, forward or reverse,
//! with a limit and a continuation key.
//!
//! # Backends
//!
//! All backends implement the [`Table`] trait:
//!
//! - [`MemoryTable`] -- `BTreeMap`-based table for tests and embedding
//! - [`FileTable`] -- memory table snapshotted to a JSON file on every mutation
//!
//! # Design Rules
//!
//! 1. Rows hold scalar fields only; nesting never reaches the table.
//! 2. A put replaces the whole row. There are no partial updates.
//! 3. `put_if_absent` is the only conditional write.
//! 4. All I/O errors are propagated, never retried.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod row;
pub mod traits;

pub use config::{BackendKind, TableConfig};
pub use error::{TableError, TableResult};
pub use file::FileTable;
pub use memory::MemoryTable;
pub use row::{QueryOptions, QueryPage, Row, RowKey};
pub use traits::Table;
