use crate::error::TableResult;
use crate::row::{QueryOptions, QueryPage, Row, RowKey};

/// Flat, sorted key-value table.
///
/// All implementations must satisfy these invariants:
/// - Sort keys within a partition are ordered lexicographically by bytes.
/// - A put replaces the whole row stored at its key.
/// - A query only returns rows of the requested partition whose sort key
///   starts with the requested prefix.
/// - All I/O errors are propagated, never silently ignored.
pub trait Table: Send + Sync {
    /// Read a row by its exact key.
    ///
    /// Returns `Ok(None)` if the row does not exist.
    fn get(&self, key: &RowKey) -> TableResult<Option<Row>>;

    /// Upsert a row.
    fn put(&self, row: &Row) -> TableResult<()>;

    /// Write a row only if no row exists at its key.
    ///
    /// Returns `false` without writing when the key is already taken.
    fn put_if_absent(&self, row: &Row) -> TableResult<bool>;

    /// Delete a row by its exact key. Returns `true` if the row existed.
    fn delete(&self, key: &RowKey) -> TableResult<bool>;

    /// Delete every row in `keys`. Returns how many of them existed.
    ///
    /// The default deletes one key at a time and stops at the first failure.
    /// Backends with a per-write cost override it to batch the work.
    fn delete_many(&self, keys: &[RowKey]) -> TableResult<usize> {
        let mut deleted = 0;
        for key in keys {
            if self.delete(key)? {
                deleted += 1;
            }
        }
        Ok(deleted)
    }

    /// Range-scan rows whose sort key starts with `prefix`.
    ///
    /// At most `options.limit` rows are returned. When more rows remain, the
    /// page carries the last returned sort key; pass it back as
    /// `exclusive_start` to continue.
    fn query(&self, partition: &str, prefix: &str, options: &QueryOptions)
        -> TableResult<QueryPage>;
}
