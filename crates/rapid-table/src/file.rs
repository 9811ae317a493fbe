//! File-backed table.
//!
//! [`FileTable`] keeps every row in a [`MemoryTable`] and rewrites a JSON
//! snapshot of the whole table after each successful mutation. The snapshot
//! is written to a temporary file in the same directory and renamed over the
//! previous one, so a crash mid-write leaves the last complete snapshot.
//! When the snapshot cannot be written the in-memory change is rolled back,
//! so reads never see a row the file does not hold.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{TableError, TableResult};
use crate::memory::MemoryTable;
use crate::row::{QueryOptions, QueryPage, Row, RowKey};
use crate::traits::Table;

const SNAPSHOT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    rows: Vec<Row>,
}

/// A [`MemoryTable`] persisted to a single JSON snapshot file.
///
/// Every mutation serializes and fsyncs the whole table, so a write costs
/// time proportional to the table size. Use [`Table::delete_many`] to remove
/// many rows with a single snapshot. Suited to development and small
/// single-node deployments.
pub struct FileTable {
    path: PathBuf,
    rows: MemoryTable,
    /// Serializes mutate-then-snapshot so snapshots land in mutation order.
    write_lock: Mutex<()>,
}

impl FileTable {
    /// Open the table at `path`, loading the snapshot if one exists.
    pub fn open(path: impl AsRef<Path>) -> TableResult<Self> {
        let path = path.as_ref().to_path_buf();
        let rows = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            let snapshot: Snapshot = serde_json::from_str(&raw)?;
            if snapshot.version != SNAPSHOT_VERSION {
                return Err(TableError::Serialization(format!(
                    "unsupported snapshot version {} in {}",
                    snapshot.version,
                    path.display()
                )));
            }
            debug!(rows = snapshot.rows.len(), path = %path.display(), "loaded table snapshot");
            MemoryTable::from_rows(snapshot.rows)
        } else {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                fs::create_dir_all(dir)?;
            }
            MemoryTable::new()
        };
        Ok(Self {
            path,
            rows,
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of rows currently held.
    pub fn len(&self) -> TableResult<usize> {
        self.rows.len()
    }

    pub fn is_empty(&self) -> TableResult<bool> {
        self.rows.is_empty()
    }

    /// Run `op` against the in-memory rows, then snapshot them if `changed`
    /// says so. `keys` must cover every row `op` may touch; they are put back
    /// as they were if the snapshot fails.
    fn mutate<'k, T>(
        &self,
        keys: impl IntoIterator<Item = &'k RowKey>,
        changed: impl Fn(&T) -> bool,
        op: impl FnOnce() -> TableResult<T>,
    ) -> TableResult<T> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|e| TableError::LockPoisoned(e.to_string()))?;
        let before = keys
            .into_iter()
            .map(|key| -> TableResult<(RowKey, Option<Row>)> {
                Ok((key.clone(), self.rows.get(key)?))
            })
            .collect::<TableResult<Vec<_>>>()?;
        let out = op()?;
        if changed(&out) {
            if let Err(err) = self.persist() {
                warn!(path = %self.path.display(), error = %err, "snapshot failed, rolling back");
                self.restore(before)?;
                return Err(err);
            }
        }
        Ok(out)
    }

    fn restore(&self, before: Vec<(RowKey, Option<Row>)>) -> TableResult<()> {
        for (key, row) in before {
            match row {
                Some(row) => self.rows.put(&row)?,
                None => {
                    self.rows.delete(&key)?;
                }
            }
        }
        Ok(())
    }

    fn persist(&self) -> TableResult<()> {
        let snapshot = Snapshot {
            version: SNAPSHOT_VERSION,
            rows: self.rows.rows()?,
        };
        let encoded = serde_json::to_vec(&snapshot)?;
        let dir = match self.path.parent() {
            Some(d) if !d.as_os_str().is_empty() => d.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(&encoded)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| TableError::Io(e.error))?;
        debug!(rows = snapshot.rows.len(), path = %self.path.display(), "wrote table snapshot");
        Ok(())
    }
}

impl Table for FileTable {
    fn get(&self, key: &RowKey) -> TableResult<Option<Row>> {
        self.rows.get(key)
    }

    fn put(&self, row: &Row) -> TableResult<()> {
        self.mutate([&row.key], |_| true, || self.rows.put(row))
    }

    fn put_if_absent(&self, row: &Row) -> TableResult<bool> {
        self.mutate([&row.key], |written| *written, || self.rows.put_if_absent(row))
    }

    fn delete(&self, key: &RowKey) -> TableResult<bool> {
        self.mutate([key], |existed| *existed, || self.rows.delete(key))
    }

    fn delete_many(&self, keys: &[RowKey]) -> TableResult<usize> {
        self.mutate(keys, |deleted| *deleted > 0, || self.rows.delete_many(keys))
    }

    fn query(
        &self,
        partition: &str,
        prefix: &str,
        options: &QueryOptions,
    ) -> TableResult<QueryPage> {
        self.rows.query(partition, prefix, options)
    }
}

impl std::fmt::Debug for FileTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileTable")
            .field("path", &self.path)
            .field("rows", &self.rows)
            .finish()
    }
}
