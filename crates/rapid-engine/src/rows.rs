//! Row access: the bridge between store paths and table keys.
//!
//! [`RowStore`] owns the table handle and the constant partition. It turns
//! paths into row keys, walks separator-bounded prefix scopes page by page
//! with a stable cursor, and performs the row-level put and bulk delete.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use rapid_table::{QueryOptions, Row, RowKey, Table};
use rapid_types::{Document, Scalar, StorePath, Value};

use crate::allocator::IdAllocator;
use crate::error::{EngineError, EngineResult};

/// Flat scalar fields of one row.
pub type Fields = BTreeMap<String, Scalar>;

/// Path-keyed access to the underlying table.
pub struct RowStore {
    table: Arc<dyn Table>,
    partition: String,
    page_size: usize,
}

impl RowStore {
    pub fn new(table: Arc<dyn Table>, partition: impl Into<String>, page_size: usize) -> Self {
        Self {
            table,
            partition: partition.into(),
            page_size: page_size.max(1),
        }
    }

    pub fn table(&self) -> &Arc<dyn Table> {
        &self.table
    }

    pub fn partition(&self) -> &str {
        &self.partition
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn key(&self, path: &StorePath) -> RowKey {
        RowKey::new(self.partition.as_str(), path.as_str())
    }

    pub fn row(&self, path: &StorePath, fields: Fields) -> Row {
        Row {
            key: self.key(path),
            fields,
        }
    }

    pub fn get(&self, path: &StorePath) -> EngineResult<Option<Row>> {
        Ok(self.table.get(&self.key(path))?)
    }

    /// Persist `fields` as a row.
    ///
    /// An item path is written as-is, replacing any row already there. A
    /// collection path gets a freshly allocated item path, claimed with a
    /// conditional put and re-allocated when a concurrent writer got there
    /// first. Returns the stored document, including its `path`.
    pub fn put(
        &self,
        path: &StorePath,
        fields: Fields,
        allocation_attempts: u32,
    ) -> EngineResult<(StorePath, Document)> {
        let item_path = if path.is_collection() {
            self.claim(path, &fields, allocation_attempts)?
        } else {
            self.table.put(&self.row(path, fields.clone()))?;
            path.clone()
        };
        debug!(path = %item_path, fields = fields.len(), "row written");

        let mut stored: Document = fields
            .into_iter()
            .map(|(k, v)| (k, Value::Scalar(v)))
            .collect();
        stored.set_path(&item_path);
        Ok((item_path, stored))
    }

    fn claim(
        &self,
        collection: &StorePath,
        fields: &Fields,
        attempts: u32,
    ) -> EngineResult<StorePath> {
        let allocator = IdAllocator::new(self);
        for attempt in 1..=attempts {
            let candidate = allocator.next_item_path(collection)?;
            if self.table.put_if_absent(&self.row(&candidate, fields.clone()))? {
                return Ok(candidate);
            }
            debug!(path = %candidate, attempt, "id claimed concurrently, re-allocating");
        }
        Err(EngineError::AllocationConflict {
            collection: collection.to_string(),
            attempts,
        })
    }

    /// Visit every row whose sort key starts with `prefix`, in key order.
    ///
    /// Pages are chained through the table's continuation key, so rows
    /// deleted by `visit` do not shift later pages.
    pub fn for_each_with_prefix(
        &self,
        prefix: &str,
        mut visit: impl FnMut(Row) -> EngineResult<()>,
    ) -> EngineResult<()> {
        self.for_each_page(prefix, |rows| rows.into_iter().try_for_each(&mut visit))
    }

    /// Like [`Self::for_each_with_prefix`], one page of rows at a time.
    pub fn for_each_page(
        &self,
        prefix: &str,
        mut visit: impl FnMut(Vec<Row>) -> EngineResult<()>,
    ) -> EngineResult<()> {
        let mut options = QueryOptions::new().limit(self.page_size);
        loop {
            let page = self.table.query(&self.partition, prefix, &options)?;
            visit(page.rows)?;
            match page.last_key {
                Some(last) => options = options.start_after(last),
                None => return Ok(()),
            }
        }
    }

    /// Every row in the scope of `path`: the row at `path` itself plus every
    /// row beneath `path/`.
    pub fn scan(&self, path: &StorePath) -> EngineResult<Vec<Row>> {
        let mut rows = Vec::new();
        if let Some(own) = self.get(path)? {
            rows.push(own);
        }
        self.for_each_with_prefix(&path.scope_prefix(), |row| {
            rows.push(row);
            Ok(())
        })?;
        debug!(path = %path, rows = rows.len(), "scope scanned");
        Ok(rows)
    }

    /// Delete every row in the scope of `path`. Returns the number of rows
    /// removed.
    ///
    /// Descendants go first, one batch per page, then the row at `path`.
    /// Aborts on the first failed batch; rows already removed stay removed.
    pub fn delete_by_prefix(&self, path: &StorePath) -> EngineResult<usize> {
        let mut deleted = 0;
        self.for_each_page(&path.scope_prefix(), |rows| {
            let keys: Vec<RowKey> = rows.into_iter().map(|row| row.key).collect();
            deleted += self.table.delete_many(&keys)?;
            Ok(())
        })?;
        if self.table.delete(&self.key(path))? {
            deleted += 1;
        }
        debug!(path = %path, deleted, "scope deleted");
        Ok(deleted)
    }
}

impl std::fmt::Debug for RowStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowStore")
            .field("partition", &self.partition)
            .field("page_size", &self.page_size)
            .finish()
    }
}

/// Rebuild the flat document stored in a row, with `path` set from its key.
pub fn row_to_document(row: Row) -> Document {
    let path = row.key.sort_key;
    let mut doc: Document = row
        .fields
        .into_iter()
        .map(|(k, v)| (k, Value::Scalar(v)))
        .collect();
    doc.insert(rapid_types::PATH_FIELD, Scalar::String(path));
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use rapid_table::MemoryTable;

    fn path(s: &str) -> StorePath {
        StorePath::parse(s).unwrap()
    }

    fn store_with(keys: &[&str], page_size: usize) -> (Arc<MemoryTable>, RowStore) {
        let table = Arc::new(MemoryTable::new());
        for k in keys {
            table
                .put(&Row::new(RowKey::new("record", *k)).with_field("k", *k))
                .unwrap();
        }
        let rows = RowStore::new(table.clone(), "record", page_size);
        (table, rows)
    }

    fn fields(name: &str) -> Fields {
        let mut f = Fields::new();
        f.insert("name".into(), Scalar::from(name));
        f
    }

    #[test]
    fn put_item_path_overwrites() {
        let (table, rows) = store_with(&[], 100);
        rows.put(&path("/users/4"), fields("a"), 1).unwrap();
        let (p, stored) = rows.put(&path("/users/4"), fields("b"), 1).unwrap();
        assert_eq!(p.as_str(), "/users/4");
        assert_eq!(stored.path(), Some("/users/4"));
        assert_eq!(table.len().unwrap(), 1);
        let row = table.get(&RowKey::new("record", "/users/4")).unwrap().unwrap();
        assert_eq!(row.fields["name"].as_str(), Some("b"));
    }

    #[test]
    fn put_collection_path_allocates() {
        let (_, rows) = store_with(&["/users/1", "/users/2"], 100);
        let (p, _) = rows.put(&path("/users"), fields("c"), 3).unwrap();
        assert_eq!(p.as_str(), "/users/3");
    }

    #[test]
    fn scan_is_separator_bounded() {
        let (_, rows) = store_with(
            &["/users", "/users/1", "/users/1/a/1", "/users2/1", "/user"],
            2,
        );
        let found: Vec<String> = rows
            .scan(&path("/users"))
            .unwrap()
            .into_iter()
            .map(|r| r.key.sort_key)
            .collect();
        assert_eq!(found, vec!["/users", "/users/1", "/users/1/a/1"]);
    }

    #[test]
    fn delete_pages_through_everything() {
        let keys: Vec<String> = (1..=25).map(|i| format!("/c/{i}")).collect();
        let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
        let (table, rows) = store_with(&refs, 4);
        table
            .put(&Row::new(RowKey::new("record", "/c2/1")))
            .unwrap();

        let deleted = rows.delete_by_prefix(&path("/c")).unwrap();
        assert_eq!(deleted, 25);
        assert_eq!(table.sort_keys("record").unwrap(), vec!["/c2/1"]);
    }

    /// Counts batched deletes on top of a memory table.
    struct CountingTable {
        inner: MemoryTable,
        batches: std::sync::atomic::AtomicUsize,
    }

    impl Table for CountingTable {
        fn get(&self, key: &RowKey) -> rapid_table::TableResult<Option<Row>> {
            self.inner.get(key)
        }

        fn put(&self, row: &Row) -> rapid_table::TableResult<()> {
            self.inner.put(row)
        }

        fn put_if_absent(&self, row: &Row) -> rapid_table::TableResult<bool> {
            self.inner.put_if_absent(row)
        }

        fn delete(&self, key: &RowKey) -> rapid_table::TableResult<bool> {
            self.inner.delete(key)
        }

        fn delete_many(&self, keys: &[RowKey]) -> rapid_table::TableResult<usize> {
            self.batches
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            self.inner.delete_many(keys)
        }

        fn query(
            &self,
            partition: &str,
            prefix: &str,
            options: &QueryOptions,
        ) -> rapid_table::TableResult<rapid_table::QueryPage> {
            self.inner.query(partition, prefix, options)
        }
    }

    #[test]
    fn delete_batches_one_page_at_a_time() {
        let inner = MemoryTable::new();
        for i in 1..=10 {
            inner
                .put(&Row::new(RowKey::new("record", format!("/c/{i}"))))
                .unwrap();
        }
        let table = Arc::new(CountingTable {
            inner,
            batches: Default::default(),
        });
        let rows = RowStore::new(table.clone(), "record", 4);

        assert_eq!(rows.delete_by_prefix(&path("/c")).unwrap(), 10);
        assert!(table.inner.is_empty().unwrap());
        // 4 + 4 + 2, and the final page carries no continuation key.
        assert_eq!(
            table.batches.load(std::sync::atomic::Ordering::SeqCst),
            3
        );
    }

    #[test]
    fn delete_item_removes_row_and_descendants() {
        let (table, rows) = store_with(&["/u/1", "/u/1/o/1", "/u/10"], 100);
        assert_eq!(rows.delete_by_prefix(&path("/u/1")).unwrap(), 2);
        assert_eq!(table.sort_keys("record").unwrap(), vec!["/u/10"]);
    }

    #[test]
    fn row_to_document_sets_path() {
        let row = Row::new(RowKey::new("record", "/a/1")).with_field("x", 1i64);
        let doc = row_to_document(row);
        assert_eq!(doc.path(), Some("/a/1"));
        assert_eq!(doc.get("x"), Some(&Value::Scalar(Scalar::from(1i64))));
    }

    #[test]
    fn page_size_is_at_least_one() {
        let (_, rows) = store_with(&[], 0);
        assert_eq!(rows.page_size(), 1);
    }
}
