use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

use crate::error::{TableError, TableResult};
use crate::row::{QueryOptions, QueryPage, Row, RowKey};
use crate::traits::Table;

/// In-memory, `BTreeMap`-based table.
///
/// Intended for tests and embedding. Rows are held in key order behind a
/// `RwLock` and cloned on read/write.
pub struct MemoryTable {
    rows: RwLock<BTreeMap<RowKey, Row>>,
}

impl MemoryTable {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    /// Build a table pre-populated with `rows`.
    pub fn from_rows(rows: impl IntoIterator<Item = Row>) -> Self {
        let map = rows.into_iter().map(|row| (row.key.clone(), row)).collect();
        Self {
            rows: RwLock::new(map),
        }
    }

    /// Number of rows across all partitions.
    pub fn len(&self) -> TableResult<usize> {
        Ok(self.read_map()?.len())
    }

    pub fn is_empty(&self) -> TableResult<bool> {
        Ok(self.read_map()?.is_empty())
    }

    /// Every row, in key order.
    pub fn rows(&self) -> TableResult<Vec<Row>> {
        Ok(self.read_map()?.values().cloned().collect())
    }

    /// Sort keys of every row in `partition`, in key order.
    pub fn sort_keys(&self, partition: &str) -> TableResult<Vec<String>> {
        Ok(self
            .read_map()?
            .keys()
            .filter(|k| k.partition == partition)
            .map(|k| k.sort_key.clone())
            .collect())
    }

    pub fn clear(&self) -> TableResult<()> {
        self.write_map()?.clear();
        Ok(())
    }

    fn read_map(&self) -> TableResult<std::sync::RwLockReadGuard<'_, BTreeMap<RowKey, Row>>> {
        self.rows
            .read()
            .map_err(|e| TableError::LockPoisoned(e.to_string()))
    }

    fn write_map(&self) -> TableResult<std::sync::RwLockWriteGuard<'_, BTreeMap<RowKey, Row>>> {
        self.rows
            .write()
            .map_err(|e| TableError::LockPoisoned(e.to_string()))
    }
}

impl Default for MemoryTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Table for MemoryTable {
    fn get(&self, key: &RowKey) -> TableResult<Option<Row>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn put(&self, row: &Row) -> TableResult<()> {
        self.write_map()?.insert(row.key.clone(), row.clone());
        Ok(())
    }

    fn put_if_absent(&self, row: &Row) -> TableResult<bool> {
        let mut map = self.write_map()?;
        if map.contains_key(&row.key) {
            return Ok(false);
        }
        map.insert(row.key.clone(), row.clone());
        Ok(true)
    }

    fn delete(&self, key: &RowKey) -> TableResult<bool> {
        Ok(self.write_map()?.remove(key).is_some())
    }

    fn query(
        &self,
        partition: &str,
        prefix: &str,
        options: &QueryOptions,
    ) -> TableResult<QueryPage> {
        let map = self.read_map()?;
        let in_scope =
            |k: &RowKey| k.partition == partition && k.sort_key.starts_with(prefix);
        let lower = RowKey::new(partition, prefix);
        let resume = options
            .exclusive_start
            .as_ref()
            .map(|start| RowKey::new(partition, start.as_str()));
        let take = options.limit.saturating_add(1);

        let mut rows: Vec<Row> = if options.reverse {
            let upper = match resume {
                Some(key) if key <= lower => return Ok(QueryPage::default()),
                Some(key) => Bound::Excluded(key),
                None => Bound::Unbounded,
            };
            map.range((Bound::Included(lower), upper))
                .rev()
                .skip_while(|&(k, _)| !in_scope(k))
                .take_while(|&(k, _)| in_scope(k))
                .take(take)
                .map(|(_, row)| row.clone())
                .collect()
        } else {
            let start = match resume {
                Some(key) if key > lower => Bound::Excluded(key),
                _ => Bound::Included(lower),
            };
            map.range((start, Bound::Unbounded))
                .take_while(|&(k, _)| in_scope(k))
                .take(take)
                .map(|(_, row)| row.clone())
                .collect()
        };

        let last_key = if rows.len() > options.limit {
            rows.truncate(options.limit);
            rows.last().map(|row| row.key.sort_key.clone())
        } else {
            None
        };
        Ok(QueryPage { rows, last_key })
    }
}

impl std::fmt::Debug for MemoryTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let count = self.read_map().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("MemoryTable")
            .field("row_count", &count)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PK: &str = "record";

    fn row(sort_key: &str) -> Row {
        Row::new(RowKey::new(PK, sort_key)).with_field("name", sort_key)
    }

    fn seeded(keys: &[&str]) -> MemoryTable {
        MemoryTable::from_rows(keys.iter().map(|k| row(k)))
    }

    fn keys(page: &QueryPage) -> Vec<&str> {
        page.rows.iter().map(|r| r.sort_key()).collect()
    }

    // -----------------------------------------------------------------------
    // Core CRUD
    // -----------------------------------------------------------------------

    #[test]
    fn put_and_get() {
        let table = MemoryTable::new();
        let r = row("/users/1");
        table.put(&r).unwrap();
        assert_eq!(table.get(&r.key).unwrap(), Some(r));
    }

    #[test]
    fn put_overwrites_whole_row() {
        let table = MemoryTable::new();
        let key = RowKey::new(PK, "/users/1");
        table
            .put(&Row::new(key.clone()).with_field("a", 1i64).with_field("b", 2i64))
            .unwrap();
        table.put(&Row::new(key.clone()).with_field("c", 3i64)).unwrap();
        let stored = table.get(&key).unwrap().unwrap();
        assert_eq!(stored.fields.len(), 1);
        assert!(stored.fields.contains_key("c"));
    }

    #[test]
    fn get_missing_returns_none() {
        let table = MemoryTable::new();
        assert!(table.get(&RowKey::new(PK, "/nope/1")).unwrap().is_none());
    }

    #[test]
    fn put_if_absent_refuses_taken_key() {
        let table = MemoryTable::new();
        assert!(table.put_if_absent(&row("/c/1")).unwrap());
        let other = Row::new(RowKey::new(PK, "/c/1")).with_field("name", "other");
        assert!(!table.put_if_absent(&other).unwrap());
        let stored = table.get(&other.key).unwrap().unwrap();
        assert_eq!(stored.fields["name"].as_str(), Some("/c/1"));
    }

    #[test]
    fn delete_reports_presence() {
        let table = seeded(&["/c/1"]);
        let key = RowKey::new(PK, "/c/1");
        assert!(table.delete(&key).unwrap());
        assert!(!table.delete(&key).unwrap());
        assert!(table.is_empty().unwrap());
    }

    #[test]
    fn delete_many_counts_existing_rows() {
        let table = seeded(&["/c/1", "/c/2", "/d/1"]);
        let keys = [
            RowKey::new(PK, "/c/1"),
            RowKey::new(PK, "/c/2"),
            RowKey::new(PK, "/c/3"),
        ];
        assert_eq!(table.delete_many(&keys).unwrap(), 2);
        assert_eq!(table.sort_keys(PK).unwrap(), vec!["/d/1"]);
        assert_eq!(table.delete_many(&[]).unwrap(), 0);
    }

    // -----------------------------------------------------------------------
    // Range queries
    // -----------------------------------------------------------------------

    #[test]
    fn query_is_prefix_scoped_and_sorted() {
        let table = seeded(&["/b/1", "/a/2", "/a/1", "/a/1/x/1", "/ab/1"]);
        let page = table.query(PK, "/a/", &QueryOptions::new()).unwrap();
        assert_eq!(keys(&page), vec!["/a/1", "/a/1/x/1", "/a/2"]);
        assert!(page.is_last());
    }

    #[test]
    fn query_respects_partition() {
        let table = seeded(&["/a/1"]);
        table
            .put(&Row::new(RowKey::new("other", "/a/2")))
            .unwrap();
        let page = table.query(PK, "/a/", &QueryOptions::new()).unwrap();
        assert_eq!(keys(&page), vec!["/a/1"]);
    }

    #[test]
    fn query_reverse_with_limit() {
        let table = seeded(&["/a/1", "/a/2", "/a/3", "/b/1"]);
        let page = table
            .query(PK, "/a/", &QueryOptions::new().reverse().limit(1))
            .unwrap();
        assert_eq!(keys(&page), vec!["/a/3"]);
        assert_eq!(page.last_key.as_deref(), Some("/a/3"));
    }

    #[test]
    fn query_lexicographic_not_numeric() {
        let table = seeded(&["/a/9", "/a/10"]);
        let page = table
            .query(PK, "/a/", &QueryOptions::new().reverse().limit(1))
            .unwrap();
        assert_eq!(keys(&page), vec!["/a/9"]);
    }

    #[test]
    fn forward_pagination_visits_every_row_once() {
        let table = seeded(&["/a/1", "/a/2", "/a/3", "/a/4", "/a/5"]);
        let mut seen = Vec::new();
        let mut options = QueryOptions::new().limit(2);
        loop {
            let page = table.query(PK, "/a/", &options).unwrap();
            seen.extend(page.rows.iter().map(|r| r.sort_key().to_string()));
            match page.last_key {
                Some(last) => options = options.start_after(last),
                None => break,
            }
        }
        assert_eq!(seen, vec!["/a/1", "/a/2", "/a/3", "/a/4", "/a/5"]);
    }

    #[test]
    fn reverse_pagination_visits_every_row_once() {
        let table = seeded(&["/a/1", "/a/2", "/a/3", "/z/1"]);
        let mut seen = Vec::new();
        let mut options = QueryOptions::new().reverse().limit(2);
        loop {
            let page = table.query(PK, "/a/", &options).unwrap();
            seen.extend(page.rows.iter().map(|r| r.sort_key().to_string()));
            match page.last_key {
                Some(last) => options = options.start_after(last),
                None => break,
            }
        }
        assert_eq!(seen, vec!["/a/3", "/a/2", "/a/1"]);
    }

    #[test]
    fn exact_limit_has_no_continuation() {
        let table = seeded(&["/a/1", "/a/2"]);
        let page = table.query(PK, "/a/", &QueryOptions::new().limit(2)).unwrap();
        assert_eq!(page.rows.len(), 2);
        assert!(page.is_last());
    }

    #[test]
    fn empty_query() {
        let table = MemoryTable::new();
        let page = table.query(PK, "/a/", &QueryOptions::new()).unwrap();
        assert!(page.rows.is_empty());
        assert!(page.is_last());
    }

    // -----------------------------------------------------------------------
    // Utility methods
    // -----------------------------------------------------------------------

    #[test]
    fn rows_and_sort_keys_are_ordered() {
        let table = seeded(&["/b/1", "/a/1"]);
        assert_eq!(table.sort_keys(PK).unwrap(), vec!["/a/1", "/b/1"]);
        assert_eq!(table.rows().unwrap().len(), 2);
        table.clear().unwrap();
        assert_eq!(table.len().unwrap(), 0);
    }

    #[test]
    fn concurrent_writes_are_safe() {
        use std::sync::Arc;
        use std::thread;

        let table = Arc::new(MemoryTable::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let table = Arc::clone(&table);
                thread::spawn(move || {
                    table.put(&row(&format!("/t/{i}"))).unwrap();
                })
            })
            .collect();
        for h in handles {
            h.join().expect("thread should not panic");
        }
        assert_eq!(table.len().unwrap(), 8);
    }

    #[test]
    fn debug_format() {
        let table = seeded(&["/a/1"]);
        let debug = format!("{table:?}");
        assert!(debug.contains("MemoryTable"));
        assert!(debug.contains("row_count"));
    }
}
