use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::info;

use rapid_table::{Row, Table};
use rapid_types::{parse_item_id, Document, StorePath};

use crate::config::EngineConfig;
use crate::decompose::Decomposer;
use crate::error::EngineResult;
use crate::merge::reconstruct;
use crate::rows::RowStore;

/// Result of a read.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadOutcome {
    /// Reconstructed documents in ascending path order.
    pub documents: Vec<Document>,
    /// Whether the read path addressed a collection.
    pub is_collection: bool,
}

impl ReadOutcome {
    /// Nothing stored at the path. Not an error.
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// JSON view: the single document for an item read, an array for a
    /// collection read, `None` when nothing was found.
    pub fn to_json(&self) -> Option<serde_json::Value> {
        if self.documents.is_empty() {
            return None;
        }
        if self.is_collection {
            Some(serde_json::Value::Array(
                self.documents.iter().map(Document::to_json).collect(),
            ))
        } else {
            self.documents.first().map(Document::to_json)
        }
    }
}

/// The document store facade.
///
/// Thread-safe: share it behind an `Arc`. Every call is a sequence of
/// blocking table round trips.
pub struct DocumentStore {
    rows: RowStore,
    config: EngineConfig,
}

impl DocumentStore {
    pub fn new(table: Arc<dyn Table>, config: EngineConfig) -> Self {
        let rows = RowStore::new(table, config.partition.clone(), config.page_size);
        Self { rows, config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Persist `document` at `path`, allocating an id when `path` is a
    /// collection. Returns the stored view of the document.
    pub fn write(&self, path: &StorePath, document: Document) -> EngineResult<Document> {
        let decomposer = Decomposer::new(
            &self.rows,
            self.config.max_depth,
            self.config.allocation_attempts,
        );
        let stored = decomposer.decompose(path, document)?;
        info!(path = %path, stored = ?stored.path(), "document written");
        Ok(stored)
    }

    /// Read the document at an item path, or every document in a collection.
    pub fn read(&self, path: &StorePath) -> EngineResult<ReadOutcome> {
        let mut rows = self.rows.scan(path)?;
        let is_collection = path.is_collection();
        if !rows.is_empty() {
            self.add_anchors(path, &mut rows)?;
        }
        let documents = reconstruct(rows);
        info!(path = %path, documents = documents.len(), "documents read");
        Ok(ReadOutcome {
            documents,
            is_collection,
        })
    }

    /// Delete the row at `path` and every row beneath it. Returns the number
    /// of rows removed.
    pub fn delete(&self, path: &StorePath) -> EngineResult<usize> {
        let deleted = self.rows.delete_by_prefix(path)?;
        info!(path = %path, deleted, "scope deleted");
        Ok(deleted)
    }

    /// Give rowless items an empty row to hang their descendants on, so an
    /// item still reads back as one document.
    fn add_anchors(&self, path: &StorePath, rows: &mut Vec<Row>) -> EngineResult<()> {
        let present: BTreeSet<&str> = rows.iter().map(Row::sort_key).collect();
        let mut missing = Vec::new();
        if path.is_collection() {
            let ids: BTreeSet<u64> = rows
                .iter()
                .filter_map(|r| path.immediate_child_segment(r.sort_key()))
                .filter_map(parse_item_id)
                .collect();
            for id in ids {
                let item = path.item(id)?;
                if !present.contains(item.as_str()) {
                    missing.push(item);
                }
            }
        } else if !present.contains(path.as_str()) {
            missing.push(path.clone());
        }
        rows.extend(missing.iter().map(|item| Row::new(self.rows.key(item))));
        Ok(())
    }
}

impl std::fmt::Debug for DocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStore")
            .field("rows", &self.rows)
            .field("config", &self.config)
            .finish()
    }
}
