use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use rapid_types::Scalar;

/// Two-part row key. Rows order by partition, then sort key, bytewise.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RowKey {
    pub partition: String,
    pub sort_key: String,
}

impl RowKey {
    pub fn new(partition: impl Into<String>, sort_key: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort_key: sort_key.into(),
        }
    }
}

/// The physical unit of storage: a key plus flat scalar fields.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub key: RowKey,
    #[serde(default)]
    pub fields: BTreeMap<String, Scalar>,
}

impl Row {
    pub fn new(key: RowKey) -> Self {
        Self {
            key,
            fields: BTreeMap::new(),
        }
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn sort_key(&self) -> &str {
        &self.key.sort_key
    }
}

/// Options for a prefix range query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueryOptions {
    /// Maximum number of rows in the returned page.
    pub limit: usize,
    /// Return rows in descending sort-key order.
    pub reverse: bool,
    /// Resume strictly after (or, in reverse, strictly before) this sort key.
    pub exclusive_start: Option<String>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn reverse(mut self) -> Self {
        self.reverse = true;
        self
    }

    pub fn start_after(mut self, sort_key: impl Into<String>) -> Self {
        self.exclusive_start = Some(sort_key.into());
        self
    }
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            limit: usize::MAX,
            reverse: false,
            exclusive_start: None,
        }
    }
}

/// One page of query results.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryPage {
    pub rows: Vec<Row>,
    /// Sort key of the last returned row when more rows remain.
    pub last_key: Option<String>,
}

impl QueryPage {
    pub fn is_last(&self) -> bool {
        self.last_key.is_none()
    }
}
