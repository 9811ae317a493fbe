use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::TableResult;
use crate::file::FileTable;
use crate::memory::MemoryTable;
use crate::traits::Table;

/// Which [`Table`] implementation to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    #[default]
    Memory,
    File,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub backend: BackendKind,
    /// Snapshot location for the `file` backend.
    pub path: PathBuf,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::Memory,
            path: PathBuf::from("rapid-data.json"),
        }
    }
}

impl TableConfig {
    /// Open the configured backend.
    pub fn open(&self) -> TableResult<Arc<dyn Table>> {
        match self.backend {
            BackendKind::Memory => Ok(Arc::new(MemoryTable::new())),
            BackendKind::File => Ok(Arc::new(FileTable::open(&self.path)?)),
        }
    }
}
