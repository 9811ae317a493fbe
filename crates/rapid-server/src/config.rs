use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use serde::{Deserialize, Serialize};

use rapid_engine::{DocumentStore, EngineConfig};
use rapid_table::TableConfig;

use crate::error::{ServerError, ServerResult};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
        }
    }
}

/// Complete Rapid configuration, one TOML section per layer:
///
/// ```toml
/// [server]
/// bind_addr = "0.0.0.0:8080"
///
/// [table]
/// backend = "file"
/// path = "/var/lib/rapid/data.json"
///
/// [engine]
/// page_size = 100
/// ```
///
/// Missing sections and keys fall back to their defaults.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RapidConfig {
    pub server: ServerConfig,
    pub table: TableConfig,
    pub engine: EngineConfig,
}

impl RapidConfig {
    pub fn from_toml(text: &str) -> ServerResult<Self> {
        toml::from_str(text).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> ServerResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> ServerResult<String> {
        toml::to_string_pretty(self).map_err(|e| ServerError::Config(e.to_string()))
    }

    /// Open the configured table backend and wrap it in a document store.
    pub fn open_store(&self) -> ServerResult<DocumentStore> {
        let table = self.table.open()?;
        Ok(DocumentStore::new(table, self.engine.clone()))
    }
}
