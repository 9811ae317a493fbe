use serde::{Deserialize, Serialize};

/// Tuning knobs for [`crate::DocumentStore`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Constant partition key shared by every row.
    pub partition: String,
    /// Rows fetched per range query while scanning, allocating, or deleting.
    pub page_size: usize,
    /// Deepest document nesting accepted by a write.
    pub max_depth: usize,
    /// Conditional-put attempts before an allocation gives up.
    pub allocation_attempts: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            partition: "record".into(),
            page_size: 100,
            max_depth: 32,
            allocation_attempts: 8,
        }
    }
}
