//! Table engine configuration

use serde::{Deserialize, Serialize};

/// Tuning knobs shared by every table of a database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableConfig {
    /// Record cache capacity; 0 disables caching (default: 100)
    #[serde(default = "default_max_cache_size")]
    pub max_cache_size: usize,

    /// Commit the index after every mutation instead of on demand.
    /// Higher durability, lower write throughput (default: false)
    #[serde(default)]
    pub auto_commit_index: bool,
}

fn default_max_cache_size() -> usize {
    100
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_cache_size: default_max_cache_size(),
            auto_commit_index: false,
        }
    }
}
