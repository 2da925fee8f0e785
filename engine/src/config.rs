use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

// Upper bound of any tree or sponsor chain walk
pub const DEFAULT_MAX_WALK_DEPTH: usize = 10_000;

// Default depth of tree reports
pub const DEFAULT_MAX_TREE_QUERY_DEPTH: usize = 64;

// Default folder for the sled database
pub const DEFAULT_DB_PATH: &str = "mlm_data";

// Default sled page cache: 64 MiB
pub const DEFAULT_CACHE_CAPACITY: u64 = 64 * 1024 * 1024;

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[clap(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    /// Nothing is persisted
    Memory,
    #[default]
    Sled,
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Storage backend to use
    #[clap(long, value_enum, default_value_t = StorageBackend::Sled)]
    #[serde(default)]
    pub backend: StorageBackend,

    /// Folder of the sled database
    #[clap(long, default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Sled page cache size in bytes
    #[clap(long, default_value_t = DEFAULT_CACHE_CAPACITY)]
    pub cache_capacity: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, clap::Args, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of steps of any upline or downline walk
    #[clap(long, default_value_t = DEFAULT_MAX_WALK_DEPTH)]
    pub max_walk_depth: usize,

    /// Maximum depth of tree reports
    #[clap(long, default_value_t = DEFAULT_MAX_TREE_QUERY_DEPTH)]
    pub max_tree_query_depth: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_walk_depth: DEFAULT_MAX_WALK_DEPTH,
            max_tree_query_depth: DEFAULT_MAX_TREE_QUERY_DEPTH,
        }
    }
}
