//! Search configuration

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Search projection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Path to the search index directory
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,

    /// Index writer heap size in bytes
    #[serde(default = "default_writer_heap_size")]
    pub writer_heap_size: usize,

    /// Commit (and reload the reader) after every applied mutation
    #[serde(default = "default_realtime_indexing")]
    pub realtime_indexing: bool,

    /// Maximum search results to return
    #[serde(default = "default_max_results")]
    pub max_results: usize,
}

fn default_index_path() -> PathBuf {
    PathBuf::from("./data/search_index")
}

fn default_writer_heap_size() -> usize {
    50_000_000 // 50MB
}

fn default_realtime_indexing() -> bool {
    true
}

fn default_max_results() -> usize {
    1000
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_path: default_index_path(),
            writer_heap_size: default_writer_heap_size(),
            realtime_indexing: default_realtime_indexing(),
            max_results: default_max_results(),
        }
    }
}
