/// Configuration (§6, §9 ambient stack). Loaded from `config.toml` with
/// environment overrides (`CHAININDEX_*`), matching the teacher's
/// `config`-crate + process-wide `OnceCell` convention. The library itself
/// never reaches into the global cell — only the `main` binary installs it.
use once_cell::sync::OnceCell;
use serde::Deserialize;

use crate::error::IndexError;

static GLOBAL_CONFIG: OnceCell<IndexerConfig> = OnceCell::new();

#[derive(Debug, Clone, Deserialize)]
pub struct IndexerConfig {
    /// Selects the magic value stored under `O`; mismatch on open is fatal.
    pub network: u32,
    /// If true, the store is ephemeral (`MemoryStore`); otherwise on disk at
    /// `location` (`RocksStore`).
    #[serde(default)]
    pub memory: bool,
    /// Filesystem path root; joined with `index/` unless `location` is set.
    #[serde(default = "default_prefix")]
    pub prefix: String,
    pub location: Option<String>,
    #[serde(default = "default_max_files")]
    pub max_files: u32,
    #[serde(default = "default_cache_size")]
    pub cache_size: usize,
    #[serde(default = "default_true")]
    pub compression: bool,
    /// Ordered list of plugin identifiers to load (`"tx"`, `"addr"`).
    #[serde(default = "default_indexers")]
    pub indexers: Vec<String>,
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
    #[serde(default = "default_rollback_chunk_size")]
    pub rollback_chunk_size: usize,
}

fn default_prefix() -> String {
    ".".to_string()
}

fn default_max_files() -> u32 {
    64
}

fn default_cache_size() -> usize {
    16 * 1024 * 1024
}

fn default_true() -> bool {
    true
}

fn default_indexers() -> Vec<String> {
    vec!["tx".to_string(), "addr".to_string()]
}

fn default_channel_capacity() -> usize {
    256
}

fn default_rollback_chunk_size() -> usize {
    10_000
}

impl IndexerConfig {
    /// Resolved on-disk path for the `RocksStore`, honoring the
    /// `location` override.
    pub fn store_path(&self) -> String {
        match &self.location {
            Some(location) => location.clone(),
            None => format!("{}/index", self.prefix),
        }
    }
}

pub fn load_config() -> Result<IndexerConfig, IndexError> {
    config::Config::builder()
        .add_source(config::File::with_name("config").required(false))
        .add_source(config::Environment::with_prefix("CHAININDEX").separator("_"))
        .build()
        .and_then(|c| c.try_deserialize())
        .map_err(|e| IndexError::Config(e.to_string()))
}

pub fn init_global_config(config: IndexerConfig) -> Result<(), IndexError> {
    GLOBAL_CONFIG
        .set(config)
        .map_err(|_| IndexError::Config("config already initialized".into()))
}

pub fn get_global_config() -> &'static IndexerConfig {
    GLOBAL_CONFIG
        .get()
        .expect("init_global_config must run before get_global_config")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_path_honors_location_override() {
        let mut cfg = IndexerConfig {
            network: 1,
            memory: false,
            prefix: "/data".to_string(),
            location: None,
            max_files: 64,
            cache_size: 1024,
            compression: true,
            indexers: default_indexers(),
            channel_capacity: 256,
            rollback_chunk_size: 10_000,
        };
        assert_eq!(cfg.store_path(), "/data/index");

        cfg.location = Some("/override/path".to_string());
        assert_eq!(cfg.store_path(), "/override/path");
    }
}
