//! Configuration for the ledger

use crate::types::{FarmId, Principal};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Ledger configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Data directory for RocksDB
    pub data_dir: PathBuf,

    /// Service name
    pub service_name: String,

    /// Service version
    pub service_version: String,

    /// Administrative owner recorded on first open
    pub administrator: String,

    /// Actor mailbox capacity (bounded for backpressure)
    pub mailbox_capacity: usize,

    /// Live event broadcast buffer
    pub event_channel_capacity: usize,

    /// RocksDB configuration
    pub rocksdb: RocksDBConfig,

    /// Bundled farm directory
    #[serde(default)]
    pub farms: FarmsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data/batch-ledger"),
            service_name: "batch-ledger".to_string(),
            service_version: env!("CARGO_PKG_VERSION").to_string(),
            administrator: "ledger-admin".to_string(),
            mailbox_capacity: 1024,
            event_channel_capacity: 1024,
            rocksdb: RocksDBConfig::default(),
            farms: FarmsConfig::default(),
        }
    }
}

/// RocksDB configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RocksDBConfig {
    /// Write buffer size (MB)
    pub write_buffer_size_mb: usize,

    /// Max write buffers
    pub max_write_buffer_number: i32,

    /// Max background jobs (compaction + flush)
    pub max_background_jobs: i32,

    /// Enable statistics
    pub enable_statistics: bool,
}

impl Default for RocksDBConfig {
    fn default() -> Self {
        Self {
            write_buffer_size_mb: 64,
            max_write_buffer_number: 3,
            max_background_jobs: 2,
            enable_statistics: false,
        }
    }
}

/// Farms reported active by the in-memory directory
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FarmsConfig {
    /// Active farm IDs
    pub active: Vec<u64>,
}

impl Config {
    /// Load from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| crate::Error::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from environment variables
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Config::default();

        if let Ok(data_dir) = std::env::var("BATCH_LEDGER_DATA_DIR") {
            config.data_dir = PathBuf::from(data_dir);
        }

        if let Ok(admin) = std::env::var("BATCH_LEDGER_ADMIN") {
            config.administrator = admin;
        }

        if let Ok(farms) = std::env::var("BATCH_LEDGER_ACTIVE_FARMS") {
            config.farms.active = parse_farm_list(&farms)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check values that would make the ledger unusable
    pub fn validate(&self) -> crate::Result<()> {
        if self.administrator.trim().is_empty() {
            return Err(crate::Error::Config("administrator must not be empty".into()));
        }
        if self.mailbox_capacity == 0 || self.event_channel_capacity == 0 {
            return Err(crate::Error::Config("channel capacities must be positive".into()));
        }
        Ok(())
    }

    /// Administrator as a principal
    pub fn administrator(&self) -> Principal {
        Principal::new(self.administrator.clone())
    }

    /// Active farm IDs from the `farms` block
    pub fn active_farms(&self) -> Vec<FarmId> {
        self.farms.active.iter().copied().map(FarmId).collect()
    }
}

fn parse_farm_list(raw: &str) -> crate::Result<Vec<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            s.parse::<u64>()
                .map_err(|e| crate::Error::Config(format!("Invalid farm id {:?}: {}", s, e)))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.service_name, "batch-ledger");
        assert_eq!(config.administrator(), Principal::new("ledger-admin"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_toml() {
        let raw = r#"
            data_dir = "/var/lib/batch-ledger"
            service_name = "batch-ledger"
            service_version = "0.1.0"
            administrator = "SP-ADMIN"
            mailbox_capacity = 16
            event_channel_capacity = 16

            [rocksdb]
            write_buffer_size_mb = 32
            max_write_buffer_number = 2
            max_background_jobs = 1
            enable_statistics = false

            [farms]
            active = [1, 3]
        "#;
        let config: Config = toml::from_str(raw).unwrap();
        assert_eq!(config.administrator, "SP-ADMIN");
        assert_eq!(config.active_farms(), vec![FarmId(1), FarmId(3)]);
    }

    #[test]
    fn test_parse_farm_list() {
        assert_eq!(parse_farm_list("1, 2,,5").unwrap(), vec![1, 2, 5]);
        assert!(parse_farm_list("1,x").is_err());
    }

    #[test]
    fn test_empty_administrator_rejected() {
        let mut config = Config::default();
        config.administrator = "  ".into();
        assert!(config.validate().is_err());
    }
}
