use alloy_primitives::Address;
use serde::{Deserialize, Serialize};

use crate::models::errors::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    pub address: String,
    pub port: u16,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            address: "0.0.0.0".to_string(),
            port: 9100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottleConfig {
    pub max_calls_per_second: f64,
    pub short_pause_every: u64,
    pub short_pause_secs: f64,
    pub long_pause_every: u64,
    pub long_pause_secs: f64,
}

impl Default for ThrottleConfig {
    fn default() -> Self {
        Self {
            max_calls_per_second: 3.0,
            short_pause_every: 25,
            short_pause_secs: 5.0,
            long_pause_every: 100,
            long_pause_secs: 30.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CollectionConfig {
    pub discovery_sample_size: usize,
    pub discovery_min_occurrences: usize,
    pub discovery_max_new: usize,
    pub checkpoint_interval: usize,
    pub progress_interval: usize,
}

impl Default for CollectionConfig {
    fn default() -> Self {
        Self {
            discovery_sample_size: 25,
            discovery_min_occurrences: 2,
            discovery_max_new: 5,
            checkpoint_interval: 50,
            progress_interval: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub connect_timeout_secs: u64,
    pub list_timeout_secs: u64,
    pub receipt_timeout_secs: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.etherscan.io/v2/api".to_string(),
            connect_timeout_secs: 5,
            list_timeout_secs: 20,
            receipt_timeout_secs: 13,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenConfig {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub chain_name: String,
    #[serde(default = "default_chain_id")]
    pub chain_id: u64,
    #[serde(default)]
    pub api_key: String,
    pub contract_address: Address,
    #[serde(default)]
    pub known_settlements: Vec<Address>,
    #[serde(default)]
    pub auto_discover: bool,
    #[serde(default = "default_output_dir")]
    pub output_dir: String,
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
    #[serde(default)]
    pub tokens: Vec<TokenConfig>,
    #[serde(default)]
    pub explorer: ExplorerConfig,
    #[serde(default)]
    pub throttle: ThrottleConfig,
    #[serde(default)]
    pub collection: CollectionConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

fn default_chain_id() -> u64 {
    59144 // Linea
}

fn default_output_dir() -> String {
    "data".to_string()
}

fn default_file_prefix() -> String {
    "metamask_card".to_string()
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.throttle.max_calls_per_second;
        if !(rate.is_finite() && rate > 0.0) {
            return Err(ConfigError::InvalidRate { got: rate });
        }
        if self.collection.checkpoint_interval == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "collection.checkpoint_interval".to_string(),
            });
        }
        if self.collection.progress_interval == 0 {
            return Err(ConfigError::ZeroInterval {
                field: "collection.progress_interval".to_string(),
            });
        }
        Ok(())
    }
}
