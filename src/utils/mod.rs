pub mod rate_limiter;
pub mod retry;

use alloy_primitives::Address;
use anyhow::{Context, Result};
use std::path::Path;
use tracing::{info, warn};

use crate::models::common::Config;

pub fn strip_hex_prefix(hex: &str) -> &str {
    hex.strip_prefix("0x")
        .or_else(|| hex.strip_prefix("0X"))
        .unwrap_or(hex)
}

pub fn parse_decimal_u64(value: &str) -> Option<u64> {
    value.trim().parse::<u64>().ok()
}

/// Lowercase, 0x-prefixed form used in datasets and logs.
pub fn format_address(address: &Address) -> String {
    format!("{address:#x}")
}

pub fn load_config<P: AsRef<Path>>(file_name: P) -> Result<Config> {
    let config_path = file_name.as_ref();
    info!("Config path: {}", config_path.to_string_lossy());

    // File first, then COLLECTOR_* environment overrides (e.g. COLLECTOR_API_KEY)
    let config: Config = config::Config::builder()
        .add_source(config::File::from(config_path))
        .add_source(
            config::Environment::with_prefix("COLLECTOR")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()
        .context("failed to read config file")?
        .try_deserialize()
        .context("failed to parse config YAML")?;

    config.validate()?;

    if config.api_key.is_empty() {
        warn!("No API key configured. Set COLLECTOR_API_KEY or api_key in the config file");
    }

    Ok(config)
}

pub(crate) fn strip_html(error: &str) -> String {
    // If the error contains HTML tags, extract just the text content
    if error.contains("<!doctype html>") || error.contains("<html>") {
        // Remove all HTML tags and return the first non-empty line of text
        error
            .lines()
            .map(|line| line.trim())
            .find(|line| {
                !line.starts_with('<')
                    && !line.ends_with('>')
                    && !line.is_empty()
                    && !line.starts_with("<!")
                    && *line != "html"
                    && *line != "body"
            })
            .unwrap_or(error)
            .to_string()
    } else {
        // Return original error if no HTML
        error.to_string()
    }
}
