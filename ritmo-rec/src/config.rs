//! Service configuration
//!
//! Loaded from the TOML config file resolved by ritmo-common (CLI > env >
//! config file > OS default for the root folder; the same file carries the
//! recognizer credentials and allow-list override).

use ritmo_common::{config as common_config, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn};

/// Top-level service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RecConfig {
    /// Cloud recognizer settings
    #[serde(default)]
    pub recognizer: RecognizerConfig,

    /// Artist allow-list override; the built-in list is used when absent
    #[serde(default)]
    pub allowlist: AllowlistConfig,
}

/// Cloud identify endpoint settings
#[derive(Debug, Clone, Deserialize)]
pub struct RecognizerConfig {
    /// Identify endpoint URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// API access key sent with each identify request
    #[serde(default)]
    pub access_key: String,

    /// Capture window in seconds
    #[serde(default = "default_capture_seconds")]
    pub capture_seconds: u64,
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            access_key: String::new(),
            capture_seconds: default_capture_seconds(),
        }
    }
}

/// Allow-list section
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AllowlistConfig {
    /// Artist names; replaces the built-in list when present
    pub artists: Option<Vec<String>>,
}

fn default_endpoint() -> String {
    "https://identify-us-west-2.acrcloud.com/v1/identify".to_string()
}

fn default_capture_seconds() -> u64 {
    12
}

/// Load the service configuration
///
/// Falls back to defaults when no config file exists; the service still
/// runs, the identify client just has no credentials until configured.
pub fn load(explicit_path: Option<&Path>) -> Result<RecConfig> {
    let path = match explicit_path {
        Some(p) => p.to_path_buf(),
        None => match common_config::default_config_file() {
            Ok(p) => p,
            Err(_) => {
                warn!("No config file found, using built-in defaults");
                return Ok(RecConfig::default());
            }
        },
    };

    let config: RecConfig = common_config::load_toml(&path)?;
    info!("Loaded configuration from {}", path.display());
    Ok(config)
}
