//! Daemon configuration loading.
//!
//! Loads configuration from:
//! - Linux/macOS: `~/.config/relaymon/config.toml`
//! - Windows: `%APPDATA%/relaymon/config.toml`
//!
//! `RELAYMON_CONFIG` overrides the config file path. A missing file yields
//! the built-in defaults; a file that exists but does not parse is an
//! error, never silently ignored.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::AppPaths;
use crate::core::channel::{Channel, ChannelStatus, parse_channel_type};
use crate::core::pricing::PriceData;
use crate::core::settings::MonitorConfig;
use crate::error::{RelayError, Result};

/// Environment variable to override config file path.
pub const ENV_CONFIG: &str = "RELAYMON_CONFIG";

// =============================================================================
// Config Shape
// =============================================================================

/// HTTP listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address the daemon binds.
    pub bind: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8787".to_string(),
        }
    }
}

/// One configured channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub id: i64,
    pub name: String,
    /// Channel type name, e.g. "openai", "anthropic", "gemini".
    #[serde(rename = "type")]
    pub channel_type: String,
    pub base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub test_model: Option<String>,
    #[serde(default = "default_auto_ban")]
    pub auto_ban: bool,
    /// Per-channel model aliases, requested name to upstream name.
    #[serde(default)]
    pub model_mapping: HashMap<String, String>,
}

const fn default_auto_ban() -> bool {
    true
}

impl ChannelConfig {
    /// Convert into a runtime channel record.
    pub fn to_channel(&self) -> Result<Channel> {
        Ok(Channel {
            id: self.id,
            name: self.name.clone(),
            channel_type: parse_channel_type(&self.channel_type)?,
            status: ChannelStatus::Enabled,
            auto_ban: self.auto_ban,
            test_model: self.test_model.clone(),
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            response_time_ms: 0,
        })
    }
}

/// Complete daemon configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DaemonConfig {
    pub server: ServerConfig,
    pub monitor: MonitorConfig,
    #[serde(rename = "channel")]
    pub channels: Vec<ChannelConfig>,
    /// Per-model pricing records.
    pub pricing: HashMap<String, PriceData>,
    /// Per-model raw probe-override bodies.
    pub overrides: HashMap<String, String>,
}

impl DaemonConfig {
    /// Load from the default location, honoring `RELAYMON_CONFIG`.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    /// The effective config file path.
    #[must_use]
    pub fn config_path() -> PathBuf {
        if let Ok(path) = std::env::var(ENV_CONFIG) {
            let trimmed = path.trim();
            if !trimmed.is_empty() {
                return PathBuf::from(trimmed);
            }
        }
        AppPaths::new().config_file()
    }

    /// Load from an explicit path; a missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path).map_err(|e| RelayError::Configuration {
            message: format!("cannot read {}: {e}", path.display()),
        })?;
        let config: Self = toml::from_str(&raw).map_err(|e| RelayError::Configuration {
            message: format!("invalid config {}: {e}", path.display()),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the daemon cannot run with.
    pub fn validate(&self) -> Result<()> {
        let mut seen = std::collections::HashSet::new();
        for channel in &self.channels {
            parse_channel_type(&channel.channel_type)?;
            if !seen.insert(channel.id) {
                return Err(RelayError::Configuration {
                    message: format!("duplicate channel id {}", channel.id),
                });
            }
            if channel.base_url.trim().is_empty() {
                return Err(RelayError::Configuration {
                    message: format!("channel {} has an empty base_url", channel.id),
                });
            }
        }
        Ok(())
    }

    /// Convert all channel entries into runtime records.
    pub fn build_channels(&self) -> Result<Vec<Channel>> {
        self.channels.iter().map(ChannelConfig::to_channel).collect()
    }
}
