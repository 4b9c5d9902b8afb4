//! Channel model and the registry boundary.
//!
//! A channel is a configured upstream provider credential/endpoint. The
//! registry owns persistence; this core only reads channel fields and issues
//! status-mutation requests through the [`ChannelStore`] trait.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::error::{RelayError, Result};

// =============================================================================
// Channel Type
// =============================================================================

/// Supported upstream provider types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelType {
    OpenAI,
    Anthropic,
    Gemini,
    MokaAI,
    VolcEngine,
    Midjourney,
    MidjourneyPlus,
    Suno,
    Kling,
    Jimeng,
    DoubaoVideo,
    Vidu,
}

impl ChannelType {
    /// All channel types in display order.
    pub const ALL: &'static [Self] = &[
        Self::OpenAI,
        Self::Anthropic,
        Self::Gemini,
        Self::MokaAI,
        Self::VolcEngine,
        Self::Midjourney,
        Self::MidjourneyPlus,
        Self::Suno,
        Self::Kling,
        Self::Jimeng,
        Self::DoubaoVideo,
        Self::Vidu,
    ];

    /// Channel types whose probes are never attempted; these providers have
    /// no testable synchronous completion surface.
    pub const UNSUPPORTED_FOR_TESTING: &'static [Self] = &[
        Self::Midjourney,
        Self::MidjourneyPlus,
        Self::Suno,
        Self::Kling,
        Self::Jimeng,
        Self::DoubaoVideo,
        Self::Vidu,
    ];

    /// Display name for human output and error messages.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::OpenAI => "OpenAI",
            Self::Anthropic => "Anthropic",
            Self::Gemini => "Gemini",
            Self::MokaAI => "MokaAI",
            Self::VolcEngine => "VolcEngine",
            Self::Midjourney => "Midjourney",
            Self::MidjourneyPlus => "Midjourney Plus",
            Self::Suno => "Suno",
            Self::Kling => "Kling",
            Self::Jimeng => "Jimeng",
            Self::DoubaoVideo => "Doubao Video",
            Self::Vidu => "Vidu",
        }
    }

    /// Whether probing this channel type is supported at all.
    #[must_use]
    pub fn supports_testing(self) -> bool {
        !Self::UNSUPPORTED_FOR_TESTING.contains(&self)
    }
}

// =============================================================================
// Channel Status
// =============================================================================

/// Enabled/disabled status of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Serving traffic.
    Enabled,
    /// Disabled by an operator; never re-enabled automatically.
    ManuallyDisabled,
    /// Disabled by the health monitor; eligible for automatic re-enable.
    AutoDisabled,
}

impl ChannelStatus {
    /// Whether the channel is currently serving traffic.
    #[must_use]
    pub const fn is_enabled(self) -> bool {
        matches!(self, Self::Enabled)
    }
}

// =============================================================================
// Channel
// =============================================================================

/// One configured upstream channel.
///
/// Long-lived; mutated only through explicit [`ChannelStore`] calls issued
/// by the health monitor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub channel_type: ChannelType,
    pub status: ChannelStatus,
    /// Whether the fleet orchestrator may disable this channel automatically.
    pub auto_ban: bool,
    /// Stored test-model name used when a probe gives no explicit model.
    pub test_model: Option<String>,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Rolling observed response time from the last probe.
    pub response_time_ms: i64,
}

impl Channel {
    /// Resolved test model: the stored one, trimmed, if non-empty.
    #[must_use]
    pub fn stored_test_model(&self) -> Option<&str> {
        self.test_model
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
    }
}

// =============================================================================
// Registry Boundary
// =============================================================================

/// Narrow read/write boundary to the external channel registry.
pub trait ChannelStore: Send + Sync {
    /// Snapshot of all channels.
    fn list(&self) -> Vec<Channel>;

    /// Fetch one channel by id.
    fn get(&self, id: i64) -> Option<Channel>;

    /// Issue a status mutation, carrying the classified reason.
    fn set_status(&self, id: i64, status: ChannelStatus, reason: &str);

    /// Record the observed response time against the channel.
    fn record_response_time(&self, id: i64, millis: i64);
}

/// Resolves the accounting group attached to probe traffic.
pub trait GroupResolver: Send + Sync {
    /// Group name used for probe audit records and pricing.
    fn probe_group(&self) -> Result<String>;
}

/// Fixed-group resolver for deployments without user groups.
#[derive(Debug, Clone)]
pub struct StaticGroupResolver {
    group: String,
}

impl StaticGroupResolver {
    #[must_use]
    pub const fn new(group: String) -> Self {
        Self { group }
    }
}

impl Default for StaticGroupResolver {
    fn default() -> Self {
        Self::new("default".to_string())
    }
}

impl GroupResolver for StaticGroupResolver {
    fn probe_group(&self) -> Result<String> {
        Ok(self.group.clone())
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// In-memory channel registry, used by the demo daemon and tests.
#[derive(Debug, Default)]
pub struct MemoryChannelStore {
    channels: RwLock<HashMap<i64, Channel>>,
}

impl MemoryChannelStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with the given channels.
    #[must_use]
    pub fn with_channels(channels: Vec<Channel>) -> Self {
        let map = channels.into_iter().map(|c| (c.id, c)).collect();
        Self {
            channels: RwLock::new(map),
        }
    }

    /// Insert or replace a channel.
    pub fn upsert(&self, channel: Channel) {
        self.channels
            .write()
            .expect("channel store lock poisoned")
            .insert(channel.id, channel);
    }
}

impl ChannelStore for MemoryChannelStore {
    fn list(&self) -> Vec<Channel> {
        let mut channels: Vec<Channel> = self
            .channels
            .read()
            .expect("channel store lock poisoned")
            .values()
            .cloned()
            .collect();
        channels.sort_by_key(|c| c.id);
        channels
    }

    fn get(&self, id: i64) -> Option<Channel> {
        self.channels
            .read()
            .expect("channel store lock poisoned")
            .get(&id)
            .cloned()
    }

    fn set_status(&self, id: i64, status: ChannelStatus, reason: &str) {
        let mut channels = self.channels.write().expect("channel store lock poisoned");
        if let Some(channel) = channels.get_mut(&id) {
            tracing::info!(
                channel_id = id,
                channel = %channel.name,
                status = ?status,
                reason,
                "channel status changed"
            );
            channel.status = status;
        }
    }

    fn record_response_time(&self, id: i64, millis: i64) {
        let mut channels = self.channels.write().expect("channel store lock poisoned");
        if let Some(channel) = channels.get_mut(&id) {
            channel.response_time_ms = millis;
        }
    }
}

// =============================================================================
// Model Alias / Override Boundaries
// =============================================================================

/// External model-alias collaborator; may rewrite the requested model to the
/// channel's upstream name.
pub trait ModelMapper: Send + Sync {
    /// Returns the upstream name for `model` on this channel, if mapped.
    fn map(&self, channel: &Channel, model: &str) -> Result<Option<String>>;
}

/// Alias map keyed by (channel id, model name).
#[derive(Debug, Default)]
pub struct MemoryModelMapper {
    aliases: RwLock<HashMap<(i64, String), String>>,
}

impl MemoryModelMapper {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an alias for a (channel, model) pair.
    pub fn insert(&self, channel_id: i64, model: &str, upstream: &str) {
        self.aliases
            .write()
            .expect("alias map lock poisoned")
            .insert((channel_id, model.to_string()), upstream.to_string());
    }
}

impl ModelMapper for MemoryModelMapper {
    fn map(&self, channel: &Channel, model: &str) -> Result<Option<String>> {
        Ok(self
            .aliases
            .read()
            .expect("alias map lock poisoned")
            .get(&(channel.id, model.to_string()))
            .cloned())
    }
}

/// External store of per-model raw probe-override bodies.
pub trait OverrideStore: Send + Sync {
    /// Returns the stored raw JSON override for `model`, if any.
    fn probe_override(&self, model: &str) -> Result<Option<String>>;
}

/// Override store backed by a plain map.
#[derive(Debug, Default)]
pub struct MemoryOverrideStore {
    overrides: RwLock<HashMap<String, String>>,
}

impl MemoryOverrideStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw override body for a model.
    pub fn insert(&self, model: &str, body: &str) {
        self.overrides
            .write()
            .expect("override store lock poisoned")
            .insert(model.to_string(), body.to_string());
    }
}

impl OverrideStore for MemoryOverrideStore {
    fn probe_override(&self, model: &str) -> Result<Option<String>> {
        let overrides = self.overrides.read().expect("override store lock poisoned");
        match overrides.get(model) {
            Some(body) if !body.trim().is_empty() => Ok(Some(body.clone())),
            _ => Ok(None),
        }
    }
}

/// Fleet-completion notification boundary.
pub trait Notifier: Send + Sync {
    /// Emit one notification.
    fn notify(&self, title: &str, message: &str);
}

/// Notifier that forwards to the structured log.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        tracing::info!(title, message, "notification");
    }
}

/// Parse a channel type from its lowercase config name.
pub fn parse_channel_type(name: &str) -> Result<ChannelType> {
    let lower = name.to_lowercase();
    ChannelType::ALL
        .iter()
        .find(|t| t.display_name().to_lowercase().replace(' ', "") == lower)
        .copied()
        .ok_or_else(|| RelayError::InvalidArgument {
            message: format!("unknown channel type: {name}"),
        })
}
