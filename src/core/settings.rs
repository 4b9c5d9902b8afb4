//! Mutable monitor settings.
//!
//! The unattended scheduler and the fleet orchestrator poll these values;
//! operators mutate them at runtime through the daemon's admin surface (or
//! tests, directly). All reads take a point-in-time snapshot.

use std::sync::RwLock;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Effective latency threshold used when the configured one is the
/// "never trigger" sentinel (0).
const UNREACHABLE_THRESHOLD_MS: i64 = i64::MAX / 2;

/// Monitor configuration values.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Whether the unattended scheduler runs sweeps at all.
    pub auto_test_enabled: bool,
    /// Minutes between unattended sweeps.
    pub auto_test_minutes: f64,
    /// Whether slow channels may be disabled on latency alone.
    pub auto_disable_enabled: bool,
    /// Latency ban threshold in seconds; 0 means never trigger on latency.
    pub disable_threshold_seconds: f64,
    /// Pause between per-channel probes within one sweep.
    pub request_interval_ms: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            auto_test_enabled: false,
            auto_test_minutes: 10.0,
            auto_disable_enabled: false,
            disable_threshold_seconds: 0.0,
            request_interval_ms: 100,
        }
    }
}

/// Shared, runtime-mutable monitor settings.
#[derive(Debug, Default)]
pub struct MonitorSettings {
    inner: RwLock<MonitorConfig>,
}

impl MonitorSettings {
    /// Create settings from an initial configuration.
    #[must_use]
    pub fn new(config: MonitorConfig) -> Self {
        Self {
            inner: RwLock::new(config),
        }
    }

    /// Point-in-time snapshot of the configuration.
    #[must_use]
    pub fn snapshot(&self) -> MonitorConfig {
        *self.inner.read().expect("settings lock poisoned")
    }

    /// Replace the configuration wholesale.
    pub fn update(&self, config: MonitorConfig) {
        *self.inner.write().expect("settings lock poisoned") = config;
    }

    /// Toggle the unattended scheduler.
    pub fn set_auto_test_enabled(&self, enabled: bool) {
        self.inner
            .write()
            .expect("settings lock poisoned")
            .auto_test_enabled = enabled;
    }

    /// Whether the unattended scheduler should run sweeps.
    #[must_use]
    pub fn auto_test_enabled(&self) -> bool {
        self.snapshot().auto_test_enabled
    }

    /// Interval between unattended sweeps.
    #[must_use]
    pub fn auto_test_interval(&self) -> Duration {
        let minutes = self.snapshot().auto_test_minutes.max(0.0);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        Duration::from_secs((minutes.round() as u64).max(1) * 60)
    }

    /// Whether latency alone may disable a channel.
    #[must_use]
    pub fn auto_disable_enabled(&self) -> bool {
        self.snapshot().auto_disable_enabled
    }

    /// Effective latency ban threshold in milliseconds.
    ///
    /// A configured threshold of 0 means "never trigger on latency" and is
    /// mapped to an unreachable value, not to "always trigger".
    #[must_use]
    pub fn disable_threshold_ms(&self) -> i64 {
        #[allow(clippy::cast_possible_truncation)]
        let threshold = (self.snapshot().disable_threshold_seconds * 1000.0) as i64;
        if threshold == 0 {
            UNREACHABLE_THRESHOLD_MS
        } else {
            threshold
        }
    }

    /// Pause between per-channel probes within one sweep.
    #[must_use]
    pub fn request_interval(&self) -> Duration {
        Duration::from_millis(self.snapshot().request_interval_ms)
    }
}
