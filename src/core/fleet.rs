//! Fleet sweep orchestrator and unattended scheduler.
//!
//! One sweep probes every channel in the registry, applies the ban policy
//! and the latency threshold, and flips channel status where warranted.
//! At most one sweep runs at a time; a second request is rejected, never
//! queued.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::core::channel::{Channel, ChannelStatus, ChannelStore, Notifier};
use crate::core::policy::BanPolicy;
use crate::core::probe::{self, MonitorDeps, TestOutcome};
use crate::error::{RelayError, Result};

// =============================================================================
// Sweep Guard
// =============================================================================

/// Releases the single-flight flag when the sweep ends, panic or not.
struct SweepGuard {
    running: Arc<AtomicBool>,
}

impl Drop for SweepGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::SeqCst);
    }
}

// =============================================================================
// Sweep Summary
// =============================================================================

/// Counters from one completed sweep.
#[derive(Debug, Default, Clone, Copy)]
pub struct SweepSummary {
    pub tested: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub disabled: usize,
    pub enabled: usize,
}

impl SweepSummary {
    fn describe(&self, elapsed: Duration) -> String {
        format!(
            "tested {} channels in {}s: {} succeeded, {} failed, {} skipped, {} disabled, {} enabled",
            self.tested,
            elapsed.as_secs(),
            self.succeeded,
            self.failed,
            self.skipped,
            self.disabled,
            self.enabled
        )
    }
}

// =============================================================================
// Fleet Tester
// =============================================================================

/// Fleet sweep orchestrator.
///
/// Holds the single-flight flag and the once-only scheduler flag; shared
/// behind an [`Arc`] between the daemon surface and the scheduler.
pub struct FleetTester {
    deps: MonitorDeps,
    running: Arc<AtomicBool>,
    scheduler_started: AtomicBool,
}

impl FleetTester {
    #[must_use]
    pub fn new(deps: MonitorDeps) -> Arc<Self> {
        Arc::new(Self {
            deps,
            running: Arc::new(AtomicBool::new(false)),
            scheduler_started: AtomicBool::new(false),
        })
    }

    /// Whether a sweep is currently in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Start a detached background sweep.
    ///
    /// Returns immediately once the sweep is claimed; a sweep already in
    /// flight is rejected with [`RelayError::SweepAlreadyRunning`].
    pub fn run_all(self: &Arc<Self>, notify: bool) -> Result<()> {
        let guard = self.claim()?;
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let _guard = guard;
            this.sweep(notify).await;
        });
        Ok(())
    }

    /// Run one sweep inline, holding the single-flight flag for its
    /// duration.
    pub async fn run_blocking(&self, notify: bool) -> Result<SweepSummary> {
        let _guard = self.claim()?;
        Ok(self.sweep(notify).await)
    }

    fn claim(&self) -> Result<SweepGuard> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return Err(RelayError::SweepAlreadyRunning);
        }
        Ok(SweepGuard {
            running: Arc::clone(&self.running),
        })
    }

    async fn sweep(&self, notify: bool) -> SweepSummary {
        let started = Instant::now();
        // Snapshot once; channels added mid-sweep wait for the next one.
        let channels = self.deps.channels.list();
        tracing::info!(channels = channels.len(), "fleet sweep started");

        let mut summary = SweepSummary::default();
        let interval = self.deps.settings.request_interval();
        for channel in &channels {
            let probe_started = Instant::now();
            let outcome = probe::probe_channel(&self.deps, channel, None, "").await;
            #[allow(clippy::cast_possible_truncation)]
            let millis = probe_started.elapsed().as_millis() as i64;

            if outcome.is_skipped() {
                summary.skipped += 1;
                continue;
            }
            summary.tested += 1;

            self.settle(channel, &outcome, millis, &mut summary);
            self.deps.channels.record_response_time(channel.id, millis);
            tokio::time::sleep(interval).await;
        }

        let elapsed = started.elapsed();
        tracing::info!(
            tested = summary.tested,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            disabled = summary.disabled,
            enabled = summary.enabled,
            elapsed_secs = elapsed.as_secs(),
            "fleet sweep finished"
        );
        if notify {
            self.deps
                .notifier
                .notify("channel test completed", &summary.describe(elapsed));
        }
        summary
    }

    /// Apply ban policy and latency threshold to one probe outcome.
    fn settle(
        &self,
        channel: &Channel,
        outcome: &TestOutcome,
        millis: i64,
        summary: &mut SweepSummary,
    ) {
        let mut should_ban = false;
        let mut reason = String::new();

        match outcome {
            TestOutcome::Failed(failure) => {
                summary.failed += 1;
                if self
                    .deps
                    .policy
                    .should_disable(channel.channel_type, failure)
                {
                    should_ban = true;
                    reason = failure.to_string();
                }
            }
            TestOutcome::Succeeded { .. } => summary.succeeded += 1,
            TestOutcome::Skipped => return,
        }

        // A ban-worthy error already decides the outcome; the latency
        // threshold only applies beyond that, and only when latency-based
        // disabling is switched on.
        if !should_ban
            && self.deps.settings.auto_disable_enabled()
            && millis > self.deps.settings.disable_threshold_ms()
        {
            should_ban = true;
            reason = format!("response time {millis}ms exceeds the disable threshold");
        }

        let was_enabled = channel.status.is_enabled();
        if was_enabled && should_ban && channel.auto_ban {
            self.deps
                .channels
                .set_status(channel.id, ChannelStatus::AutoDisabled, &reason);
            summary.disabled += 1;
        } else if !was_enabled && self.deps.policy.should_enable(channel.status, should_ban) {
            self.deps
                .channels
                .set_status(channel.id, ChannelStatus::Enabled, "probe recovered");
            summary.enabled += 1;
        }
    }

    /// Start the unattended scheduler; idempotent, only the first call
    /// spawns the loop.
    pub fn spawn_auto_test_loop(self: &Arc<Self>) {
        if self.scheduler_started.swap(true, Ordering::SeqCst) {
            tracing::warn!("auto-test scheduler already started");
            return;
        }
        let this = Arc::clone(self);
        tokio::spawn(async move {
            tracing::info!("auto-test scheduler started");
            loop {
                if !this.deps.settings.auto_test_enabled() {
                    tokio::time::sleep(Duration::from_secs(60)).await;
                    continue;
                }
                tokio::time::sleep(this.deps.settings.auto_test_interval()).await;
                // The toggle may have flipped during the sleep.
                if !this.deps.settings.auto_test_enabled() {
                    continue;
                }
                match this.run_blocking(false).await {
                    Ok(summary) => tracing::info!(
                        tested = summary.tested,
                        failed = summary.failed,
                        "scheduled sweep finished"
                    ),
                    Err(err) => tracing::debug!(error = %err, "scheduled sweep skipped"),
                }
            }
        });
    }
}
