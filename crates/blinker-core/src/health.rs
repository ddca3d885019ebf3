// ── Health tracking ──
//
// Counters and a coarse status derived from device outcomes. State lives
// in a `watch` channel so the control surface can either poll a snapshot
// or subscribe to changes.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display as StrumDisplay, EnumString};
use tokio::sync::watch;
use tracing::debug;

/// Coarse health of the device link.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum HealthStatus {
    /// Nothing has happened yet.
    #[default]
    Initializing,
    Healthy,
    /// At least one failure since the last success.
    Degraded,
    /// `max_failed_attempts` consecutive failures.
    Critical,
}

/// Point-in-time copy of the health counters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub status: HealthStatus,
    pub last_success: Option<DateTime<Utc>>,
    pub consecutive_failures: u32,
    pub button_press_count: u64,
    pub last_error: Option<String>,
}

/// Concurrent-safe health recorder shared by every component.
#[derive(Debug)]
pub struct HealthTracker {
    state: watch::Sender<HealthSnapshot>,
    max_failed_attempts: u32,
}

impl HealthTracker {
    pub fn new(max_failed_attempts: u32) -> Self {
        let (state, _) = watch::channel(HealthSnapshot::default());
        Self {
            state,
            max_failed_attempts: max_failed_attempts.max(1),
        }
    }

    /// A device interaction succeeded: clears the failure streak.
    pub fn record_success(&self) {
        self.state.send_modify(|s| {
            s.status = HealthStatus::Healthy;
            s.consecutive_failures = 0;
            s.last_error = None;
            s.last_success = Some(Utc::now());
        });
    }

    /// A device interaction failed.
    pub fn record_failure(&self, error: impl Display) {
        let threshold = self.max_failed_attempts;
        let message = error.to_string();
        self.state.send_modify(|s| {
            s.consecutive_failures = s.consecutive_failures.saturating_add(1);
            s.status = if s.consecutive_failures >= threshold {
                HealthStatus::Critical
            } else {
                HealthStatus::Degraded
            };
            debug!(
                failures = s.consecutive_failures,
                status = %s.status,
                "recorded device failure"
            );
            s.last_error = Some(message);
        });
    }

    pub fn record_button_press(&self) {
        self.state
            .send_modify(|s| s.button_press_count = s.button_press_count.saturating_add(1));
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        self.state.borrow().clone()
    }

    /// Subscribe to health changes.
    pub fn subscribe(&self) -> watch::Receiver<HealthSnapshot> {
        self.state.subscribe()
    }
}
