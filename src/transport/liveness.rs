//! Keep-alive monitor.
//!
//! Intermediaries close WebSocket connections that stay silent for too long.
//! While the session is connected the monitor ticks on a fixed period; when
//! nothing has arrived for longer than the idle threshold the session sends a
//! zero-payload `ping` frame.
//!
//! The monitor owns a single [`Interval`]. Starting it again replaces the
//! previous one, so repeated connect/close cycles never stack timers.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;

use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::trace;

use crate::config::LivenessConfig;

// ============================================================================
// LivenessMonitor
// ============================================================================

/// Periodic silence detector bound to one session.
#[derive(Debug)]
pub struct LivenessMonitor {
    config: LivenessConfig,
    interval: Option<Interval>,
}

impl LivenessMonitor {
    /// Creates a stopped monitor.
    #[must_use]
    pub fn new(config: LivenessConfig) -> Self {
        Self {
            config,
            interval: None,
        }
    }

    /// Starts a fresh interval, dropping any running one.
    pub fn start(&mut self) {
        let period = self.config.period;
        let mut interval = interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        if self.interval.replace(interval).is_some() {
            trace!("Liveness interval replaced");
        }
        trace!(period_ms = period.as_millis() as u64, "Liveness monitor started");
    }

    /// Stops the interval. Idempotent.
    pub fn stop(&mut self) {
        if self.interval.take().is_some() {
            trace!("Liveness monitor stopped");
        }
    }

    /// Completes on the next tick; never completes while stopped.
    ///
    /// Cancel safe.
    pub async fn tick(&mut self) {
        match self.interval.as_mut() {
            Some(interval) => {
                interval.tick().await;
            }
            None => pending().await,
        }
    }

    /// Returns `true` if the silence since `last_message_at` warrants a ping.
    #[must_use]
    pub fn should_ping(&self, last_message_at: Option<Instant>, now: Instant) -> bool {
        match last_message_at {
            Some(last) => now.saturating_duration_since(last) >= self.config.idle_threshold,
            None => true,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
