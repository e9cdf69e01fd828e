//! Reconnection policy and scoped retry timer.
//!
//! [`ReconnectPolicy`] is a pure state machine: it counts failures, computes
//! the backoff delay and decides when the one-shot "connection lost"
//! escalation fires. [`ScopedTimer`] owns the single pending retry timer.
//! Arming it replaces (and drops) any previous timer, so two reconnect
//! timers can never coexist.
//!
//! # Phases
//!
//! ```text
//! Idle ──close──► Scheduled ──timer──► Connecting ──open──► Connected
//!                     ▲                    │                    │
//!                     └──────close─────────┴────────close───────┘
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::pin::Pin;
use std::time::Duration;

use tokio::time::{Sleep, sleep};

use crate::config::ReconnectConfig;

// ============================================================================
// ReconnectPhase
// ============================================================================

/// Where the policy is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectPhase {
    /// Nothing scheduled; no connection.
    Idle,
    /// A retry timer is pending.
    Scheduled,
    /// A connect attempt is in flight.
    Connecting,
    /// The socket is open.
    Connected,
}

// ============================================================================
// ReconnectDecision
// ============================================================================

/// What to do after a close.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectDecision {
    /// Failure count including this one.
    pub attempt: u32,
    /// Delay before the next connect.
    pub delay: Duration,
    /// `true` exactly once per outage, when `attempt` first reaches the
    /// configured maximum.
    pub escalate: bool,
}

// ============================================================================
// ReconnectPolicy
// ============================================================================

/// Backoff and retry-budget state machine.
#[derive(Debug, Clone)]
pub struct ReconnectPolicy {
    config: ReconnectConfig,
    attempts: u32,
    phase: ReconnectPhase,
    connection_lost: bool,
}

impl ReconnectPolicy {
    /// Creates an idle policy.
    #[must_use]
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
            phase: ReconnectPhase::Idle,
            connection_lost: false,
        }
    }

    /// Returns the failure count since the last successful open.
    #[inline]
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Returns the current phase.
    #[inline]
    #[must_use]
    pub const fn phase(&self) -> ReconnectPhase {
        self.phase
    }

    /// Returns `true` once the lost escalation has fired for this outage.
    #[inline]
    #[must_use]
    pub const fn is_connection_lost(&self) -> bool {
        self.connection_lost
    }

    /// Records a close (or failed open) and schedules the next attempt.
    ///
    /// Attempts keep growing past the maximum; only the escalation is
    /// one-shot.
    pub fn on_close(&mut self) -> ReconnectDecision {
        self.attempts = self.attempts.saturating_add(1);
        self.phase = ReconnectPhase::Scheduled;

        let escalate = !self.connection_lost && self.attempts >= self.config.max_attempts;
        if escalate {
            self.connection_lost = true;
        }

        ReconnectDecision {
            attempt: self.attempts,
            delay: self.config.delay_for(self.attempts),
            escalate,
        }
    }

    /// Records that a connect attempt started.
    #[inline]
    pub fn on_connecting(&mut self) {
        self.phase = ReconnectPhase::Connecting;
    }

    /// Records a successful open. Returns `true` if this ended an outage.
    pub fn on_open(&mut self) -> bool {
        let restored = self.attempts > 0;
        self.attempts = 0;
        self.connection_lost = false;
        self.phase = ReconnectPhase::Connected;
        restored
    }

    /// Returns to idle after an explicit close.
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.connection_lost = false;
        self.phase = ReconnectPhase::Idle;
    }
}

impl ReconnectConfig {
    /// Backoff delay for the given failure count.
    ///
    /// `min(max_interval, base_interval * growth_factor^min(attempt - 1, cap_exponent))`
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(self.cap_exponent);
        let factor = self
            .growth_factor
            .powi(i32::try_from(exponent).unwrap_or(i32::MAX));
        let scaled = self.base_interval.as_secs_f64() * factor;

        if !scaled.is_finite() || scaled >= self.max_interval.as_secs_f64() {
            return self.max_interval;
        }
        Duration::from_secs_f64(scaled).min(self.max_interval)
    }
}

// ============================================================================
// ScopedTimer
// ============================================================================

/// Owner of at most one pending timer.
///
/// Dropping the timer or calling [`arm`](Self::arm) again cancels the
/// previous deadline.
#[derive(Debug, Default)]
pub struct ScopedTimer {
    sleep: Option<Pin<Box<Sleep>>>,
}

impl ScopedTimer {
    /// Creates an unarmed timer.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the timer, replacing any pending deadline.
    pub fn arm(&mut self, delay: Duration) {
        self.sleep = Some(Box::pin(sleep(delay)));
    }

    /// Cancels the pending deadline. Returns `true` if one was pending.
    pub fn cancel(&mut self) -> bool {
        self.sleep.take().is_some()
    }

    /// Returns `true` if a deadline is pending.
    #[inline]
    #[must_use]
    pub fn is_armed(&self) -> bool {
        self.sleep.is_some()
    }

    /// Completes when the armed deadline passes; never completes when unarmed.
    ///
    /// Cancel safe: a dropped call leaves the deadline armed.
    pub async fn fired(&mut self) {
        match self.sleep.as_mut() {
            Some(deadline) => {
                deadline.as_mut().await;
                self.sleep = None;
            }
            None => pending().await,
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
