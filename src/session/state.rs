//! Session state and lifecycle events.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::identifiers::ConnectionEpoch;

// ============================================================================
// ConnectionState
// ============================================================================

/// Connection lifecycle state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No socket and no retry scheduled.
    #[default]
    Disconnected,
    /// First connect attempt in flight.
    Connecting,
    /// Socket open.
    Connected,
    /// Waiting for, or running, a retry after a close.
    Reconnecting,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
        };
        f.write_str(name)
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Snapshot of the session, written only by the session event loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Current lifecycle state.
    pub connection_state: ConnectionState,
    /// Failures since the last successful open.
    pub reconnect_attempts: u32,
    /// When the last inbound message (or the open) happened.
    pub last_message_at: Option<Instant>,
    /// Set once the failure count reached the configured maximum.
    pub connection_lost: bool,
    /// Epoch of the current (or last) connection.
    pub epoch: ConnectionEpoch,
}

impl SessionState {
    /// Returns `true` while the socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection_state == ConnectionState::Connected
    }
}

// ============================================================================
// SessionEvent
// ============================================================================

/// Lifecycle notification broadcast by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Socket opened.
    Connected {
        /// `true` if this open ended a run of failures.
        restored: bool,
    },
    /// A previously open socket closed.
    Disconnected,
    /// A retry is scheduled.
    Reconnecting {
        /// Failure count.
        attempt: u32,
        /// Delay before the retry.
        delay: Duration,
    },
    /// The failure count reached the configured maximum. Fires once per
    /// outage; retries continue.
    ConnectionLost {
        /// Failure count.
        attempts: u32,
    },
    /// Transport error, for diagnostics only.
    Diagnostic {
        /// Error text.
        message: String,
    },
}

impl SessionEvent {
    /// Returns `true` for events a human should be told about: a restored
    /// connection and a lost connection.
    #[inline]
    #[must_use]
    pub fn is_escalation(&self) -> bool {
        matches!(
            self,
            Self::Connected { restored: true } | Self::ConnectionLost { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
