//! Error types for the agent bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! Fallible setup and codec operations return [`Result<T>`] which uses
//! [`Error`]. Runtime failures inside the session loop are contained there
//! and only ever logged or reported as a failed action result.
//!
//! ```ignore
//! use lingo_bridge::{Result, SessionConfig};
//!
//! fn config() -> Result<SessionConfig> {
//!     SessionConfig::builder().endpoint("ws://localhost:8000").build()
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Connection | [`Error::ConnectionTimeout`], [`Error::NotConnected`] |
//! | Protocol | [`Error::InvalidFrame`], [`Error::Decode`] |
//! | Dispatch | [`Error::Dispatch`], [`Error::UnknownAction`] |
//! | Delivery | [`Error::ActionDelivery`], [`Error::TargetRejected`] |
//! | External | [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::{ActionId, TargetId};

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when the session configuration is invalid.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Connecting to the agent endpoint took too long.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// A write was attempted while the session is not connected.
    #[error("Not connected to the agent")]
    NotConnected,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Frame rejected before it reached the socket.
    #[error("Invalid frame: {message}")]
    InvalidFrame {
        /// Why the frame was rejected.
        message: String,
    },

    /// Inbound text could not be decoded as a frame.
    #[error("Failed to decode frame: {0}")]
    Decode(#[source] serde_json::Error),

    // ========================================================================
    // Dispatch Errors
    // ========================================================================
    /// Inbound frame could not be routed.
    #[error("Dispatch error: {message}")]
    Dispatch {
        /// Description of the routing failure.
        message: String,
    },

    /// Agent asked for an action this bridge does not offer.
    #[error("Unknown action: {name}")]
    UnknownAction {
        /// The unrecognized action name.
        name: String,
    },

    // ========================================================================
    // Delivery Errors
    // ========================================================================
    /// An action request could not be handed to any page target.
    #[error("Action {action_id} could not be delivered: {reason}")]
    ActionDelivery {
        /// Action that failed to reach the page.
        action_id: ActionId,
        /// Human-readable reason.
        reason: String,
    },

    /// A single page target refused a forwarded action.
    #[error("Target {target_id} rejected the action: {message}")]
    TargetRejected {
        /// The target that refused.
        target_id: TargetId,
        /// Reason reported by the page adapter.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Endpoint URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates an invalid frame error.
    #[inline]
    pub fn invalid_frame(message: impl Into<String>) -> Self {
        Self::InvalidFrame {
            message: message.into(),
        }
    }

    /// Creates a dispatch error.
    #[inline]
    pub fn dispatch(message: impl Into<String>) -> Self {
        Self::Dispatch {
            message: message.into(),
        }
    }

    /// Creates an unknown action error.
    #[inline]
    pub fn unknown_action(name: impl Into<String>) -> Self {
        Self::UnknownAction { name: name.into() }
    }

    /// Creates an action delivery error.
    #[inline]
    pub fn action_delivery(action_id: ActionId, reason: impl Into<String>) -> Self {
        Self::ActionDelivery {
            action_id,
            reason: reason.into(),
        }
    }

    /// Creates a target rejected error.
    #[inline]
    pub fn target_rejected(target_id: TargetId, message: impl Into<String>) -> Self {
        Self::TargetRejected {
            target_id,
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::NotConnected | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this is a dispatch error.
    #[inline]
    #[must_use]
    pub fn is_dispatch_error(&self) -> bool {
        matches!(self, Self::Dispatch { .. } | Self::UnknownAction { .. })
    }
}

// ============================================================================
// Tests
// ============================================================================
