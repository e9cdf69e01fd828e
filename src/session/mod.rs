//! Agent session.
//!
//! Composes the transport, liveness monitor, reconnect policy, codec, router
//! and action correlation behind one [`AgentSession`] handle.
//!
//! # Control flow
//!
//! ```text
//! connect() ─► open ─► startup frame, liveness started, policy reset
//! inbound text ─► decode ─► route ─► action ─► page targets
//! page result ─► correlation ─► action/result frame
//! close/error ─► liveness stopped ─► backoff ─► connect again
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Pending actions and delivery to page targets.
pub mod correlation;

/// The session event loop.
mod driver;

/// Public session handle.
pub mod facade;

/// Inbound classification and outbound framing.
pub mod router;

/// Session state and events.
pub mod state;

// ============================================================================
// Re-exports
// ============================================================================

pub use correlation::{ActionCorrelation, DeliveryOutcome, DeliveryTicket, PendingAction};
pub use driver::FrameHandler;
pub use facade::AgentSession;
pub use router::{CommandRouter, InboundCommand};
pub use state::{ConnectionState, SessionEvent, SessionState};
