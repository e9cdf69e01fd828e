//! WebSocket transport layer.
//!
//! This module handles the socket to the agent and the two timers that keep
//! it alive: the keep-alive monitor and the reconnect backoff.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Bridge (Rust)  │                              │  Agent          │
//! │                 │         WebSocket            │                 │
//! │  Transport      │─────────────────────────────►│  WebSocket      │
//! │  + Liveness     │      ws://host:PORT          │  Server         │
//! │  + Reconnect    │                              │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `Transport::open` - Connect to the agent endpoint
//! 2. `LivenessMonitor::start` - Begin keep-alive ticks
//! 3. `Transport::next_inbound` - Receive frames until the socket ends
//! 4. `ReconnectPolicy::on_close` - Compute backoff, arm the `ScopedTimer`
//! 5. Timer fires - back to step 1
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | Client socket wrapper |
//! | `liveness` | Keep-alive monitor |
//! | `reconnect` | Backoff policy and scoped retry timer |

// ============================================================================
// Submodules
// ============================================================================

/// Client socket wrapper.
pub mod connection;

/// Keep-alive monitor.
pub mod liveness;

/// Backoff policy and scoped retry timer.
pub mod reconnect;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Inbound, Transport, WsStream};
pub use liveness::LivenessMonitor;
pub use reconnect::{ReconnectDecision, ReconnectPhase, ReconnectPolicy, ScopedTimer};
