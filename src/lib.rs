//! Lingo Bridge - WebSocket bridge between a language-learning page and an
//! AI agent.
//!
//! The bridge keeps one long-lived WebSocket session to the agent, describes
//! the exercise on screen, and carries the agent's actions to the page and
//! their results back.
//!
//! # Architecture
//!
//! - **Agent**: WebSocket server that reads context and issues actions
//! - **Bridge (Rust)**: One [`AgentSession`] owning the socket and its timers
//! - **Page adapters**: Implement the [`page`] traits to read and drive the page
//!
//! Key design principles:
//!
//! - One event loop task owns all session state
//! - Reconnects with capped exponential backoff, forever
//! - Idle connections are kept alive with `ping` frames
//! - Every action request is answered by exactly one result
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use lingo_bridge::page::PageTargets;
//! use lingo_bridge::{ActionRequest, ActionSchema, AgentSession, Result, SessionConfig, TargetId};
//!
//! struct Tabs;
//!
//! #[async_trait]
//! impl PageTargets for Tabs {
//!     async fn available_targets(&self) -> Vec<TargetId> {
//!         vec![TargetId::new(1)]
//!     }
//!
//!     async fn forward_action(&self, _target: TargetId, request: &ActionRequest) -> Result<()> {
//!         println!("agent wants {}", request.name);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let config = SessionConfig::builder()
//!         .endpoint("ws://localhost:8000")
//!         .game("Duolingo")
//!         .build()?;
//!
//!     let session = AgentSession::new(config, Arc::new(Tabs));
//!     session.connect();
//!     session.register_actions(ActionSchema::defaults()).await;
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Session configuration and builder |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`monitor`] | Status and log feed for a monitoring UI |
//! | [`page`] | Page adapter traits and action execution |
//! | [`protocol`] | Wire frames and message types |
//! | [`session`] | The agent session and its event loop |
//! | [`transport`] | Socket, keep-alive and reconnect backoff |

// ============================================================================
// Modules
// ============================================================================

/// Session configuration.
///
/// Use [`SessionConfig::builder()`] to create a validated configuration.
pub mod config;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers.
pub mod identifiers;

/// Monitoring UI feed.
pub mod monitor;

/// Page adapter traits, context types and the action executor.
pub mod page;

/// Agent protocol message types.
pub mod protocol;

/// The agent session.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Configuration
pub use config::{LivenessConfig, ReconnectConfig, SessionConfig, SessionConfigBuilder};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ActionId, ConnectionEpoch, TargetId};

// Page types
pub use page::{ActionExecutor, ContextType, PageContext};

// Protocol types
pub use protocol::{
    ActionName, ActionRequest, ActionResult, ActionSchema, ForceAction, Frame, LocalMessage,
};

// Session types
pub use session::{AgentSession, ConnectionState, SessionEvent, SessionState};
