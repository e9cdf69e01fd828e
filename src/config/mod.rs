//! Session configuration.
//!
//! Use [`SessionConfig::builder()`] to create a validated configuration.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `builder` | [`SessionConfig`] and its builder |
//! | `options` | Reconnect and liveness timing options |

// ============================================================================
// Submodules
// ============================================================================

/// Session configuration and builder.
pub mod builder;

/// Reconnect and liveness timing options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{DEFAULT_ENDPOINT, DEFAULT_GAME, SessionConfig, SessionConfigBuilder};
pub use options::{LivenessConfig, ReconnectConfig};
