//! Agent protocol message types.
//!
//! This module defines the message format exchanged with the agent and the
//! local message types collaborators raise.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Frame` | Both | One complete wire message |
//! | `ActionRequest` | Agent → Bridge | Action to perform on the page |
//! | `ActionResult` | Bridge → Agent | Outcome of an action |
//! | `LocalMessage` | Collaborator → Bridge | Outbound event to wrap into a frame |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Command names, local messages and payloads |
//! | `frame` | Frame type and text codec |
//! | `request` | Action request, result and schema types |

// ============================================================================
// Submodules
// ============================================================================

/// Command names and outbound local messages.
pub mod command;

/// Frame type and text codec.
pub mod frame;

/// Action request and result types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::{ContextPayload, ForceAction, LocalMessage};
pub use frame::{Frame, decode, encode};
pub use request::{ActionName, ActionRequest, ActionResult, ActionSchema};
