//! Command names and outbound local messages.
//!
//! Collaborators never build wire frames directly. They raise a
//! [`LocalMessage`] which the router wraps into a [`Frame`](super::Frame)
//! with the matching wire command.
//!
//! # Commands
//!
//! | Direction | Command | Source |
//! |-----------|---------|--------|
//! | Outbound | `startup` | session open |
//! | Outbound | `ping` | liveness monitor |
//! | Outbound | `context` | [`LocalMessage::Context`] |
//! | Outbound | `action/result` | [`LocalMessage::ActionResult`] |
//! | Outbound | `actions/register` | [`LocalMessage::RegisterActions`] |
//! | Outbound | `actions/force` | [`LocalMessage::ForceAction`] |
//! | Inbound | `action` | agent action request |
//! | Inbound | `status` | agent status report |

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use super::request::{ActionResult, ActionSchema};

// ============================================================================
// Command Names
// ============================================================================

/// Sent once after every successful open.
pub const STARTUP: &str = "startup";

/// Zero-payload keep-alive.
pub const PING: &str = "ping";

/// Page context update.
pub const CONTEXT: &str = "context";

/// Result of an agent action.
pub const ACTION_RESULT: &str = "action/result";

/// Announces the offered actions.
pub const ACTIONS_REGISTER: &str = "actions/register";

/// Asks the agent to pick one of the offered actions now.
pub const ACTIONS_FORCE: &str = "actions/force";

/// Inbound action request.
pub const ACTION: &str = "action";

/// Inbound status report.
pub const STATUS: &str = "status";

// ============================================================================
// LocalMessage
// ============================================================================

/// Outbound message raised by a collaborator.
///
/// These are local message types, not wire commands; see the table in the
/// module docs for the mapping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LocalMessage {
    /// Page context for the agent.
    Context {
        /// Game override; the configured name is used when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game: Option<String>,
        /// Context payload.
        #[serde(flatten)]
        payload: ContextPayload,
    },

    /// Result of an agent action.
    ActionResult(ActionResult),

    /// Announce offered actions.
    RegisterActions {
        /// Action descriptions.
        actions: Vec<ActionSchema>,
    },

    /// Force the agent to act.
    ForceAction(ForceAction),
}

impl LocalMessage {
    /// Creates a context message.
    #[inline]
    #[must_use]
    pub fn context(message: impl Into<String>, silent: bool) -> Self {
        Self::Context {
            game: None,
            payload: ContextPayload {
                message: message.into(),
                silent,
            },
        }
    }

    /// Returns the wire command this message is sent under.
    #[inline]
    #[must_use]
    pub const fn command(&self) -> &'static str {
        match self {
            Self::Context { .. } => CONTEXT,
            Self::ActionResult(_) => ACTION_RESULT,
            Self::RegisterActions { .. } => ACTIONS_REGISTER,
            Self::ForceAction(_) => ACTIONS_FORCE,
        }
    }
}

// ============================================================================
// Payloads
// ============================================================================

/// Data of a `context` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextPayload {
    /// Text describing the page state.
    pub message: String,

    /// When `true` the agent should not respond to this context.
    #[serde(default)]
    pub silent: bool,
}

/// Data of an `actions/force` frame.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForceAction {
    /// Optional description of the current state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,

    /// What the agent is being asked to do.
    pub query: String,

    /// When `true` the state and query are not remembered by the agent.
    #[serde(default)]
    pub ephemeral_context: bool,

    /// Actions the agent may choose from.
    pub action_names: Vec<String>,
}

impl ForceAction {
    /// Creates a force request offering `action_names`.
    #[must_use]
    pub fn new(
        query: impl Into<String>,
        action_names: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            state: None,
            query: query.into(),
            ephemeral_context: false,
            action_names: action_names.into_iter().map(Into::into).collect(),
        }
    }

    /// Attaches a state description.
    #[inline]
    #[must_use]
    pub fn with_state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    /// Marks the request as ephemeral.
    #[inline]
    #[must_use]
    pub fn ephemeral(mut self) -> Self {
        self.ephemeral_context = true;
        self
    }
}

// ============================================================================
// Tests
// ============================================================================
