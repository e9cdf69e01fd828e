//! Command router.
//!
//! Classifies inbound frames into typed commands and wraps outbound local
//! messages into frames. The router is pure: it never touches the socket,
//! so every routing decision can be tested without a connection.
//!
//! # Inbound
//!
//! | Command | Result |
//! |---------|--------|
//! | `action` | [`InboundCommand::Action`] (needs `data.id`) |
//! | `status` | [`InboundCommand::Status`] |
//! | other | [`InboundCommand::Unrecognized`] |

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};

use crate::error::Result;
use crate::protocol::command::{ACTION, PING, STARTUP, STATUS};
use crate::protocol::{ActionRequest, Frame, LocalMessage};

// ============================================================================
// InboundCommand
// ============================================================================

/// Typed form of an inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundCommand {
    /// The agent wants an action performed.
    Action(ActionRequest),
    /// The agent reported its status; log only.
    Status(Option<Value>),
    /// Any other command; log only.
    Unrecognized(String),
}

// ============================================================================
// CommandRouter
// ============================================================================

/// Maps frames to commands and local messages to frames.
#[derive(Debug, Clone)]
pub struct CommandRouter {
    game: String,
}

impl CommandRouter {
    /// Creates a router that stamps outbound frames with `game`.
    #[inline]
    #[must_use]
    pub fn new(game: impl Into<String>) -> Self {
        Self { game: game.into() }
    }

    /// Returns the game identifier.
    #[inline]
    #[must_use]
    pub fn game(&self) -> &str {
        &self.game
    }

    /// Classifies an inbound frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Dispatch`](crate::Error::Dispatch) if an `action` frame has
    ///   no id
    /// - [`Error::UnknownAction`](crate::Error::UnknownAction) if an
    ///   `action` frame names an action that is not offered
    pub fn classify(&self, frame: &Frame) -> Result<InboundCommand> {
        match frame.command.as_str() {
            ACTION => Ok(InboundCommand::Action(ActionRequest::from_data(
                frame.data.as_ref(),
            )?)),
            STATUS => Ok(InboundCommand::Status(frame.data.clone())),
            other => Ok(InboundCommand::Unrecognized(other.to_string())),
        }
    }

    /// Wraps a local message into its outbound frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`](crate::Error::Json) if the payload cannot be
    /// serialized.
    pub fn outbound_frame(&self, message: LocalMessage) -> Result<Frame> {
        let command = message.command();

        let (game, data) = match message {
            LocalMessage::Context { game, payload } => (game, serde_json::to_value(payload)?),
            LocalMessage::ActionResult(result) => (None, serde_json::to_value(result)?),
            LocalMessage::RegisterActions { actions } => (None, json!({ "actions": actions })),
            LocalMessage::ForceAction(force) => (None, serde_json::to_value(force)?),
        };

        let mut frame = Frame::with_data(command, data);
        frame.game = game;
        frame.fill_game(&self.game);
        Ok(frame)
    }

    /// Frame sent once after every open.
    #[inline]
    #[must_use]
    pub fn startup_frame(&self) -> Frame {
        Frame::new(STARTUP).game(self.game.as_str())
    }

    /// Zero-payload keep-alive frame.
    #[inline]
    #[must_use]
    pub fn ping_frame(&self) -> Frame {
        Frame::new(PING).game(self.game.as_str())
    }
}

// ============================================================================
// Tests
// ============================================================================
