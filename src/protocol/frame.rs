//! Wire frame and text codec.
//!
//! Every socket message carries exactly one complete [`Frame`]. There is no
//! multi-message framing, so each message is decoded on its own.
//!
//! # Format
//!
//! ```json
//! {
//!   "command": "action/result",
//!   "game": "Duolingo",
//!   "data": { ... }
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};

// ============================================================================
// Frame
// ============================================================================

/// One protocol message: a command name plus an optional payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    /// Command name, e.g. `startup` or `action/result`.
    pub command: String,

    /// Game identifier. Filled with the configured name on send when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub game: Option<String>,

    /// Command payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl Frame {
    /// Creates a frame with no payload.
    #[inline]
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            game: None,
            data: None,
        }
    }

    /// Creates a frame with a payload.
    #[inline]
    #[must_use]
    pub fn with_data(command: impl Into<String>, data: Value) -> Self {
        Self {
            command: command.into(),
            game: None,
            data: Some(data),
        }
    }

    /// Sets the game identifier.
    #[inline]
    #[must_use]
    pub fn game(mut self, game: impl Into<String>) -> Self {
        self.game = Some(game.into());
        self
    }

    /// Fills `game` with `default` when the caller left it out.
    pub fn fill_game(&mut self, default: &str) {
        if self.game.as_deref().is_none_or(str::is_empty) {
            self.game = Some(default.to_string());
        }
    }

    /// Returns a string field from the payload.
    #[inline]
    #[must_use]
    pub fn data_str(&self, key: &str) -> Option<&str> {
        self.data.as_ref()?.get(key)?.as_str()
    }
}

// ============================================================================
// Codec
// ============================================================================

/// Serializes a frame into one text message.
///
/// # Errors
///
/// - [`Error::InvalidFrame`] if the command is empty
/// - [`Error::Json`] if the payload cannot be serialized
pub fn encode(frame: &Frame) -> Result<String> {
    if frame.command.trim().is_empty() {
        return Err(Error::invalid_frame("frame has no command"));
    }
    Ok(serde_json::to_string(frame)?)
}

/// Parses one text message into a frame.
///
/// # Errors
///
/// Returns [`Error::Decode`] if the text is not a JSON frame.
pub fn decode(text: &str) -> Result<Frame> {
    serde_json::from_str(text).map_err(Error::Decode)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_encode_omits_absent_fields() {
        let text = encode(&Frame::new("ping").game("Duolingo")).expect("encode");
        assert_eq!(text, r#"{"command":"ping","game":"Duolingo"}"#);
    }

    #[test]
    fn test_encode_rejects_empty_command() {
        let err = encode(&Frame::new("")).unwrap_err();
        assert!(matches!(err, Error::InvalidFrame { .. }));

        let err = encode(&Frame::new("   ")).unwrap_err();
        assert!(matches!(err, Error::InvalidFrame { .. }));
    }

    #[test]
    fn test_decode_inbound_action() {
        let frame = decode(
            r#"{"command":"action","data":{"id":"42","name":"submit_answer","parameters":{"answer":"hola"}}}"#,
        )
        .expect("decode");

        assert_eq!(frame.command, "action");
        assert_eq!(frame.game, None);
        assert_eq!(frame.data_str("id"), Some("42"));
    }

    #[test]
    fn test_decode_malformed() {
        assert!(matches!(decode("{not json"), Err(Error::Decode(_))));
        assert!(matches!(decode(r#"{"data":{}}"#), Err(Error::Decode(_))));
    }

    #[test]
    fn test_fill_game() {
        let mut frame = Frame::new("context");
        frame.fill_game("Duolingo");
        assert_eq!(frame.game.as_deref(), Some("Duolingo"));

        let mut frame = Frame::new("context").game("Other");
        frame.fill_game("Duolingo");
        assert_eq!(frame.game.as_deref(), Some("Other"));

        let mut frame = Frame::new("context").game("");
        frame.fill_game("Duolingo");
        assert_eq!(frame.game.as_deref(), Some("Duolingo"));
    }

    fn payload() -> impl Strategy<Value = Option<Value>> {
        prop_oneof![
            Just(None),
            any::<i64>().prop_map(|n| Some(json!({ "n": n }))),
            "[a-z ]{0,16}".prop_map(|s| Some(json!({ "message": s, "silent": false }))),
        ]
    }

    proptest! {
        #[test]
        fn prop_round_trip(
            command in "[a-z]{1,8}(/[a-z]{1,8})?",
            game in proptest::option::of("[A-Za-z]{1,12}"),
            data in payload(),
        ) {
            let frame = Frame { command, game, data };
            let text = encode(&frame).expect("encode");
            let decoded = decode(&text).expect("decode");
            prop_assert_eq!(&decoded, &frame);
            prop_assert_eq!(encode(&decoded).expect("re-encode"), text);
        }
    }
}
