//! Action request and result types.
//!
//! The agent issues an [`ActionRequest`] inside an `action` frame; the page
//! answers with an [`ActionResult`] carrying the same id, which travels back
//! inside an `action/result` frame.
//!
//! # Format
//!
//! Request (inbound `data`):
//! ```json
//! { "id": "42", "name": "submit_answer", "parameters": { "answer": "hola" } }
//! ```
//!
//! Result (outbound `data`):
//! ```json
//! { "id": "42", "success": true, "message": "Submitted answer \"hola\"" }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::error::{Error, Result};
use crate::identifiers::ActionId;

// ============================================================================
// ActionName
// ============================================================================

/// Actions the bridge offers to the agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionName {
    /// Answer the current exercise.
    SubmitAnswer,
    /// Press the page's continue/check button.
    ClickContinue,
}

impl ActionName {
    /// All offered actions.
    pub const ALL: [ActionName; 2] = [ActionName::SubmitAnswer, ActionName::ClickContinue];

    /// Returns the wire name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SubmitAnswer => "submit_answer",
            Self::ClickContinue => "click_continue",
        }
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionName {
    type Err = Error;

    fn from_str(name: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == name)
            .ok_or_else(|| Error::unknown_action(name))
    }
}

// ============================================================================
// ActionRequest
// ============================================================================

/// An agent-issued request to act on the page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionRequest {
    /// Opaque id echoed back in the result.
    pub id: ActionId,

    /// Requested action.
    pub name: ActionName,

    /// Action parameters.
    pub parameters: Value,
}

impl ActionRequest {
    /// Builds a request from the `data` of an inbound `action` frame.
    ///
    /// Parameters sent as a JSON-encoded string are parsed into structured
    /// form; a string that is not JSON is kept as-is.
    ///
    /// # Errors
    ///
    /// - [`Error::Dispatch`] if `data` is missing or has no string `id`
    /// - [`Error::UnknownAction`] if `name` is not an offered action
    pub fn from_data(data: Option<&Value>) -> Result<Self> {
        let data = data.ok_or_else(|| Error::dispatch("action frame has no data"))?;

        let id = data
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| Error::dispatch("action frame has no id"))?;

        let name = data
            .get("name")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .parse::<ActionName>()?;

        let parameters = match data.get("parameters").or_else(|| data.get("data")) {
            Some(Value::String(raw)) => {
                serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.clone()))
            }
            Some(value) => value.clone(),
            None => Value::Null,
        };

        Ok(Self {
            id: ActionId::from(id),
            name,
            parameters,
        })
    }

    /// Returns a string parameter.
    #[inline]
    #[must_use]
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).and_then(Value::as_str)
    }
}

// ============================================================================
// ActionResult
// ============================================================================

/// Outcome of an action, sent back to the agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResult {
    /// Id of the originating request.
    pub id: ActionId,

    /// Whether the action succeeded.
    pub success: bool,

    /// Human-readable detail.
    #[serde(default)]
    pub message: String,
}

impl ActionResult {
    /// Creates a successful result.
    #[inline]
    #[must_use]
    pub fn success(id: ActionId, message: impl Into<String>) -> Self {
        Self {
            id,
            success: true,
            message: message.into(),
        }
    }

    /// Creates a failed result.
    #[inline]
    #[must_use]
    pub fn failure(id: ActionId, message: impl Into<String>) -> Self {
        Self {
            id,
            success: false,
            message: message.into(),
        }
    }
}

// ============================================================================
// ActionSchema
// ============================================================================

/// Description of an offered action, sent in `actions/register`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSchema {
    /// Action name.
    pub name: String,

    /// What the action does, for the agent.
    pub description: String,

    /// JSON schema of the parameters.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl ActionSchema {
    /// Returns the schema of every offered action.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        ActionName::ALL.into_iter().map(Self::of).collect()
    }

    /// Returns the schema of one action.
    #[must_use]
    pub fn of(name: ActionName) -> Self {
        match name {
            ActionName::SubmitAnswer => Self {
                name: name.as_str().to_string(),
                description: "Answer the current exercise. For multiple choice send the option \
                              text, for word banks send the words separated by spaces, otherwise \
                              send the typed answer."
                    .to_string(),
                schema: Some(json!({
                    "type": "object",
                    "properties": {
                        "answer": { "type": "string" }
                    },
                    "required": ["answer"]
                })),
            },
            ActionName::ClickContinue => Self {
                name: name.as_str().to_string(),
                description: "Press the continue button to check the answer or move on."
                    .to_string(),
                schema: None,
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_data() {
        let data = json!({
            "id": "42",
            "name": "submit_answer",
            "parameters": { "answer": "hola" }
        });

        let request = ActionRequest::from_data(Some(&data)).expect("parse");
        assert_eq!(request.id.as_str(), "42");
        assert_eq!(request.name, ActionName::SubmitAnswer);
        assert_eq!(request.param_str("answer"), Some("hola"));
    }

    #[test]
    fn test_request_string_encoded_parameters() {
        let data = json!({
            "id": "7",
            "name": "submit_answer",
            "parameters": "{\"answer\":\"gato\"}"
        });

        let request = ActionRequest::from_data(Some(&data)).expect("parse");
        assert_eq!(request.param_str("answer"), Some("gato"));
    }

    #[test]
    fn test_request_without_parameters() {
        let data = json!({ "id": "1", "name": "click_continue" });
        let request = ActionRequest::from_data(Some(&data)).expect("parse");
        assert_eq!(request.name, ActionName::ClickContinue);
        assert_eq!(request.parameters, Value::Null);
    }

    #[test]
    fn test_request_missing_id() {
        let data = json!({ "name": "submit_answer" });
        let err = ActionRequest::from_data(Some(&data)).unwrap_err();
        assert!(matches!(err, Error::Dispatch { .. }));

        let err = ActionRequest::from_data(None).unwrap_err();
        assert!(matches!(err, Error::Dispatch { .. }));

        let data = json!({ "id": "", "name": "submit_answer" });
        assert!(ActionRequest::from_data(Some(&data)).is_err());
    }

    #[test]
    fn test_request_unknown_name() {
        let data = json!({ "id": "9", "name": "dance" });
        let err = ActionRequest::from_data(Some(&data)).unwrap_err();
        assert!(matches!(err, Error::UnknownAction { ref name } if name == "dance"));
    }

    #[test]
    fn test_result_serialization() {
        let result = ActionResult::failure(ActionId::from("42"), "no page");
        let value = serde_json::to_value(&result).expect("serialize");
        assert_eq!(
            value,
            json!({ "id": "42", "success": false, "message": "no page" })
        );
    }

    #[test]
    fn test_default_schemas() {
        let schemas = ActionSchema::defaults();
        let names: Vec<_> = schemas.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["submit_answer", "click_continue"]);
        assert!(schemas[0].schema.is_some());
        assert!(schemas[1].schema.is_none());
    }
}
