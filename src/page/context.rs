//! Exercise context extracted from the page.

// ============================================================================
// Imports
// ============================================================================

use std::fmt::Write as _;

use serde::{Deserialize, Serialize};

// ============================================================================
// ContextType
// ============================================================================

/// How the current exercise is answered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    /// Pick one of several options.
    Choice,
    /// Tap word tokens in order.
    Tap,
    /// Type the answer.
    Text,
    /// No recognizable exercise on the page.
    #[default]
    Unknown,
}

impl ContextType {
    /// Returns the lowercase name.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Choice => "choice",
            Self::Tap => "tap",
            Self::Text => "text",
            Self::Unknown => "unknown",
        }
    }
}

// ============================================================================
// PageContext
// ============================================================================

/// Snapshot of the exercise currently on screen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageContext {
    /// Prompt text.
    #[serde(default)]
    pub question: String,

    /// Exercise kind.
    #[serde(default)]
    pub context_type: ContextType,

    /// Options of a choice exercise.
    #[serde(default)]
    pub options: Vec<String>,

    /// Word tokens of a tap exercise.
    #[serde(default)]
    pub tokens: Vec<String>,

    /// Option currently selected, if any.
    #[serde(default)]
    pub selected_option: Option<String>,

    /// Current content of the answer box.
    #[serde(default)]
    pub text_input_value: Option<String>,

    /// `true` when the prompt is only available as audio.
    #[serde(default)]
    pub is_audio_question: bool,
}

impl PageContext {
    /// Returns `true` if there is an exercise to answer.
    #[inline]
    #[must_use]
    pub fn is_answerable(&self) -> bool {
        self.context_type != ContextType::Unknown
    }

    /// Renders the context as the text of a `context` message.
    #[must_use]
    pub fn describe(&self) -> String {
        if !self.is_answerable() {
            return "No exercise is currently shown.".to_string();
        }

        let mut text = String::new();
        if self.is_audio_question {
            text.push_str("Listening exercise (audio prompt).");
            if !self.question.is_empty() {
                let _ = write!(text, " Prompt: {}", self.question);
            }
        } else {
            let _ = write!(text, "Question: {}", self.question);
        }
        let _ = write!(text, "\nExercise type: {}", self.context_type.as_str());

        match self.context_type {
            ContextType::Choice => {
                text.push_str("\nOptions:");
                for (index, option) in self.options.iter().enumerate() {
                    let _ = write!(text, "\n{}. {}", index + 1, option);
                }
                if let Some(selected) = &self.selected_option {
                    let _ = write!(text, "\nSelected: {selected}");
                }
            }
            ContextType::Tap => {
                let _ = write!(text, "\nWord bank: {}", self.tokens.join(", "));
            }
            ContextType::Text => {
                if let Some(value) = self.text_input_value.as_deref().filter(|v| !v.is_empty()) {
                    let _ = write!(text, "\nCurrent input: {value}");
                }
            }
            ContextType::Unknown => {}
        }

        text
    }
}

// ============================================================================
// Tests
// ============================================================================
