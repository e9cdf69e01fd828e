//! Executes agent actions against the page adapters.
//!
//! A page target that receives a forwarded [`ActionRequest`] runs it through
//! an [`ActionExecutor`] and reports the returned [`ActionResult`] back to
//! the session.

// ============================================================================
// Imports
// ============================================================================

use tracing::debug;

use crate::protocol::{ActionName, ActionRequest, ActionResult};

use super::context::{ContextType, PageContext};
use super::{ContextExtractor, PageActions};

// ============================================================================
// ActionExecutor
// ============================================================================

/// Runs action requests using a context extractor and a page actuator.
#[derive(Debug, Clone)]
pub struct ActionExecutor<E, A> {
    extractor: E,
    actions: A,
}

impl<E, A> ActionExecutor<E, A>
where
    E: ContextExtractor,
    A: PageActions,
{
    /// Creates an executor.
    #[inline]
    #[must_use]
    pub fn new(extractor: E, actions: A) -> Self {
        Self { extractor, actions }
    }

    /// Executes `request` and returns its result.
    ///
    /// Never panics on bad input; every failure becomes a failed result.
    pub fn execute(&self, request: &ActionRequest) -> ActionResult {
        let outcome = match request.name {
            ActionName::SubmitAnswer => self.submit_answer(request),
            ActionName::ClickContinue => self.click_continue(),
        };

        debug!(id = %request.id, action = %request.name, ok = outcome.is_ok(), "Action executed");

        match outcome {
            Ok(message) => ActionResult::success(request.id.clone(), message),
            Err(message) => ActionResult::failure(request.id.clone(), message),
        }
    }

    fn submit_answer(&self, request: &ActionRequest) -> Result<String, String> {
        let answer = request
            .param_str("answer")
            .map(str::trim)
            .filter(|answer| !answer.is_empty())
            .ok_or_else(|| "Missing \"answer\" parameter".to_string())?;

        let context = self.extractor.extract_context();
        if !context.is_answerable() {
            return Err("No exercise is currently shown".to_string());
        }

        let answer = resolve_answer(&context, answer)?;

        self.actions.clear_previous_selection(context.context_type);
        self.actions.apply_answer(context.context_type, &answer);

        Ok(format!("Submitted answer \"{answer}\""))
    }

    fn click_continue(&self) -> Result<String, String> {
        if self.actions.click_continue() {
            Ok("Clicked continue".to_string())
        } else {
            Err("Continue button is not available".to_string())
        }
    }
}

/// Checks `answer` against the exercise and returns the text to apply.
fn resolve_answer(context: &PageContext, answer: &str) -> Result<String, String> {
    match context.context_type {
        ContextType::Choice => context
            .options
            .iter()
            .find(|option| option.trim().eq_ignore_ascii_case(answer))
            .cloned()
            .ok_or_else(|| {
                format!(
                    "\"{answer}\" is not one of the options: {}",
                    context.options.join(", ")
                )
            }),
        ContextType::Tap => {
            let mut bank: Vec<String> = context.tokens.iter().map(|t| t.to_lowercase()).collect();
            for word in answer.split_whitespace() {
                let word = word.to_lowercase();
                match bank.iter().position(|token| *token == word) {
                    Some(index) => {
                        bank.swap_remove(index);
                    }
                    None => return Err(format!("Word \"{word}\" is not in the word bank")),
                }
            }
            Ok(answer.to_string())
        }
        ContextType::Text => Ok(answer.to_string()),
        ContextType::Unknown => Err("No exercise is currently shown".to_string()),
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::{Value, json};

    use crate::identifiers::ActionId;

    struct FixedContext(PageContext);

    impl ContextExtractor for FixedContext {
        fn extract_context(&self) -> PageContext {
            self.0.clone()
        }
    }

    #[derive(Default)]
    struct RecordingPage {
        calls: Mutex<Vec<String>>,
        continue_available: bool,
    }

    impl PageActions for RecordingPage {
        fn apply_answer(&self, context_type: ContextType, answer: &str) {
            self.calls
                .lock()
                .push(format!("apply:{}:{answer}", context_type.as_str()));
        }

        fn clear_previous_selection(&self, context_type: ContextType) {
            self.calls
                .lock()
                .push(format!("clear:{}", context_type.as_str()));
        }

        fn click_continue(&self) -> bool {
            self.calls.lock().push("continue".to_string());
            self.continue_available
        }
    }

    fn request(name: ActionName, parameters: Value) -> ActionRequest {
        ActionRequest {
            id: ActionId::from("42"),
            name,
            parameters,
        }
    }

    fn choice() -> PageContext {
        PageContext {
            question: "el gato".into(),
            context_type: ContextType::Choice,
            options: vec!["The cat".into(), "The dog".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_submit_choice_uses_option_text() {
        let executor = ActionExecutor::new(FixedContext(choice()), RecordingPage::default());
        let result = executor.execute(&request(
            ActionName::SubmitAnswer,
            json!({ "answer": "the cat" }),
        ));

        assert!(result.success);
        assert_eq!(result.id.as_str(), "42");
        assert_eq!(
            *executor.actions.calls.lock(),
            ["clear:choice", "apply:choice:The cat"]
        );
    }

    #[test]
    fn test_submit_choice_rejects_unknown_option() {
        let executor = ActionExecutor::new(FixedContext(choice()), RecordingPage::default());
        let result = executor.execute(&request(
            ActionName::SubmitAnswer,
            json!({ "answer": "the bird" }),
        ));

        assert!(!result.success);
        assert!(result.message.contains("The cat, The dog"));
        assert!(executor.actions.calls.lock().is_empty());
    }

    #[test]
    fn test_submit_tap_checks_word_bank() {
        let context = PageContext {
            context_type: ContextType::Tap,
            tokens: vec!["Hola".into(), "amigo".into(), "adios".into()],
            ..Default::default()
        };
        let executor = ActionExecutor::new(FixedContext(context), RecordingPage::default());

        let ok = executor.execute(&request(
            ActionName::SubmitAnswer,
            json!({ "answer": "hola amigo" }),
        ));
        assert!(ok.success);

        let repeated = executor.execute(&request(
            ActionName::SubmitAnswer,
            json!({ "answer": "hola hola" }),
        ));
        assert!(!repeated.success);
    }

    #[test]
    fn test_submit_without_exercise() {
        let executor =
            ActionExecutor::new(FixedContext(PageContext::default()), RecordingPage::default());
        let result = executor.execute(&request(
            ActionName::SubmitAnswer,
            json!({ "answer": "hola" }),
        ));
        assert!(!result.success);
        assert_eq!(result.message, "No exercise is currently shown");
    }

    #[test]
    fn test_submit_missing_answer() {
        let executor = ActionExecutor::new(FixedContext(choice()), RecordingPage::default());
        let result = executor.execute(&request(ActionName::SubmitAnswer, json!({ "answer": " " })));
        assert!(!result.success);
    }

    #[test]
    fn test_click_continue() {
        let page = RecordingPage {
            continue_available: true,
            ..Default::default()
        };
        let executor = ActionExecutor::new(FixedContext(choice()), page);
        assert!(executor.execute(&request(ActionName::ClickContinue, Value::Null)).success);

        let executor = ActionExecutor::new(FixedContext(choice()), RecordingPage::default());
        assert!(!executor.execute(&request(ActionName::ClickContinue, Value::Null)).success);
    }
}
