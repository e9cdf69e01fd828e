//! Page-side collaborators.
//!
//! The bridge does not touch the DOM. It talks to the page through three
//! interfaces implemented by page-specific adapters:
//!
//! | Trait | Role |
//! |-------|------|
//! | [`PageTargets`] | Lists the page targets and forwards action requests to them |
//! | [`ContextExtractor`] | Reads the current exercise (pure read) |
//! | [`PageActions`] | Simulates user input (best effort) |
//!
//! A target that receives a forwarded request typically runs it through
//! [`ActionExecutor`] and reports the result with
//! [`AgentSession::report_action_result`](crate::AgentSession::report_action_result).

// ============================================================================
// Imports
// ============================================================================

use async_trait::async_trait;

use crate::error::Result;
use crate::identifiers::TargetId;
use crate::protocol::ActionRequest;

// ============================================================================
// Submodules
// ============================================================================

/// Exercise context types.
pub mod context;

/// Action execution against the page adapters.
pub mod executor;

// ============================================================================
// Re-exports
// ============================================================================

pub use context::{ContextType, PageContext};
pub use executor::ActionExecutor;

// ============================================================================
// Traits
// ============================================================================

/// Page targets (tabs or windows) that can run actions.
#[async_trait]
pub trait PageTargets: Send + Sync {
    /// Returns the targets currently able to receive an action.
    async fn available_targets(&self) -> Vec<TargetId>;

    /// Hands `request` to `target`.
    ///
    /// Success means the target accepted the request; its result arrives
    /// later through the session.
    async fn forward_action(&self, target: TargetId, request: &ActionRequest) -> Result<()>;
}

/// Reads the exercise currently on screen.
pub trait ContextExtractor: Send + Sync {
    /// Returns a snapshot of the page. Must not mutate the page.
    fn extract_context(&self) -> PageContext;
}

/// Simulates user input on the page.
pub trait PageActions: Send + Sync {
    /// Enters `answer` the way the exercise expects.
    fn apply_answer(&self, context_type: ContextType, answer: &str);

    /// Undoes a previous selection or input.
    fn clear_previous_selection(&self, context_type: ContextType);

    /// Presses continue. Returns `false` if the button is not available.
    fn click_continue(&self) -> bool;
}
