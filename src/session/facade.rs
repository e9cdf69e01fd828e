//! Session handle.
//!
//! [`AgentSession`] is the one entry point collaborators use. It is cheap to
//! clone; every clone talks to the same event loop. Dropping the last clone
//! stops the loop and closes the socket.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use async_trait::async_trait;
//! use lingo_bridge::{ActionRequest, AgentSession, Result, SessionConfig, TargetId};
//! use lingo_bridge::page::PageTargets;
//!
//! struct SingleTab;
//!
//! #[async_trait]
//! impl PageTargets for SingleTab {
//!     async fn available_targets(&self) -> Vec<TargetId> {
//!         vec![TargetId::new(1)]
//!     }
//!
//!     async fn forward_action(&self, _target: TargetId, _request: &ActionRequest) -> Result<()> {
//!         Ok(())
//!     }
//! }
//!
//! # async fn example() -> Result<()> {
//! let config = SessionConfig::builder().endpoint("ws://localhost:8000").build()?;
//! let session = AgentSession::new(config, Arc::new(SingleTab));
//!
//! session.connect();
//! session.register_actions(lingo_bridge::ActionSchema::defaults()).await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};
use tracing::debug;

use crate::config::SessionConfig;
use crate::monitor::MonitorFeed;
use crate::page::{PageContext, PageTargets};
use crate::protocol::{ActionResult, ActionSchema, ForceAction, Frame, LocalMessage};

use super::driver::{FrameHandler, SessionCommand, SessionDriver, SessionShared};
use super::state::{SessionEvent, SessionState};

// ============================================================================
// AgentSession
// ============================================================================

/// Handle to one agent session.
#[derive(Clone)]
pub struct AgentSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    commands: mpsc::UnboundedSender<SessionCommand>,
    shared: Arc<SessionShared>,
    game: String,
}

impl fmt::Debug for AgentSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentSession")
            .field("game", &self.inner.game)
            .field("state", &self.inner.shared.state.read().connection_state)
            .finish_non_exhaustive()
    }
}

impl AgentSession {
    /// Creates a session and spawns its event loop. Does not connect.
    ///
    /// Must be called within a tokio runtime.
    #[must_use]
    pub fn new(config: SessionConfig, targets: Arc<dyn PageTargets>) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(SessionShared::new(config.log_cache_capacity));
        let game = config.game.clone();

        let driver = SessionDriver::new(config, Arc::clone(&shared), targets, commands.downgrade());
        tokio::spawn(driver.run(receiver));

        Self {
            inner: Arc::new(SessionInner {
                commands,
                shared,
                game,
            }),
        }
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Opens the connection, or does nothing if already open or opening.
    ///
    /// Failures are retried with backoff; watch [`subscribe`](Self::subscribe)
    /// for the outcome.
    pub fn connect(&self) {
        if self.inner.commands.send(SessionCommand::Connect).is_err() {
            debug!("Session loop gone, connect ignored");
        }
    }

    /// Closes the connection and stops reconnecting until the next
    /// [`connect`](Self::connect). Idempotent.
    pub async fn close(&self) {
        let (done, wait) = oneshot::channel();
        if self.inner.commands.send(SessionCommand::Close { done }).is_ok() {
            let _ = wait.await;
        }
    }

    /// Returns `true` while the socket is open.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.shared.state.read().is_connected()
    }

    /// Returns a snapshot of the session state.
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.inner.shared.state.read().clone()
    }

    /// Returns the number of actions waiting for a result.
    #[must_use]
    pub fn pending_actions(&self) -> usize {
        self.inner.shared.correlation.lock().pending_count()
    }

    /// Returns the configured game identifier.
    #[inline]
    #[must_use]
    pub fn game(&self) -> &str {
        &self.inner.game
    }

    // ========================================================================
    // Sending
    // ========================================================================

    /// Sends a raw frame. `game` is filled in when absent.
    ///
    /// Returns `false` if the frame was rejected or could not be written.
    pub async fn send_to_agent(&self, frame: Frame) -> bool {
        self.request(|reply| SessionCommand::Send { frame, reply })
            .await
    }

    /// Sends a local message under its wire command.
    ///
    /// An [`LocalMessage::ActionResult`] is sent only if its id is pending.
    pub async fn dispatch(&self, message: LocalMessage) -> bool {
        self.request(|reply| SessionCommand::Outbound { message, reply })
            .await
    }

    /// Describes `context` to the agent.
    pub async fn send_context(&self, context: &PageContext, silent: bool) -> bool {
        self.dispatch(LocalMessage::context(context.describe(), silent))
            .await
    }

    /// Reports the result of an action the agent requested.
    pub async fn report_action_result(&self, result: ActionResult) -> bool {
        self.dispatch(LocalMessage::ActionResult(result)).await
    }

    /// Announces actions. They are announced again after every reconnect.
    ///
    /// Schemas whose name is not an [`ActionName`](crate::ActionName) are
    /// refused. Returns `false` if none are left.
    pub async fn register_actions(&self, actions: Vec<ActionSchema>) -> bool {
        self.dispatch(LocalMessage::RegisterActions { actions })
            .await
    }

    /// Asks the agent to pick one of the given actions now.
    pub async fn force_action(&self, force: ForceAction) -> bool {
        self.dispatch(LocalMessage::ForceAction(force)).await
    }

    async fn request(&self, command: impl FnOnce(oneshot::Sender<bool>) -> SessionCommand) -> bool {
        let (reply, outcome) = oneshot::channel();
        if self.inner.commands.send(command(reply)).is_err() {
            return false;
        }
        outcome.await.unwrap_or(false)
    }

    // ========================================================================
    // Observing
    // ========================================================================

    /// Registers an observer for every decoded inbound frame.
    ///
    /// Handlers run on the session loop and must not block. A handler added
    /// from inside a handler sees frames from the next one on.
    pub fn on_agent_frame(&self, handler: impl Fn(&Frame) + Send + Sync + 'static) {
        let handler: FrameHandler = Arc::new(handler);
        self.inner.shared.handlers.write().push(handler);
    }

    /// Subscribes to lifecycle events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.shared.events.subscribe()
    }

    /// Returns the monitoring UI feed.
    #[inline]
    #[must_use]
    pub fn monitor(&self) -> &MonitorFeed {
        &self.inner.shared.monitor
    }
}

// ============================================================================
// Tests
// ============================================================================
