//! Session event loop.
//!
//! One spawned task owns the socket, the reconnect policy, the retry timer,
//! the liveness monitor and the correlation table. Handles talk to it over an
//! unbounded command channel with oneshot replies.
//!
//! # Loop inputs
//!
//! | Source | Effect |
//! |--------|--------|
//! | Command channel | connect, send, close, delivery outcomes |
//! | Connect future | open or failed open |
//! | Socket | inbound text, close, error |
//! | Retry timer | next connect attempt |
//! | Liveness interval | keep-alive ping when idle |
//!
//! Page delivery runs on spawned tasks that post their outcome back as a
//! command, so a slow page never stalls the loop. The loop exits when the
//! last [`AgentSession`](crate::AgentSession) handle is dropped.

// ============================================================================
// Imports
// ============================================================================

use std::future::pending;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use parking_lot::{Mutex, RwLock};
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, error, info, trace, warn};

use crate::config::SessionConfig;
use crate::error::{Error, Result};
use crate::identifiers::ActionId;
use crate::monitor::{LogLevel, MonitorFeed};
use crate::page::PageTargets;
use crate::protocol::{ActionName, ActionRequest, ActionSchema, Frame, LocalMessage, decode, encode};
use crate::transport::{
    Inbound, LivenessMonitor, ReconnectPhase, ReconnectPolicy, ScopedTimer, Transport,
};

use super::correlation::{ActionCorrelation, DeliveryOutcome, DeliveryTicket, deliver};
use super::router::{CommandRouter, InboundCommand};
use super::state::{ConnectionState, SessionEvent, SessionState};

// ============================================================================
// Constants
// ============================================================================

/// Capacity of the lifecycle event channel.
const EVENT_CHANNEL_CAPACITY: usize = 64;

// ============================================================================
// Types
// ============================================================================

/// Observer of inbound frames.
///
/// Handlers run on the session loop, before routing, and must not block.
/// The loop calls a snapshot of the list, so a handler may register more
/// handlers; those see the next frame.
pub type FrameHandler = Arc<dyn Fn(&Frame) + Send + Sync>;

/// In-flight connect attempt.
type ConnectFuture = BoxFuture<'static, Result<Transport>>;

/// Requests from session handles and delivery tasks.
pub(crate) enum SessionCommand {
    /// Open the socket unless already open or opening.
    Connect,

    /// Write a raw frame.
    Send {
        frame: Frame,
        reply: oneshot::Sender<bool>,
    },

    /// Wrap and write a local message.
    Outbound {
        message: LocalMessage,
        reply: oneshot::Sender<bool>,
    },

    /// A delivery task finished.
    Delivery {
        id: ActionId,
        name: ActionName,
        ticket: DeliveryTicket,
        outcome: DeliveryOutcome,
    },

    /// Close and stop reconnecting.
    Close { done: oneshot::Sender<()> },
}

// ============================================================================
// SessionShared
// ============================================================================

/// State readable from session handles. Written only by the loop, except
/// for the handler list.
pub(crate) struct SessionShared {
    pub(crate) state: RwLock<SessionState>,
    pub(crate) correlation: Mutex<ActionCorrelation>,
    pub(crate) handlers: RwLock<Vec<FrameHandler>>,
    pub(crate) events: broadcast::Sender<SessionEvent>,
    pub(crate) monitor: MonitorFeed,
}

impl SessionShared {
    pub(crate) fn new(log_cache_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            state: RwLock::new(SessionState::default()),
            correlation: Mutex::new(ActionCorrelation::new()),
            handlers: RwLock::new(Vec::new()),
            events,
            monitor: MonitorFeed::new(log_cache_capacity),
        }
    }

    fn emit(&self, event: SessionEvent) {
        // No subscriber is fine.
        let _ = self.events.send(event);
    }
}

// ============================================================================
// SessionDriver
// ============================================================================

/// The loop's owned state.
pub(crate) struct SessionDriver {
    config: SessionConfig,
    router: CommandRouter,
    shared: Arc<SessionShared>,
    targets: Arc<dyn PageTargets>,
    commands: mpsc::WeakUnboundedSender<SessionCommand>,
    transport: Option<Transport>,
    connecting: Option<ConnectFuture>,
    policy: ReconnectPolicy,
    retry: ScopedTimer,
    liveness: LivenessMonitor,
    registered: Vec<ActionSchema>,
}

impl SessionDriver {
    pub(crate) fn new(
        config: SessionConfig,
        shared: Arc<SessionShared>,
        targets: Arc<dyn PageTargets>,
        commands: mpsc::WeakUnboundedSender<SessionCommand>,
    ) -> Self {
        Self {
            router: CommandRouter::new(config.game.clone()),
            policy: ReconnectPolicy::new(config.reconnect),
            liveness: LivenessMonitor::new(config.liveness),
            retry: ScopedTimer::new(),
            transport: None,
            connecting: None,
            registered: Vec::new(),
            config,
            shared,
            targets,
            commands,
        }
    }

    /// Runs until every command sender is gone.
    pub(crate) async fn run(mut self, mut commands: mpsc::UnboundedReceiver<SessionCommand>) {
        debug!(endpoint = %self.config.endpoint, "Session loop started");

        loop {
            tokio::select! {
                command = commands.recv() => {
                    match command {
                        Some(command) => self.handle_command(command).await,
                        None => {
                            debug!("All session handles dropped");
                            break;
                        }
                    }
                }

                result = next_connect(&mut self.connecting) => {
                    self.connecting = None;
                    self.on_connect_result(result).await;
                }

                inbound = next_inbound(&mut self.transport) => {
                    self.on_inbound(inbound);
                }

                () = self.retry.fired() => {
                    self.start_connect();
                }

                () = self.liveness.tick() => {
                    self.on_liveness_tick().await;
                }
            }
        }

        self.close().await;
        debug!("Session loop terminated");
    }

    // ========================================================================
    // Commands
    // ========================================================================

    async fn handle_command(&mut self, command: SessionCommand) {
        match command {
            SessionCommand::Connect => self.connect(),

            SessionCommand::Send { frame, reply } => {
                let sent = self.write_frame(frame).await;
                let _ = reply.send(sent);
            }

            SessionCommand::Outbound { message, reply } => {
                let sent = self.send_local(message).await;
                let _ = reply.send(sent);
            }

            SessionCommand::Delivery {
                id,
                name,
                ticket,
                outcome,
            } => self.on_delivery(id, name, ticket, outcome).await,

            SessionCommand::Close { done } => {
                self.close().await;
                let _ = done.send(());
            }
        }
    }

    fn connect(&mut self) {
        let phase = self.policy.phase();
        if matches!(phase, ReconnectPhase::Connecting | ReconnectPhase::Connected) {
            debug!(?phase, "Connect ignored, already connected or connecting");
            return;
        }

        // An explicit connect skips the remaining backoff.
        self.retry.cancel();
        self.start_connect();
    }

    fn start_connect(&mut self) {
        self.policy.on_connecting();

        let state = if self.policy.attempts() == 0 {
            ConnectionState::Connecting
        } else {
            ConnectionState::Reconnecting
        };
        self.set_state(state);

        debug!(
            endpoint = %self.config.endpoint,
            attempt = self.policy.attempts() + 1,
            "Opening socket"
        );

        let endpoint = self.config.endpoint.clone();
        let timeout = self.config.connect_timeout;
        self.connecting = Some(Transport::open(endpoint, timeout).boxed());
    }

    async fn close(&mut self) {
        let cancelled = self.retry.cancel();
        let aborted = self.connecting.take().is_some();
        self.liveness.stop();

        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
            info!("Disconnected from agent");
            self.shared.monitor.log(LogLevel::Info, "Disconnected from the agent");
            self.shared.emit(SessionEvent::Disconnected);
        }

        self.policy.reset();
        {
            let mut state = self.shared.state.write();
            state.connection_state = ConnectionState::Disconnected;
            state.reconnect_attempts = 0;
            state.connection_lost = false;
        }
        self.shared.monitor.status(ConnectionState::Disconnected, 0);

        debug!(cancelled, aborted, "Session closed");
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    async fn on_connect_result(&mut self, result: Result<Transport>) {
        match result {
            Ok(transport) => self.on_open(transport).await,
            Err(e) => {
                if e.is_connection_error() {
                    warn!(endpoint = %self.config.endpoint, error = %e, "Connect attempt failed");
                } else {
                    error!(endpoint = %self.config.endpoint, error = %e, "Connect attempt failed unexpectedly");
                }
                self.shared.emit(SessionEvent::Diagnostic {
                    message: e.to_string(),
                });
                self.on_closed(None);
            }
        }
    }

    async fn on_open(&mut self, transport: Transport) {
        self.transport = Some(transport);

        let restored = self.policy.on_open();
        let epoch = self.shared.correlation.lock().begin_epoch();
        {
            let mut state = self.shared.state.write();
            state.connection_state = ConnectionState::Connected;
            state.reconnect_attempts = 0;
            state.connection_lost = false;
            state.last_message_at = Some(Instant::now());
            state.epoch = epoch;
        }
        self.liveness.start();

        info!(endpoint = %self.config.endpoint, %epoch, restored, "Connected to agent");
        self.shared.monitor.status(ConnectionState::Connected, 0);
        self.shared.monitor.log(
            LogLevel::Info,
            if restored {
                "Connection to the agent restored"
            } else {
                "Connected to the agent"
            },
        );
        self.shared.emit(SessionEvent::Connected { restored });

        let startup = self.router.startup_frame();
        self.write_frame(startup).await;

        if !self.registered.is_empty() {
            let actions = self.registered.clone();
            debug!(count = actions.len(), "Re-registering actions");
            self.write_message(LocalMessage::RegisterActions { actions })
                .await;
        }
    }

    fn on_closed(&mut self, reason: Option<String>) {
        self.liveness.stop();

        if self.transport.take().is_some() {
            info!(reason = reason.as_deref().unwrap_or(""), "Connection to agent closed");
            self.shared.monitor.log(LogLevel::Warning, "Disconnected from the agent");
            self.shared.emit(SessionEvent::Disconnected);
        }

        let decision = self.policy.on_close();
        self.retry.arm(decision.delay);

        {
            let mut state = self.shared.state.write();
            state.connection_state = ConnectionState::Reconnecting;
            state.reconnect_attempts = decision.attempt;
            state.connection_lost = self.policy.is_connection_lost();
        }
        self.shared
            .monitor
            .status(ConnectionState::Reconnecting, decision.attempt);

        debug!(
            attempt = decision.attempt,
            delay_ms = decision.delay.as_millis() as u64,
            "Reconnect scheduled"
        );
        self.shared.emit(SessionEvent::Reconnecting {
            attempt: decision.attempt,
            delay: decision.delay,
        });

        if decision.escalate {
            error!(attempts = decision.attempt, "Connection to agent lost");
            self.shared.monitor.log(
                LogLevel::Error,
                format!(
                    "Connection to the agent lost after {} attempts, still retrying",
                    decision.attempt
                ),
            );
            self.shared.emit(SessionEvent::ConnectionLost {
                attempts: decision.attempt,
            });
        }
    }

    fn set_state(&self, connection_state: ConnectionState) {
        let attempts = {
            let mut state = self.shared.state.write();
            state.connection_state = connection_state;
            state.reconnect_attempts
        };
        self.shared.monitor.status(connection_state, attempts);
    }

    // ========================================================================
    // Inbound
    // ========================================================================

    fn on_inbound(&mut self, inbound: Inbound) {
        match inbound {
            Inbound::Text(text) => self.on_text(&text),

            Inbound::Closed { reason } => self.on_closed(reason),

            // A failed socket is not read again.
            Inbound::Failed(e) => {
                warn!(error = %e, "WebSocket error");
                self.shared.emit(SessionEvent::Diagnostic {
                    message: e.to_string(),
                });
                self.on_closed(Some(e.to_string()));
            }
        }
    }

    fn on_text(&mut self, text: &str) {
        self.shared.state.write().last_message_at = Some(Instant::now());

        let frame = match decode(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, "Discarding undecodable message");
                return;
            }
        };

        trace!(command = %frame.command, "Frame received");

        let handlers: Vec<FrameHandler> = self.shared.handlers.read().clone();
        for handler in &handlers {
            handler(&frame);
        }

        match self.router.classify(&frame) {
            Ok(InboundCommand::Action(request)) => self.dispatch_action(request),

            Ok(InboundCommand::Status(data)) => {
                debug!(data = ?data, "Agent status");
            }

            Ok(InboundCommand::Unrecognized(command)) => {
                warn!(%command, "Unrecognized command from agent");
            }

            Err(e) if e.is_dispatch_error() => {
                warn!(error = %e, "Dropping action frame");
                self.shared
                    .monitor
                    .log(LogLevel::Warning, format!("Ignored agent action: {e}"));
            }

            Err(e) => {
                warn!(error = %e, "Failed to route agent frame");
                self.shared.emit(SessionEvent::Diagnostic {
                    message: e.to_string(),
                });
            }
        }
    }

    fn dispatch_action(&mut self, request: ActionRequest) {
        let ticket = self.shared.correlation.lock().register(&request);

        info!(id = %request.id, action = %request.name, "Action requested");
        self.shared.monitor.log(
            LogLevel::Info,
            format!("Agent requested {} ({})", request.name, request.id),
        );

        let targets = Arc::clone(&self.targets);
        let commands = self.commands.clone();

        tokio::spawn(async move {
            let outcome = deliver(targets.as_ref(), &request).await;

            if let Some(commands) = commands.upgrade() {
                let _ = commands.send(SessionCommand::Delivery {
                    id: request.id,
                    name: request.name,
                    ticket,
                    outcome,
                });
            }
        });
    }

    async fn on_delivery(
        &mut self,
        id: ActionId,
        name: ActionName,
        ticket: DeliveryTicket,
        outcome: DeliveryOutcome,
    ) {
        let Some(err) = outcome.error(&id, name) else {
            let marked = self.shared.correlation.lock().mark_delivered(&id, ticket);
            trace!(%id, marked, "Action delivered");
            return;
        };

        let failure = self
            .shared
            .correlation
            .lock()
            .fail_undelivered(&id, ticket, err.to_string());

        match failure {
            Some(result) => {
                warn!(%id, reason = %result.message, "Action not delivered");
                self.shared
                    .monitor
                    .log(LogLevel::Warning, result.message.clone());
                self.write_message(LocalMessage::ActionResult(result)).await;
            }
            None => debug!(
                %id,
                epoch = %ticket.epoch,
                sequence = ticket.sequence,
                "Stale delivery outcome ignored"
            ),
        }
    }

    async fn on_liveness_tick(&mut self) {
        let last_message_at = self.shared.state.read().last_message_at;

        if self.liveness.should_ping(last_message_at, Instant::now()) {
            let ping = self.router.ping_frame();
            if !self.write_frame(ping).await {
                debug!("Keep-alive ping not sent");
            }
        }
    }

    // ========================================================================
    // Outbound
    // ========================================================================

    async fn send_local(&mut self, message: LocalMessage) -> bool {
        let message = match message {
            LocalMessage::ActionResult(result) => {
                if !self.shared.correlation.lock().resolve(&result.id) {
                    warn!(id = %result.id, "Result for an action that is not pending, dropped");
                    return false;
                }
                info!(id = %result.id, success = result.success, "Action finished");
                LocalMessage::ActionResult(result)
            }

            LocalMessage::RegisterActions { actions } => {
                let actions = self.remember_actions(actions);
                if actions.is_empty() {
                    return false;
                }
                LocalMessage::RegisterActions { actions }
            }

            other @ (LocalMessage::Context { .. } | LocalMessage::ForceAction(_)) => other,
        };

        self.write_message(message).await
    }

    /// Keeps the schemas this bridge can execute and merges them into the
    /// set re-registered on every open. Returns the kept schemas.
    fn remember_actions(&mut self, actions: Vec<ActionSchema>) -> Vec<ActionSchema> {
        let mut kept = Vec::with_capacity(actions.len());

        for action in actions {
            if let Err(e) = action.name.parse::<ActionName>() {
                warn!(error = %e, "Refusing to register action");
                self.shared
                    .monitor
                    .log(LogLevel::Warning, format!("Action not registered: {e}"));
                continue;
            }

            match self.registered.iter_mut().find(|a| a.name == action.name) {
                Some(existing) => *existing = action.clone(),
                None => self.registered.push(action.clone()),
            }
            kept.push(action);
        }

        kept
    }

    async fn write_message(&mut self, message: LocalMessage) -> bool {
        match self.router.outbound_frame(message) {
            Ok(frame) => self.write_frame(frame).await,
            Err(e) => {
                warn!(error = %e, "Failed to build outbound frame");
                false
            }
        }
    }

    /// Writes one frame. Never errors; failures are logged.
    async fn write_frame(&mut self, mut frame: Frame) -> bool {
        if frame.command.trim().is_empty() {
            warn!("Rejected frame with empty command");
            return false;
        }

        let Some(transport) = self.transport.as_mut() else {
            debug!(command = %frame.command, error = %Error::NotConnected, "Frame dropped");
            return false;
        };

        frame.fill_game(self.router.game());

        let text = match encode(&frame) {
            Ok(text) => text,
            Err(e) => {
                warn!(command = %frame.command, error = %e, "Failed to encode frame");
                return false;
            }
        };

        match transport.send_text(text).await {
            Ok(()) => {
                trace!(command = %frame.command, "Frame sent");
                true
            }
            Err(e) => {
                warn!(command = %frame.command, error = %e, "Failed to send frame");
                false
            }
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Completes when the in-flight connect finishes; pending when none is.
async fn next_connect(connecting: &mut Option<ConnectFuture>) -> Result<Transport> {
    match connecting.as_mut() {
        Some(future) => future.await,
        None => pending().await,
    }
}

/// Next socket input; pending while there is no socket.
async fn next_inbound(transport: &mut Option<Transport>) -> Inbound {
    match transport.as_mut() {
        Some(transport) => transport.next_inbound().await,
        None => pending().await,
    }
}
