//! End-to-end session tests against a local agent server.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{WebSocketStream, accept_async};

use lingo_bridge::page::PageTargets;
use lingo_bridge::{
    ActionRequest, ActionResult, ActionSchema, AgentSession, ConnectionState, Frame,
    LivenessConfig, ReconnectConfig, SessionConfig, SessionEvent, TargetId,
};

// ============================================================================
// Helpers
// ============================================================================

const WAIT: Duration = Duration::from_secs(5);

type AgentSocket = WebSocketStream<TcpStream>;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn bind_agent() -> Result<(TcpListener, String)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let url = format!("ws://{}", listener.local_addr()?);
    Ok((listener, url))
}

async fn accept_agent(listener: &TcpListener) -> Result<AgentSocket> {
    let (stream, _) = timeout(WAIT, listener.accept())
        .await
        .context("no connection from the bridge")??;
    Ok(accept_async(stream).await?)
}

async fn next_frame(socket: &mut AgentSocket) -> Result<Value> {
    loop {
        let message = timeout(WAIT, socket.next())
            .await
            .context("no frame from the bridge")?
            .context("socket ended")??;

        if let Message::Text(text) = message {
            return Ok(serde_json::from_str(text.as_str())?);
        }
    }
}

/// Returns the next frame if one arrives within `wait`.
async fn maybe_frame(socket: &mut AgentSocket, wait: Duration) -> Result<Option<Value>> {
    match timeout(wait, next_frame(socket)).await {
        Ok(frame) => frame.map(Some),
        Err(_) => Ok(None),
    }
}

async fn send_json(socket: &mut AgentSocket, value: Value) -> Result<()> {
    socket.send(Message::Text(value.to_string().into())).await?;
    Ok(())
}

async fn wait_for_event(
    events: &mut broadcast::Receiver<SessionEvent>,
    wanted: impl Fn(&SessionEvent) -> bool,
) -> Result<SessionEvent> {
    loop {
        let event = timeout(WAIT, events.recv())
            .await
            .context("event did not arrive")??;
        if wanted(&event) {
            return Ok(event);
        }
    }
}

fn config(url: &str) -> Result<SessionConfig> {
    Ok(SessionConfig::builder()
        .endpoint(url)
        .connect_timeout(Duration::from_secs(2))
        .reconnect(
            ReconnectConfig::default()
                .with_base_interval(Duration::from_millis(20))
                .with_max_interval(Duration::from_millis(50))
                .with_max_attempts(5),
        )
        .build()?)
}

/// Page with a fixed set of tabs that hands every forwarded request to the
/// test through a channel.
struct ChannelTargets {
    targets: Vec<TargetId>,
    forwarded: mpsc::UnboundedSender<ActionRequest>,
}

impl ChannelTargets {
    fn new(count: u32) -> (Self, mpsc::UnboundedReceiver<ActionRequest>) {
        let (forwarded, receiver) = mpsc::unbounded_channel();
        let targets = (1..=count).map(TargetId::new).collect();
        (Self { targets, forwarded }, receiver)
    }
}

#[async_trait]
impl PageTargets for ChannelTargets {
    async fn available_targets(&self) -> Vec<TargetId> {
        self.targets.clone()
    }

    async fn forward_action(
        &self,
        _target: TargetId,
        request: &ActionRequest,
    ) -> lingo_bridge::Result<()> {
        let _ = self.forwarded.send(request.clone());
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[tokio::test]
async fn test_startup_frame_on_connect() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, _forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));
    let mut events = session.subscribe();

    session.connect();
    let mut agent = accept_agent(&listener).await?;

    let startup = next_frame(&mut agent).await?;
    assert_eq!(startup, json!({ "command": "startup", "game": "Duolingo" }));

    let connected = wait_for_event(&mut events, |e| matches!(e, SessionEvent::Connected { .. })).await?;
    assert_eq!(connected, SessionEvent::Connected { restored: false });
    assert!(session.is_connected());
    assert_eq!(session.state().reconnect_attempts, 0);

    // Already connected: no second socket is opened.
    session.connect();
    assert!(timeout(Duration::from_millis(200), listener.accept()).await.is_err());
    assert_eq!(session.state().epoch.as_u64(), 1);

    Ok(())
}

#[tokio::test]
async fn test_action_round_trip_sends_one_result() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, mut forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    next_frame(&mut agent).await?;

    send_json(
        &mut agent,
        json!({
            "command": "action",
            "data": { "id": "42", "name": "submit_answer", "parameters": { "answer": "hola" } }
        }),
    )
    .await?;

    let request = timeout(WAIT, forwarded.recv())
        .await?
        .context("request not forwarded")?;
    assert_eq!(request.id.as_str(), "42");
    assert_eq!(request.param_str("answer"), Some("hola"));

    let result = ActionResult::success(request.id.clone(), "Submitted answer \"hola\"");
    assert!(session.report_action_result(result.clone()).await);

    let frame = next_frame(&mut agent).await?;
    assert_eq!(frame["command"], "action/result");
    assert_eq!(frame["game"], "Duolingo");
    assert_eq!(frame["data"]["id"], "42");
    assert_eq!(frame["data"]["success"], true);

    // A second result for the same id is not forwarded.
    assert!(!session.report_action_result(result).await);
    assert!(maybe_frame(&mut agent, Duration::from_millis(200)).await?.is_none());
    assert_eq!(session.pending_actions(), 0);

    Ok(())
}

#[tokio::test]
async fn test_action_without_targets_fails_immediately() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, _forwarded) = ChannelTargets::new(0);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    next_frame(&mut agent).await?;

    send_json(
        &mut agent,
        json!({
            "command": "action",
            "data": { "id": "7", "name": "click_continue", "data": "{}" }
        }),
    )
    .await?;

    let frame = next_frame(&mut agent).await?;
    assert_eq!(frame["command"], "action/result");
    assert_eq!(frame["data"]["id"], "7");
    assert_eq!(frame["data"]["success"], false);
    assert!(
        frame["data"]["message"]
            .as_str()
            .is_some_and(|m| m.contains("click_continue"))
    );

    assert!(maybe_frame(&mut agent, Duration::from_millis(200)).await?.is_none());
    assert_eq!(session.pending_actions(), 0);

    Ok(())
}

#[tokio::test]
async fn test_bad_frames_are_dropped() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, mut forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    next_frame(&mut agent).await?;

    agent.send(Message::Text("not json".to_string().into())).await?;
    send_json(&mut agent, json!({ "command": "action", "data": { "name": "submit_answer" } }))
        .await?;
    send_json(&mut agent, json!({ "command": "action", "data": { "id": "1", "name": "dance" } }))
        .await?;
    send_json(&mut agent, json!({ "command": "status", "data": { "busy": true } })).await?;
    send_json(&mut agent, json!({ "command": "mystery" })).await?;

    // None of the above gets a reply or reaches the page.
    assert!(maybe_frame(&mut agent, Duration::from_millis(300)).await?.is_none());
    assert!(forwarded.try_recv().is_err());
    assert!(session.is_connected());

    Ok(())
}

#[tokio::test]
async fn test_empty_command_is_rejected() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, _forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    next_frame(&mut agent).await?;

    assert!(!session.send_to_agent(Frame::new("")).await);
    assert!(!session.send_to_agent(Frame::new("   ")).await);
    assert!(session.send_to_agent(Frame::new("context")).await);

    // The valid frame is the first thing written after startup.
    let frame = next_frame(&mut agent).await?;
    assert_eq!(frame, json!({ "command": "context", "game": "Duolingo" }));

    Ok(())
}

#[tokio::test]
async fn test_connection_lost_fires_once() -> Result<()> {
    init_tracing();
    // Bind then drop to get a port nothing listens on.
    let (listener, url) = bind_agent().await?;
    drop(listener);

    let (targets, _forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));
    let mut events = session.subscribe();

    session.connect();

    let mut lost = Vec::new();
    loop {
        let event = timeout(WAIT, events.recv())
            .await
            .context("event did not arrive")??;
        match event {
            SessionEvent::ConnectionLost { attempts } => lost.push(attempts),
            SessionEvent::Reconnecting { attempt, .. } if attempt >= 8 => break,
            SessionEvent::Connected { .. } => bail!("nothing should accept the connection"),
            _ => {}
        }
    }

    assert_eq!(lost, [5]);

    let state = session.state();
    assert!(state.connection_lost);
    assert!(state.reconnect_attempts >= 8);
    assert_eq!(state.connection_state, ConnectionState::Reconnecting);

    session.close().await;
    assert_eq!(session.state().connection_state, ConnectionState::Disconnected);

    Ok(())
}

#[tokio::test]
async fn test_reconnect_restores_and_reregisters() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, _forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));
    let mut events = session.subscribe();

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    next_frame(&mut agent).await?;

    assert!(session.register_actions(ActionSchema::defaults()).await);
    let register = next_frame(&mut agent).await?;
    assert_eq!(register["command"], "actions/register");

    // Agent goes away.
    agent.close(None).await?;
    drop(agent);

    let reconnecting =
        wait_for_event(&mut events, |e| matches!(e, SessionEvent::Reconnecting { .. })).await?;
    assert!(matches!(reconnecting, SessionEvent::Reconnecting { attempt: 1, .. }));

    let mut agent = accept_agent(&listener).await?;
    let restored = wait_for_event(&mut events, |e| matches!(e, SessionEvent::Connected { .. })).await?;
    assert_eq!(restored, SessionEvent::Connected { restored: true });
    assert!(restored.is_escalation());

    let state = session.state();
    assert_eq!(state.reconnect_attempts, 0);
    assert!(!state.connection_lost);
    assert_eq!(state.epoch.as_u64(), 2);

    assert_eq!(next_frame(&mut agent).await?["command"], "startup");
    let register = next_frame(&mut agent).await?;
    assert_eq!(register["command"], "actions/register");
    assert_eq!(register["data"]["actions"].as_array().map(Vec::len), Some(2));

    Ok(())
}

#[tokio::test]
async fn test_idle_connection_is_pinged() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let config = SessionConfig::builder()
        .endpoint(url.as_str())
        .liveness(
            LivenessConfig::default()
                .with_period(Duration::from_millis(50))
                .with_idle_threshold(Duration::from_millis(50)),
        )
        .build()?;
    let (targets, _forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config, Arc::new(targets));

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    assert_eq!(next_frame(&mut agent).await?["command"], "startup");

    let ping = next_frame(&mut agent).await?;
    assert_eq!(ping, json!({ "command": "ping", "game": "Duolingo" }));

    Ok(())
}

#[tokio::test]
async fn test_frame_handlers_see_inbound_frames() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, _forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));

    let (seen_tx, mut seen) = mpsc::unbounded_channel();
    session.on_agent_frame(move |frame| {
        let _ = seen_tx.send(frame.command.clone());
    });

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    next_frame(&mut agent).await?;

    send_json(&mut agent, json!({ "command": "status" })).await?;

    let command = timeout(WAIT, seen.recv()).await?.context("handler not called")?;
    assert_eq!(command, "status");

    Ok(())
}

#[tokio::test]
async fn test_handler_can_add_handlers() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, _forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));

    let (seen_tx, mut seen) = mpsc::unbounded_channel();
    let added = AtomicBool::new(false);
    let handle = session.clone();
    session.on_agent_frame(move |_| {
        if !added.swap(true, Ordering::SeqCst) {
            let seen_tx = seen_tx.clone();
            handle.on_agent_frame(move |frame| {
                let _ = seen_tx.send(frame.command.clone());
            });
        }
    });

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    next_frame(&mut agent).await?;

    send_json(&mut agent, json!({ "command": "status" })).await?;
    send_json(&mut agent, json!({ "command": "mystery" })).await?;

    // The added handler starts with the frame after the one that added it.
    let command = timeout(WAIT, seen.recv()).await?.context("handler not called")?;
    assert_eq!(command, "mystery");
    assert!(session.is_connected());

    Ok(())
}

#[tokio::test]
async fn test_unknown_action_names_are_not_registered() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, _forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));
    let mut events = session.subscribe();

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    next_frame(&mut agent).await?;

    let dance = ActionSchema {
        name: "dance".to_string(),
        description: "Dance a little".to_string(),
        schema: None,
    };
    assert!(!session.register_actions(vec![dance.clone()]).await);
    assert!(maybe_frame(&mut agent, Duration::from_millis(200)).await?.is_none());

    let mut actions = ActionSchema::defaults();
    actions.push(dance);
    assert!(session.register_actions(actions).await);

    let register = next_frame(&mut agent).await?;
    let names: Vec<&str> = register["data"]["actions"]
        .as_array()
        .context("actions array")?
        .iter()
        .filter_map(|a| a["name"].as_str())
        .collect();
    assert_eq!(names, ["submit_answer", "click_continue"]);

    // The refused name is not announced again after a reconnect either.
    agent.close(None).await?;
    drop(agent);
    let mut agent = accept_agent(&listener).await?;
    wait_for_event(&mut events, |e| matches!(e, SessionEvent::Connected { .. })).await?;
    assert_eq!(next_frame(&mut agent).await?["command"], "startup");
    let register = next_frame(&mut agent).await?;
    assert_eq!(register["data"]["actions"].as_array().map(Vec::len), Some(2));

    Ok(())
}

#[tokio::test]
async fn test_result_from_previous_connection_is_dropped() -> Result<()> {
    init_tracing();
    let (listener, url) = bind_agent().await?;
    let (targets, mut forwarded) = ChannelTargets::new(1);
    let session = AgentSession::new(config(&url)?, Arc::new(targets));
    let mut events = session.subscribe();

    session.connect();
    let mut agent = accept_agent(&listener).await?;
    next_frame(&mut agent).await?;

    send_json(
        &mut agent,
        json!({
            "command": "action",
            "data": { "id": "42", "name": "click_continue" }
        }),
    )
    .await?;
    let request = timeout(WAIT, forwarded.recv())
        .await?
        .context("request not forwarded")?;
    assert_eq!(session.pending_actions(), 1);

    // The connection drops before the page answers.
    agent.close(None).await?;
    drop(agent);
    let mut agent = accept_agent(&listener).await?;
    let restored = wait_for_event(&mut events, |e| matches!(e, SessionEvent::Connected { .. })).await?;
    assert_eq!(restored, SessionEvent::Connected { restored: true });
    assert_eq!(next_frame(&mut agent).await?["command"], "startup");
    assert_eq!(session.pending_actions(), 0);

    let late = ActionResult::success(request.id, "Clicked continue");
    assert!(!session.report_action_result(late).await);
    assert!(maybe_frame(&mut agent, Duration::from_millis(200)).await?.is_none());

    Ok(())
}
