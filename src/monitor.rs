//! Feed for an attached monitoring UI.
//!
//! The session pushes status updates and human-readable log lines into a
//! [`MonitorFeed`]. A UI may attach at any time: it pulls the last N cached
//! entries and then follows live events on a broadcast receiver. Delivery is
//! best effort; a missing or lagging UI never blocks the session.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;

use crate::session::ConnectionState;

// ============================================================================
// Constants
// ============================================================================

/// Capacity of the live event channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

// ============================================================================
// Types
// ============================================================================

/// Severity of a log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Routine activity.
    Info,
    /// Something went wrong but the session continues.
    Warning,
    /// A failure the user should see.
    Error,
}

/// One human-readable log line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    /// Severity.
    pub level: LogLevel,
    /// Text.
    pub message: String,
}

/// Event delivered to the monitoring UI.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MonitorEvent {
    /// Connection state changed.
    StatusUpdate {
        /// New state.
        state: ConnectionState,
        /// Consecutive failed attempts.
        reconnect_attempts: u32,
    },
    /// A new log line.
    NewLog {
        /// The entry.
        entry: LogEntry,
    },
    /// Cached history handed to a UI on attach.
    CachedLog {
        /// Oldest first.
        entries: Vec<LogEntry>,
    },
}

// ============================================================================
// MonitorFeed
// ============================================================================

/// Bounded log cache plus live event channel.
#[derive(Debug)]
pub struct MonitorFeed {
    capacity: usize,
    cache: Mutex<VecDeque<LogEntry>>,
    events: broadcast::Sender<MonitorEvent>,
}

impl MonitorFeed {
    /// Creates a feed keeping at most `capacity` log entries.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            capacity,
            cache: Mutex::new(VecDeque::with_capacity(capacity)),
            events,
        }
    }

    /// Records a log line and forwards it to attached UIs.
    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp_ms: now_ms(),
            level,
            message: message.into(),
        };

        if self.capacity > 0 {
            let mut cache = self.cache.lock();
            if cache.len() == self.capacity {
                cache.pop_front();
            }
            cache.push_back(entry.clone());
        }

        // No receiver just means no UI is attached.
        let _ = self.events.send(MonitorEvent::NewLog { entry });
    }

    /// Forwards a connection state change to attached UIs.
    pub fn status(&self, state: ConnectionState, reconnect_attempts: u32) {
        let _ = self.events.send(MonitorEvent::StatusUpdate {
            state,
            reconnect_attempts,
        });
    }

    /// Returns the last `limit` cached entries, oldest first.
    #[must_use]
    pub fn recent(&self, limit: usize) -> Vec<LogEntry> {
        let cache = self.cache.lock();
        let skip = cache.len().saturating_sub(limit);
        cache.iter().skip(skip).cloned().collect()
    }

    /// Attaches a UI: returns cached history and a live receiver.
    ///
    /// The receiver is created before the history is read, so no entry
    /// logged in between is missed (it may appear in both).
    #[must_use]
    pub fn attach(&self, limit: usize) -> (MonitorEvent, broadcast::Receiver<MonitorEvent>) {
        let receiver = self.events.subscribe();
        let cached = MonitorEvent::CachedLog {
            entries: self.recent(limit),
        };
        (cached, receiver)
    }
}

/// Wall-clock milliseconds.
fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

// ============================================================================
// Tests
// ============================================================================
