//! Session configuration and its builder.
//!
//! Configuration is static: it is built once at process start and shared by
//! the session for its whole lifetime.
//!
//! # Example
//!
//! ```no_run
//! use lingo_bridge::SessionConfig;
//!
//! # fn example() -> lingo_bridge::Result<()> {
//! let config = SessionConfig::builder()
//!     .endpoint("ws://localhost:8000")
//!     .game("Duolingo")
//!     .build()?;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};

use super::options::{LivenessConfig, ReconnectConfig};

// ============================================================================
// Defaults
// ============================================================================

/// Agent endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "ws://localhost:8000";

/// Game identifier placed in outbound frames.
pub const DEFAULT_GAME: &str = "Duolingo";

/// Upper bound for a single connect attempt.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Log entries kept for a monitor that attaches later.
const DEFAULT_LOG_CACHE_CAPACITY: usize = 200;

// ============================================================================
// SessionConfig
// ============================================================================

/// Validated session configuration.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Agent WebSocket endpoint.
    pub endpoint: Url,

    /// Game identifier for outbound frames.
    pub game: String,

    /// Limit for one connect attempt.
    pub connect_timeout: Duration,

    /// Backoff settings.
    pub reconnect: ReconnectConfig,

    /// Keep-alive settings.
    pub liveness: LivenessConfig,

    /// Capacity of the monitor log cache.
    pub log_cache_capacity: usize,
}

impl SessionConfig {
    /// Returns a builder with default settings.
    #[inline]
    #[must_use]
    pub fn builder() -> SessionConfigBuilder {
        SessionConfigBuilder::new()
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            endpoint: Url::parse(DEFAULT_ENDPOINT).expect("default endpoint is a valid URL"),
            game: DEFAULT_GAME.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            reconnect: ReconnectConfig::default(),
            liveness: LivenessConfig::default(),
            log_cache_capacity: DEFAULT_LOG_CACHE_CAPACITY,
        }
    }
}

// ============================================================================
// SessionConfigBuilder
// ============================================================================

/// Builder for [`SessionConfig`].
#[derive(Debug, Clone, Default)]
pub struct SessionConfigBuilder {
    endpoint: Option<String>,
    game: Option<String>,
    connect_timeout: Option<Duration>,
    reconnect: Option<ReconnectConfig>,
    liveness: Option<LivenessConfig>,
    log_cache_capacity: Option<usize>,
}

impl SessionConfigBuilder {
    /// Creates a builder with no overrides.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the agent endpoint (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the game identifier.
    #[inline]
    #[must_use]
    pub fn game(mut self, game: impl Into<String>) -> Self {
        self.game = Some(game.into());
        self
    }

    /// Sets the per-attempt connect timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Sets the backoff settings.
    #[inline]
    #[must_use]
    pub fn reconnect(mut self, reconnect: ReconnectConfig) -> Self {
        self.reconnect = Some(reconnect);
        self
    }

    /// Sets the keep-alive settings.
    #[inline]
    #[must_use]
    pub fn liveness(mut self, liveness: LivenessConfig) -> Self {
        self.liveness = Some(liveness);
        self
    }

    /// Sets how many log entries the monitor cache keeps.
    #[inline]
    #[must_use]
    pub fn log_cache_capacity(mut self, capacity: usize) -> Self {
        self.log_cache_capacity = Some(capacity);
        self
    }

    /// Builds the configuration with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Url`] if the endpoint does not parse
    /// - [`Error::Config`] if the endpoint scheme is not `ws`/`wss`, the
    ///   game name is empty, or a timing option is invalid
    pub fn build(self) -> Result<SessionConfig> {
        let defaults = SessionConfig::default();

        let endpoint = match self.endpoint {
            Some(raw) => Url::parse(&raw)?,
            None => defaults.endpoint,
        };
        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "Endpoint must use ws or wss, got {}",
                endpoint.scheme()
            )));
        }

        let game = self.game.unwrap_or(defaults.game);
        if game.trim().is_empty() {
            return Err(Error::config("Game identifier must not be empty"));
        }

        let connect_timeout = self.connect_timeout.unwrap_or(defaults.connect_timeout);
        if connect_timeout.is_zero() {
            return Err(Error::config("Connect timeout must be greater than zero"));
        }

        let reconnect = self.reconnect.unwrap_or(defaults.reconnect);
        reconnect.validate().map_err(Error::config)?;

        let liveness = self.liveness.unwrap_or(defaults.liveness);
        liveness.validate().map_err(Error::config)?;

        Ok(SessionConfig {
            endpoint,
            game,
            connect_timeout,
            reconnect,
            liveness,
            log_cache_capacity: self
                .log_cache_capacity
                .unwrap_or(defaults.log_cache_capacity),
        })
    }
}

// ============================================================================
// Tests
// ============================================================================
