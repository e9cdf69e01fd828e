//! Timing options for reconnection and keep-alive.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use lingo_bridge::{LivenessConfig, ReconnectConfig};
//!
//! let reconnect = ReconnectConfig::new()
//!     .with_base_interval(Duration::from_secs(5))
//!     .with_max_attempts(3);
//!
//! let liveness = LivenessConfig::new().with_period(Duration::from_secs(10));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// Defaults
// ============================================================================

/// Delay before the first retry.
const DEFAULT_BASE_INTERVAL: Duration = Duration::from_secs(10);

/// Upper bound for any retry delay.
const DEFAULT_MAX_INTERVAL: Duration = Duration::from_secs(60);

/// Backoff multiplier.
const DEFAULT_GROWTH_FACTOR: f64 = 1.5;

/// Exponent at which growth stops.
const DEFAULT_CAP_EXPONENT: u32 = 5;

/// Failures before the "connection lost" escalation.
const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Keep-alive check period.
const DEFAULT_LIVENESS_PERIOD: Duration = Duration::from_secs(15);

/// Inbound silence after which a ping is sent.
const DEFAULT_IDLE_THRESHOLD: Duration = Duration::from_secs(30);

// ============================================================================
// ReconnectConfig
// ============================================================================

/// Backoff and retry-budget settings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectConfig {
    /// Delay after the first failure.
    pub base_interval: Duration,

    /// Ceiling for every delay.
    pub max_interval: Duration,

    /// Multiplier applied per failure.
    pub growth_factor: f64,

    /// Largest exponent applied to `growth_factor`.
    pub cap_exponent: u32,

    /// Failure count that triggers the one-shot "connection lost"
    /// notification. Retries continue afterwards.
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconnectConfig {
    /// Creates the default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            base_interval: DEFAULT_BASE_INTERVAL,
            max_interval: DEFAULT_MAX_INTERVAL,
            growth_factor: DEFAULT_GROWTH_FACTOR,
            cap_exponent: DEFAULT_CAP_EXPONENT,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Sets the first retry delay.
    #[inline]
    #[must_use]
    pub fn with_base_interval(mut self, interval: Duration) -> Self {
        self.base_interval = interval;
        self
    }

    /// Sets the delay ceiling.
    #[inline]
    #[must_use]
    pub fn with_max_interval(mut self, interval: Duration) -> Self {
        self.max_interval = interval;
        self
    }

    /// Sets the backoff multiplier.
    #[inline]
    #[must_use]
    pub fn with_growth_factor(mut self, factor: f64) -> Self {
        self.growth_factor = factor;
        self
    }

    /// Sets the exponent cap.
    #[inline]
    #[must_use]
    pub fn with_cap_exponent(mut self, cap: u32) -> Self {
        self.cap_exponent = cap;
        self
    }

    /// Sets the escalation threshold.
    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.base_interval.is_zero() {
            return Err("Reconnect base interval must be greater than zero".to_string());
        }
        if self.max_interval < self.base_interval {
            return Err("Reconnect max interval must not be below the base interval".to_string());
        }
        if !self.growth_factor.is_finite() || self.growth_factor < 1.0 {
            return Err("Reconnect growth factor must be a finite value of at least 1".to_string());
        }
        if self.max_attempts == 0 {
            return Err("Reconnect max attempts must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// LivenessConfig
// ============================================================================

/// Keep-alive settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessConfig {
    /// How often the monitor checks for silence.
    pub period: Duration,

    /// Silence after which a `ping` frame is sent.
    pub idle_threshold: Duration,
}

impl Default for LivenessConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl LivenessConfig {
    /// Creates the default settings.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            period: DEFAULT_LIVENESS_PERIOD,
            idle_threshold: DEFAULT_IDLE_THRESHOLD,
        }
    }

    /// Sets the check period.
    #[inline]
    #[must_use]
    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    /// Sets the silence threshold.
    #[inline]
    #[must_use]
    pub fn with_idle_threshold(mut self, threshold: Duration) -> Self {
        self.idle_threshold = threshold;
        self
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.period.is_zero() {
            return Err("Liveness period must be greater than zero".to_string());
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reconnect_defaults() {
        let config = ReconnectConfig::default();
        assert_eq!(config.base_interval, Duration::from_secs(10));
        assert_eq!(config.max_interval, Duration::from_secs(60));
        assert_eq!(config.growth_factor, 1.5);
        assert_eq!(config.max_attempts, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_reconnect_validation() {
        let config = ReconnectConfig::new().with_base_interval(Duration::ZERO);
        assert!(config.validate().is_err());

        let config = ReconnectConfig::new().with_max_interval(Duration::from_secs(1));
        assert!(config.validate().is_err());

        let config = ReconnectConfig::new().with_growth_factor(0.5);
        assert!(config.validate().is_err());

        let config = ReconnectConfig::new().with_max_attempts(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_liveness_builder() {
        let config = LivenessConfig::new()
            .with_period(Duration::from_secs(5))
            .with_idle_threshold(Duration::from_secs(20));
        assert_eq!(config.period, Duration::from_secs(5));
        assert_eq!(config.idle_threshold, Duration::from_secs(20));
        assert!(config.validate().is_ok());
        assert!(
            LivenessConfig::new()
                .with_period(Duration::ZERO)
                .validate()
                .is_err()
        );
    }
}
