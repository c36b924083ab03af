//! Bridge configuration
//!
//! Settings for the session coordinator and the reconnect supervisor. Both
//! structures deserialize from TOML/JSON and offer builder-style setters.

use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::{CoordinatorError, MapResult};

// ----------------------------------------------------------------------------
// Coordinator Configuration
// ----------------------------------------------------------------------------

/// Configuration for the session coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinatorConfig {
    /// Upper bound on the transport connect; elapse counts as unavailability.
    /// `None` leaves timing entirely to the caller.
    pub connect_timeout: Option<Duration>,
    /// Unregister notifications before releasing the outbound session
    pub unregister_on_disconnect: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            unregister_on_disconnect: true,
        }
    }
}

impl CoordinatorConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set connect timeout
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    /// Enable or disable notification unregistration on disconnect
    pub fn with_unregister_on_disconnect(mut self, enabled: bool) -> Self {
        self.unregister_on_disconnect = enabled;
        self
    }

    /// Reject settings the runtime cannot honour
    pub fn validate(&self) -> MapResult<()> {
        if self.connect_timeout == Some(Duration::ZERO) {
            return Err(CoordinatorError::Config(
                "connect_timeout must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Reconnect Configuration
// ----------------------------------------------------------------------------

/// Backoff policy for reconnecting after transient unavailability
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectConfig {
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Cap on the doubled delay
    pub max_backoff: Duration,
    /// Give up after this many attempts (`None` = keep trying)
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
            max_attempts: Some(10),
        }
    }
}

impl ReconnectConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first retry delay
    pub fn with_initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = backoff;
        self
    }

    /// Set the maximum retry delay
    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    /// Limit the number of attempts per device status change
    pub fn with_max_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_attempts = attempts;
        self
    }

    /// Delay to wait after the given (1-based) failed attempt
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.saturating_sub(1).min(16);
        self.initial_backoff
            .saturating_mul(1u32 << shift)
            .min(self.max_backoff)
    }

    /// Whether another attempt is allowed after `attempts` have been made
    pub fn allows_attempt(&self, attempts: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempts < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CoordinatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = CoordinatorConfig::new().with_connect_timeout(Duration::ZERO);
        assert!(matches!(config.validate(), Err(CoordinatorError::Config(_))));
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let config = ReconnectConfig::new()
            .with_initial_backoff(Duration::from_millis(100))
            .with_max_backoff(Duration::from_millis(500));

        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(400));
        assert_eq!(config.backoff_for(4), Duration::from_millis(500));
        assert_eq!(config.backoff_for(40), Duration::from_millis(500));
    }

    #[test]
    fn test_attempt_limit() {
        let limited = ReconnectConfig::new().with_max_attempts(Some(2));
        assert!(limited.allows_attempt(0));
        assert!(limited.allows_attempt(1));
        assert!(!limited.allows_attempt(2));

        let unlimited = ReconnectConfig::new().with_max_attempts(None);
        assert!(unlimited.allows_attempt(u32::MAX - 1));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CoordinatorConfig =
            serde_json::from_str(r#"{ "unregister_on_disconnect": false }"#).unwrap();
        assert!(!config.unregister_on_disconnect);
        assert!(config.connect_timeout.is_none());
    }
}
