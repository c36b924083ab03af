//! Bridge CLI Configuration Management
//!
//! Layered loading with figment, in priority order:
//! env vars (`MAPBRIDGE_*`) > configuration file > defaults.
//! Nested keys use a double underscore, e.g.
//! `MAPBRIDGE_COORDINATOR__UNREGISTER_ON_DISCONNECT=false`.

use std::path::Path;
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use mapbridge_core::{CoordinatorConfig, ReconnectConfig};
use mapbridge_harness::MockDeviceConfig;

use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// CLI Application Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for the bridge CLI
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Session coordinator settings
    pub coordinator: CoordinatorConfig,
    /// Reconnect backoff settings
    pub reconnect: ReconnectConfig,
    /// Simulated phone behaviour
    pub simulation: SimulationConfig,
}

/// Behaviour of the simulated phone
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Transport connect latency in milliseconds
    pub connect_latency_ms: u64,
    /// Message fetch latency in milliseconds
    pub fetch_latency_ms: u64,
    /// How long to wait for notifications to be delivered
    pub settle_timeout_ms: u64,
    /// Capacity of the simulated notification server's event channels
    pub event_buffer: usize,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            connect_latency_ms: 40,
            fetch_latency_ms: 15,
            settle_timeout_ms: 5_000,
            event_buffer: 64,
        }
    }
}

impl SimulationConfig {
    pub fn device_config(&self) -> MockDeviceConfig {
        MockDeviceConfig {
            connect_latency: Duration::from_millis(self.connect_latency_ms),
            fetch_latency: Duration::from_millis(self.fetch_latency_ms),
        }
    }

    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_timeout_ms)
    }
}

impl AppConfig {
    /// Load configuration from defaults, an optional file and the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            if !path.exists() {
                return Err(CliError::Config(format!(
                    "configuration file not found: {}",
                    path.display()
                )));
            }
            figment = figment.merge(Toml::file(path));
        }
        let figment = figment.merge(Env::prefixed("MAPBRIDGE_").split("__"));

        let config: AppConfig = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.coordinator
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;

        if self.reconnect.initial_backoff > self.reconnect.max_backoff {
            return Err(CliError::Config(
                "reconnect.initial_backoff exceeds reconnect.max_backoff".into(),
            ));
        }
        if self.simulation.event_buffer == 0 {
            return Err(CliError::Config(
                "simulation.event_buffer must be at least 1".into(),
            ));
        }
        if self.simulation.settle_timeout_ms == 0 {
            return Err(CliError::Config(
                "simulation.settle_timeout_ms must be non-zero".into(),
            ));
        }
        Ok(())
    }

    /// Render the configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
