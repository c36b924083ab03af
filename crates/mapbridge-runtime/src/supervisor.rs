//! Reconnect Supervisor
//!
//! Follows the paired device's connection status and drives the coordinator:
//! connect when the device appears (retrying unreachable-device failures with
//! exponential backoff), disconnect when it goes away. Fatal failures stop
//! retrying until the next status change.

use std::sync::Arc;

use mapbridge_core::{CoordinatorError, ReconnectConfig};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::coordinator::SessionCoordinator;

// ----------------------------------------------------------------------------
// Device Status
// ----------------------------------------------------------------------------

/// Link status of the paired device as reported by the transport layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatus {
    Connected,
    Disconnected,
}

/// How a connect cycle ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CycleOutcome {
    Connected,
    GaveUp,
    Fatal,
    Interrupted(DeviceStatus),
    Stop,
}

// ----------------------------------------------------------------------------
// Supervisor
// ----------------------------------------------------------------------------

/// Drives a [`SessionCoordinator`] from device status changes
pub struct ReconnectSupervisor {
    coordinator: Arc<SessionCoordinator>,
    config: ReconnectConfig,
}

impl ReconnectSupervisor {
    pub fn new(coordinator: Arc<SessionCoordinator>, config: ReconnectConfig) -> Self {
        Self {
            coordinator,
            config,
        }
    }

    /// Run the supervisor on its own task
    pub fn spawn(self, status: mpsc::Receiver<DeviceStatus>) -> JoinHandle<()> {
        tokio::spawn(self.run(status))
    }

    /// Process status changes until the channel closes or the coordinator is
    /// disposed
    pub async fn run(self, mut status: mpsc::Receiver<DeviceStatus>) {
        info!("Reconnect supervisor starting for {}", self.coordinator.device());

        let mut pending = status.recv().await;
        while let Some(change) = pending.take() {
            match change {
                DeviceStatus::Connected => match self.connect_cycle(&mut status).await {
                    CycleOutcome::Interrupted(next) => pending = Some(next),
                    CycleOutcome::Stop => break,
                    outcome => debug!("Connect cycle ended: {:?}", outcome),
                },
                DeviceStatus::Disconnected => {
                    if let Err(CoordinatorError::Disposed) = self.coordinator.disconnect().await {
                        break;
                    }
                }
            }

            if pending.is_none() {
                pending = status.recv().await;
            }
        }

        info!("Reconnect supervisor stopped for {}", self.coordinator.device());
    }

    async fn connect_cycle(&self, status: &mut mpsc::Receiver<DeviceStatus>) -> CycleOutcome {
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match self.coordinator.connect().await {
                Ok(true) => return CycleOutcome::Connected,
                Ok(false) => {
                    if !self.config.allows_attempt(attempts) {
                        warn!(
                            "Giving up on {} after {} attempts",
                            self.coordinator.device(),
                            attempts
                        );
                        return CycleOutcome::GaveUp;
                    }
                }
                Err(CoordinatorError::Disposed) => return CycleOutcome::Stop,
                Err(e) => {
                    error!("Connect to {} failed: {}", self.coordinator.device(), e);
                    return CycleOutcome::Fatal;
                }
            }

            let delay = self.config.backoff_for(attempts);
            debug!("Retrying {} in {:?}", self.coordinator.device(), delay);

            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                change = status.recv() => match change {
                    Some(DeviceStatus::Connected) => {}
                    Some(DeviceStatus::Disconnected) => {
                        return CycleOutcome::Interrupted(DeviceStatus::Disconnected);
                    }
                    None => return CycleOutcome::Stop,
                },
            }
        }
    }
}
