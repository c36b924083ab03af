//! Simulated bridge run
//!
//! Wires a [`SessionCoordinator`] to a simulated phone, drives it through a
//! connect, a link drop and a reconnect, and reports what reached the sink.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::mpsc;
use tokio::time::{sleep, Instant};
use tracing::{debug, info};

use mapbridge_core::{Message, NotificationSink};
use mapbridge_harness::{ConnectFailure, MockDevice, MockInboundSession, MockSetup, RecordingSink};
use mapbridge_runtime::{
    BridgeStatsSnapshot, ConnectionState, CoordinatorBuilder, DeviceId, DeviceStatus,
    ReconnectSupervisor, SessionCoordinator,
};

use crate::config::AppConfig;
use crate::error::{CliError, Result};

// ----------------------------------------------------------------------------
// Simulation Options and Report
// ----------------------------------------------------------------------------

/// Parameters of one simulated run
#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub device: String,
    pub messages: usize,
    pub unreachable: u32,
}

/// Outcome of a simulated run, printed as JSON
#[derive(Debug, Clone, Serialize)]
pub struct SimulationReport {
    pub device: String,
    pub delivered: Vec<Message>,
    pub stats: BridgeStatsSnapshot,
    pub final_state: ConnectionState,
}

/// Sink that logs each message before recording it
struct ConsoleSink {
    recorder: Arc<RecordingSink>,
}

impl NotificationSink for ConsoleSink {
    fn show_message_notification(&self, message: Message) {
        info!(
            "New message {} from {}: {}",
            message.handle, message.originator, message.body
        );
        self.recorder.show_message_notification(message);
    }
}

// ----------------------------------------------------------------------------
// Simulation
// ----------------------------------------------------------------------------

/// Run the bridge against a simulated phone
pub async fn run_simulation(
    config: &AppConfig,
    options: &SimulationOptions,
) -> Result<SimulationReport> {
    let device_id = DeviceId::from_str(&options.device)
        .map_err(|e| CliError::InvalidDevice(format!("{}: {}", options.device, e)))?;
    let settle = config.simulation.settle_timeout();

    let device = MockDevice::new(device_id, config.simulation.device_config());
    for _ in 0..options.unreachable {
        device.fail_next_connect(ConnectFailure::Unavailable);
    }

    // One extra message is pushed after the reconnect
    let handles: Vec<String> = (1..=options.messages + 1)
        .map(|n| format!("M{:04}", n))
        .collect();
    let handle_refs: Vec<&str> = handles.iter().map(String::as_str).collect();
    let setup = MockSetup::with_parts(
        device,
        MockInboundSession::new(config.simulation.event_buffer),
    )
    .with_messages(&handle_refs);

    let sink = Arc::new(ConsoleSink {
        recorder: setup.sink.clone(),
    });
    let coordinator = Arc::new(
        CoordinatorBuilder::new(device_id)
            .with_config(config.coordinator.clone())
            .outbound_factory(setup.device.session_factory())
            .inbound_session(setup.server.clone())
            .notification_sink(sink)
            .build()?,
    );

    let (status_tx, status_rx) = mpsc::channel(8);
    let supervisor =
        ReconnectSupervisor::new(coordinator.clone(), config.reconnect.clone()).spawn(status_rx);

    info!("Phone {} is in range", device_id);
    send_status(&status_tx, DeviceStatus::Connected).await?;
    wait_for_state(&coordinator, ConnectionState::Connected, settle).await?;

    let connection = setup
        .server
        .accept_connection()
        .ok_or_else(|| CliError::Simulation("notification server is not running".into()))?;
    if !connection.wait_for_listener(settle).await {
        return Err(CliError::Simulation(
            "bridge never listened on the notification connection".into(),
        ));
    }

    let (before, after) = handles.split_at(options.messages);
    for handle in before {
        debug!("Phone pushes new-message event {}", handle);
        connection.notify(handle.as_str());
    }
    wait_for_delivery(&setup.sink, before.len(), settle).await?;

    info!("Phone {} dropped the link", device_id);
    send_status(&status_tx, DeviceStatus::Disconnected).await?;
    wait_for_state(&coordinator, ConnectionState::Disconnected, settle).await?;

    info!("Phone {} is back", device_id);
    send_status(&status_tx, DeviceStatus::Connected).await?;
    wait_for_state(&coordinator, ConnectionState::Connected, settle).await?;

    for handle in after {
        connection.notify(handle.as_str());
    }
    wait_for_delivery(&setup.sink, handles.len(), settle).await?;

    coordinator.dispose().await;
    drop(status_tx);
    supervisor
        .await
        .map_err(|e| CliError::Simulation(format!("supervisor task failed: {}", e)))?;

    Ok(SimulationReport {
        device: device_id.to_string(),
        delivered: setup.sink.messages(),
        stats: coordinator.stats(),
        final_state: coordinator.state().await,
    })
}

async fn send_status(status: &mpsc::Sender<DeviceStatus>, update: DeviceStatus) -> Result<()> {
    status
        .send(update)
        .await
        .map_err(|_| CliError::Simulation("reconnect supervisor stopped".into()))
}

async fn wait_for_state(
    coordinator: &SessionCoordinator,
    expected: ConnectionState,
    limit: Duration,
) -> Result<()> {
    let deadline = Instant::now() + limit;
    loop {
        let state = coordinator.state().await;
        if state == expected {
            return Ok(());
        }
        if Instant::now() >= deadline {
            return Err(CliError::Simulation(format!(
                "bridge stayed {} instead of becoming {}",
                state, expected
            )));
        }
        sleep(Duration::from_millis(5)).await;
    }
}

async fn wait_for_delivery(sink: &RecordingSink, count: usize, limit: Duration) -> Result<()> {
    if sink.wait_for(count, limit).await {
        Ok(())
    } else {
        Err(CliError::Simulation(format!(
            "only {} of {} messages were delivered",
            sink.len(),
            count
        )))
    }
}
