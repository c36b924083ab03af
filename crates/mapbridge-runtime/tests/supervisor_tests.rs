//! Reconnect supervisor tests

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use mapbridge_harness::{ConnectFailure, MockSetup};
use mapbridge_runtime::{
    ConnectionState, DeviceStatus, ReconnectConfig, ReconnectSupervisor, SessionCoordinator,
};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout, Instant};

fn create_coordinator(setup: &MockSetup) -> Arc<SessionCoordinator> {
    Arc::new(SessionCoordinator::new(
        setup.device.device_id(),
        setup.device.session_factory(),
        setup.server.clone(),
        setup.sink.clone(),
    ))
}

fn fast_backoff() -> ReconnectConfig {
    ReconnectConfig::new()
        .with_initial_backoff(Duration::from_millis(5))
        .with_max_backoff(Duration::from_millis(20))
        .with_max_attempts(Some(5))
}

async fn wait_for_state(coordinator: &SessionCoordinator, expected: ConnectionState) -> bool {
    let deadline = Instant::now() + Duration::from_secs(2);
    while Instant::now() < deadline {
        if coordinator.state().await == expected {
            return true;
        }
        sleep(Duration::from_millis(2)).await;
    }
    false
}

#[tokio::test]
async fn test_supervisor_follows_device_status() {
    let setup = MockSetup::new();
    let coordinator = create_coordinator(&setup);
    let (status_tx, status_rx) = mpsc::channel(8);
    let task = ReconnectSupervisor::new(coordinator.clone(), fast_backoff()).spawn(status_rx);

    status_tx.send(DeviceStatus::Connected).await.unwrap();
    assert!(wait_for_state(&coordinator, ConnectionState::Connected).await);

    status_tx.send(DeviceStatus::Disconnected).await.unwrap();
    assert!(wait_for_state(&coordinator, ConnectionState::Disconnected).await);

    status_tx.send(DeviceStatus::Connected).await.unwrap();
    assert!(wait_for_state(&coordinator, ConnectionState::Connected).await);
    assert_eq!(setup.server.stats().start_calls.load(Ordering::SeqCst), 1);

    drop(status_tx);
    timeout(Duration::from_secs(1), task)
        .await
        .expect("supervisor should stop when status channel closes")
        .unwrap();
}

#[tokio::test]
async fn test_supervisor_retries_unavailable_device() {
    let setup = MockSetup::new();
    setup.device.fail_next_connect(ConnectFailure::Unavailable);
    setup.device.fail_next_connect(ConnectFailure::Unavailable);
    let coordinator = create_coordinator(&setup);
    let (status_tx, status_rx) = mpsc::channel(8);
    let _task = ReconnectSupervisor::new(coordinator.clone(), fast_backoff()).spawn(status_rx);

    status_tx.send(DeviceStatus::Connected).await.unwrap();

    assert!(wait_for_state(&coordinator, ConnectionState::Connected).await);
    assert_eq!(setup.device.stats().connect_calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_supervisor_gives_up_after_max_attempts() {
    let setup = MockSetup::new();
    for _ in 0..4 {
        setup.device.fail_next_connect(ConnectFailure::Unavailable);
    }
    let coordinator = create_coordinator(&setup);
    let (status_tx, status_rx) = mpsc::channel(8);
    let config = fast_backoff().with_max_attempts(Some(2));
    let _task = ReconnectSupervisor::new(coordinator.clone(), config).spawn(status_rx);

    status_tx.send(DeviceStatus::Connected).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(setup.device.stats().connect_calls.load(Ordering::SeqCst), 2);
    assert_eq!(coordinator.state().await, ConnectionState::Disconnected);

    // A later status change starts a fresh cycle
    status_tx.send(DeviceStatus::Connected).await.unwrap();
    sleep(Duration::from_millis(100)).await;
    assert_eq!(setup.device.stats().connect_calls.load(Ordering::SeqCst), 4);
    assert_eq!(coordinator.state().await, ConnectionState::Disconnected);

    status_tx.send(DeviceStatus::Connected).await.unwrap();
    assert!(wait_for_state(&coordinator, ConnectionState::Connected).await);
}

#[tokio::test]
async fn test_supervisor_does_not_retry_fatal_errors() {
    let setup = MockSetup::new();
    setup.device.fail_next_connect(ConnectFailure::Handshake);
    let coordinator = create_coordinator(&setup);
    let (status_tx, status_rx) = mpsc::channel(8);
    let _task = ReconnectSupervisor::new(coordinator.clone(), fast_backoff()).spawn(status_rx);

    status_tx.send(DeviceStatus::Connected).await.unwrap();
    sleep(Duration::from_millis(100)).await;

    assert_eq!(setup.device.stats().connect_calls.load(Ordering::SeqCst), 1);
    assert_eq!(coordinator.state().await, ConnectionState::Disconnected);
}

#[tokio::test]
async fn test_disconnect_interrupts_backoff() {
    let setup = MockSetup::new();
    for _ in 0..10 {
        setup.device.fail_next_connect(ConnectFailure::Unavailable);
    }
    let coordinator = create_coordinator(&setup);
    let (status_tx, status_rx) = mpsc::channel(8);
    let config = ReconnectConfig::new()
        .with_initial_backoff(Duration::from_millis(200))
        .with_max_backoff(Duration::from_secs(1))
        .with_max_attempts(None);
    let _task = ReconnectSupervisor::new(coordinator.clone(), config).spawn(status_rx);

    status_tx.send(DeviceStatus::Connected).await.unwrap();
    sleep(Duration::from_millis(50)).await;
    status_tx.send(DeviceStatus::Disconnected).await.unwrap();
    sleep(Duration::from_millis(400)).await;

    assert_eq!(setup.device.stats().connect_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_supervisor_stops_after_dispose() {
    let setup = MockSetup::new();
    let coordinator = create_coordinator(&setup);
    let (status_tx, status_rx) = mpsc::channel(8);
    let task = ReconnectSupervisor::new(coordinator.clone(), fast_backoff()).spawn(status_rx);

    coordinator.dispose().await;
    status_tx.send(DeviceStatus::Connected).await.unwrap();

    timeout(Duration::from_secs(1), task)
        .await
        .expect("supervisor should stop once the coordinator is disposed")
        .unwrap();
    assert_eq!(setup.device.stats().sessions_created.load(Ordering::SeqCst), 0);
}
