//! Mock Device and Outbound Session
//!
//! A deterministic stand-in for a paired phone's message access server.
//! Tests script connect outcomes and per-handle fetch failures, store
//! messages, and afterwards inspect how the coordinator used the sessions.

use mapbridge_core::{
    DeviceId, Message, MessageHandle, OutboundSession, OutboundSessionFactory, SessionError,
};
use std::{
    collections::{HashMap, HashSet, VecDeque},
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex, MutexGuard,
    },
};
use tokio::time::{sleep, Duration};
use tracing::debug;

// ----------------------------------------------------------------------------
// Mock Device Configuration
// ----------------------------------------------------------------------------

/// Simulated latencies of the remote device
#[derive(Debug, Clone)]
pub struct MockDeviceConfig {
    /// Time the transport connect takes
    pub connect_latency: Duration,
    /// Time a message fetch takes
    pub fetch_latency: Duration,
}

impl Default for MockDeviceConfig {
    fn default() -> Self {
        Self::ideal()
    }
}

impl MockDeviceConfig {
    /// No latency at all
    pub fn ideal() -> Self {
        Self {
            connect_latency: Duration::ZERO,
            fetch_latency: Duration::ZERO,
        }
    }

    /// Latencies in the range a real phone shows over RFCOMM
    pub fn realistic() -> Self {
        Self {
            connect_latency: Duration::from_millis(40),
            fetch_latency: Duration::from_millis(15),
        }
    }
}

/// Scripted outcome of a connect attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectFailure {
    Unavailable,
    Handshake,
    Capability,
}

impl ConnectFailure {
    fn to_error(self, device: &DeviceId) -> SessionError {
        match self {
            ConnectFailure::Unavailable => {
                SessionError::unavailable(format!("{} is out of range", device))
            }
            ConnectFailure::Handshake => {
                SessionError::Handshake(format!("{} rejected the connect request", device))
            }
            ConnectFailure::Capability => {
                SessionError::Capability(format!("{} has no message access service", device))
            }
        }
    }
}

// ----------------------------------------------------------------------------
// Mock Device
// ----------------------------------------------------------------------------

#[derive(Debug, Default)]
struct DeviceState {
    messages: HashMap<MessageHandle, Message>,
    connect_script: VecDeque<ConnectFailure>,
    enable_failures: VecDeque<SessionError>,
    failing_handles: HashSet<MessageHandle>,
    fetch_calls: HashMap<MessageHandle, u32>,
    registrations: Vec<bool>,
}

/// Observed usage of the device's sessions
#[derive(Debug, Default)]
pub struct MockDeviceStats {
    pub sessions_created: AtomicU64,
    pub sessions_live: AtomicU64,
    pub max_sessions_live: AtomicU64,
    pub connect_calls: AtomicU64,
    pub dispose_calls: AtomicU64,
}

/// Simulated remote phone
#[derive(Clone)]
pub struct MockDevice {
    device_id: DeviceId,
    config: MockDeviceConfig,
    state: Arc<Mutex<DeviceState>>,
    stats: Arc<MockDeviceStats>,
}

impl MockDevice {
    pub fn new(device_id: DeviceId, config: MockDeviceConfig) -> Self {
        Self {
            device_id,
            config,
            state: Arc::new(Mutex::new(DeviceState::default())),
            stats: Arc::new(MockDeviceStats::default()),
        }
    }

    /// A device with no simulated latency
    pub fn ideal(device_id: DeviceId) -> Self {
        Self::new(device_id, MockDeviceConfig::ideal())
    }

    pub fn device_id(&self) -> DeviceId {
        self.device_id
    }

    /// Store a message the device can serve
    pub fn store_message(&self, message: Message) {
        self.lock().messages.insert(message.handle.clone(), message);
    }

    /// Make the next connect attempt fail
    pub fn fail_next_connect(&self, failure: ConnectFailure) {
        self.lock().connect_script.push_back(failure);
    }

    /// Make the next notification registration fail
    pub fn fail_next_registration(&self, error: SessionError) {
        self.lock().enable_failures.push_back(error);
    }

    /// Make every fetch of this handle fail
    pub fn fail_fetch(&self, handle: impl Into<MessageHandle>) {
        self.lock().failing_handles.insert(handle.into());
    }

    /// Number of fetches requested for a handle
    pub fn fetch_count(&self, handle: &MessageHandle) -> u32 {
        self.lock().fetch_calls.get(handle).copied().unwrap_or(0)
    }

    /// Registration requests in order (`true` = enable)
    pub fn registrations(&self) -> Vec<bool> {
        self.lock().registrations.clone()
    }

    pub fn stats(&self) -> &MockDeviceStats {
        &self.stats
    }

    /// Factory handing out sessions bound to this device
    pub fn session_factory(&self) -> Arc<dyn OutboundSessionFactory> {
        Arc::new(self.clone())
    }

    fn lock(&self) -> MutexGuard<'_, DeviceState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn session_opened(&self) {
        self.stats.sessions_created.fetch_add(1, Ordering::SeqCst);
        let live = self.stats.sessions_live.fetch_add(1, Ordering::SeqCst) + 1;
        self.stats.max_sessions_live.fetch_max(live, Ordering::SeqCst);
    }

    fn session_closed(&self) {
        self.stats.sessions_live.fetch_sub(1, Ordering::SeqCst);
        self.stats.dispose_calls.fetch_add(1, Ordering::SeqCst);
    }
}

impl OutboundSessionFactory for MockDevice {
    fn create(&self, device: &DeviceId) -> Arc<dyn OutboundSession> {
        debug!("Mock device: opening session for {}", device);
        self.session_opened();
        Arc::new(MockOutboundSession::new(self.clone()))
    }
}

// ----------------------------------------------------------------------------
// Mock Outbound Session
// ----------------------------------------------------------------------------

/// Outbound session served by a [`MockDevice`]
pub struct MockOutboundSession {
    device: MockDevice,
    connected: AtomicBool,
    disposed: AtomicBool,
}

impl MockOutboundSession {
    fn new(device: MockDevice) -> Self {
        Self {
            device,
            connected: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        }
    }

    fn check_usable(&self) -> Result<(), SessionError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SessionError::Disposed);
        }
        if !self.connected.load(Ordering::SeqCst) {
            return Err(SessionError::NotConnected);
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl OutboundSession for MockOutboundSession {
    async fn connect(&self) -> Result<(), SessionError> {
        if self.disposed.load(Ordering::SeqCst) {
            return Err(SessionError::Disposed);
        }
        self.device.stats.connect_calls.fetch_add(1, Ordering::SeqCst);

        sleep(self.device.config.connect_latency).await;

        let scripted = self.device.lock().connect_script.pop_front();
        if let Some(failure) = scripted {
            return Err(failure.to_error(&self.device.device_id));
        }

        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn set_notification_registration(&self, enabled: bool) -> Result<(), SessionError> {
        self.check_usable()?;

        let mut state = self.device.lock();
        if enabled {
            if let Some(error) = state.enable_failures.pop_front() {
                return Err(error);
            }
        }
        state.registrations.push(enabled);
        Ok(())
    }

    async fn get_message(&self, handle: &MessageHandle) -> Result<Message, SessionError> {
        self.check_usable()?;
        *self
            .device
            .lock()
            .fetch_calls
            .entry(handle.clone())
            .or_insert(0) += 1;

        sleep(self.device.config.fetch_latency).await;

        // The session may have been released while the fetch was in flight
        self.check_usable()?;

        let state = self.device.lock();
        if state.failing_handles.contains(handle) {
            return Err(SessionError::protocol(format!("fetch of {} rejected", handle)));
        }
        state
            .messages
            .get(handle)
            .cloned()
            .ok_or_else(|| SessionError::protocol(format!("no message with handle {}", handle)))
    }

    async fn dispose(&self) {
        if !self.disposed.swap(true, Ordering::SeqCst) {
            self.connected.store(false, Ordering::SeqCst);
            self.device.session_closed();
        }
    }
}
