//! Mock Notification Server
//!
//! Inbound session whose incoming connections are created on demand by the
//! test, standing in for the phone dialing back into the notification server.

use mapbridge_core::{
    AcceptedPeer, InboundSession, MessageHandle, MessageReceivedReceiver, NotificationServer,
    PeerAcceptedReceiver, SessionError,
};
use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicBool, AtomicU64, Ordering},
        Arc, Mutex,
    },
};
use tokio::{
    sync::broadcast,
    time::{sleep, Duration, Instant},
};
use tracing::debug;

/// Observed usage of the notification server
#[derive(Debug, Default)]
pub struct MockServerStats {
    pub start_calls: AtomicU64,
    pub dispose_calls: AtomicU64,
    pub connections_accepted: AtomicU64,
}

// ----------------------------------------------------------------------------
// Mock Inbound Session
// ----------------------------------------------------------------------------

/// Scriptable inbound session
pub struct MockInboundSession {
    accepted_tx: Mutex<Option<broadcast::Sender<AcceptedPeer>>>,
    start_failures: Mutex<VecDeque<SessionError>>,
    start_latency: Duration,
    event_buffer: usize,
    running: AtomicBool,
    next_connection: AtomicU64,
    stats: MockServerStats,
}

impl MockInboundSession {
    pub fn new(event_buffer: usize) -> Self {
        let (accepted_tx, _) = broadcast::channel(event_buffer);
        Self {
            accepted_tx: Mutex::new(Some(accepted_tx)),
            start_failures: Mutex::new(VecDeque::new()),
            start_latency: Duration::ZERO,
            event_buffer,
            running: AtomicBool::new(false),
            next_connection: AtomicU64::new(1),
            stats: MockServerStats::default(),
        }
    }

    /// Make `start` take this long
    pub fn with_start_latency(mut self, latency: Duration) -> Self {
        self.start_latency = latency;
        self
    }

    /// Make the next `start` fail
    pub fn fail_next_start(&self, reason: &str) {
        self.start_failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push_back(SessionError::ServerStart(reason.to_string()));
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn stats(&self) -> &MockServerStats {
        &self.stats
    }

    /// Simulate the device opening a notification connection
    ///
    /// Returns `None` if the server is not running.
    pub fn accept_connection(&self) -> Option<Arc<MockNotificationServer>> {
        if !self.is_running() {
            return None;
        }

        let id = self.next_connection.fetch_add(1, Ordering::SeqCst);
        let connection = Arc::new(MockNotificationServer::new(id, self.event_buffer));

        let sender = self.sender()?;
        let peer: AcceptedPeer = connection.clone();
        if sender.send(peer).is_err() {
            debug!("Mock server: connection {} accepted with no listener", id);
        }
        self.stats
            .connections_accepted
            .fetch_add(1, Ordering::SeqCst);

        Some(connection)
    }

    fn sender(&self) -> Option<broadcast::Sender<AcceptedPeer>> {
        self.accepted_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait::async_trait]
impl InboundSession for MockInboundSession {
    async fn start(&self) -> Result<(), SessionError> {
        self.stats.start_calls.fetch_add(1, Ordering::SeqCst);
        sleep(self.start_latency).await;

        let failure = self
            .start_failures
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .pop_front();
        if let Some(error) = failure {
            return Err(error);
        }
        if self.sender().is_none() {
            return Err(SessionError::Disposed);
        }

        self.running.store(true, Ordering::SeqCst);
        debug!("Mock server: started");
        Ok(())
    }

    fn subscribe_peer_accepted(&self) -> PeerAcceptedReceiver {
        match self.sender() {
            Some(sender) => sender.subscribe(),
            // Disposed: hand out a receiver that is already closed
            None => broadcast::channel(1).1,
        }
    }

    async fn dispose(&self) {
        self.stats.dispose_calls.fetch_add(1, Ordering::SeqCst);
        self.running.store(false, Ordering::SeqCst);
        self.accepted_tx
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
    }
}

// ----------------------------------------------------------------------------
// Mock Notification Connection
// ----------------------------------------------------------------------------

/// One accepted notification connection
pub struct MockNotificationServer {
    id: u64,
    received_tx: broadcast::Sender<MessageHandle>,
}

impl MockNotificationServer {
    fn new(id: u64, event_buffer: usize) -> Self {
        let (received_tx, _) = broadcast::channel(event_buffer);
        Self { id, received_tx }
    }

    /// Push a new-message event; returns how many listeners saw it
    pub fn notify(&self, handle: impl Into<MessageHandle>) -> usize {
        self.received_tx.send(handle.into()).unwrap_or(0)
    }

    /// Number of listeners attached to this connection
    pub fn listener_count(&self) -> usize {
        self.received_tx.receiver_count()
    }

    /// Wait until a listener is attached; false on timeout
    pub async fn wait_for_listener(&self, limit: Duration) -> bool {
        let deadline = Instant::now() + limit;
        while self.listener_count() == 0 {
            if Instant::now() >= deadline {
                return false;
            }
            sleep(Duration::from_millis(1)).await;
        }
        true
    }
}

impl NotificationServer for MockNotificationServer {
    fn connection_id(&self) -> u64 {
        self.id
    }

    fn subscribe_message_received(&self) -> MessageReceivedReceiver {
        self.received_tx.subscribe()
    }
}
