//! Notification event bridge
//!
//! Wires the inbound session's events to outbound fetches:
//!
//! - one accept loop per notification server lifetime, listening for
//!   peer-accepted events
//! - one listener per accepted connection, listening for message-received
//! - one short-lived task per notification, fetching the message and handing
//!   it to the sink
//!
//! Every loop exits when the coordinator signals shutdown.

use std::sync::Arc;

use mapbridge_core::{
    AcceptedPeer, BridgeStats, FetchError, MessageHandle, MessageReceivedReceiver,
    NotificationSink, PeerAcceptedReceiver,
};
use tokio::sync::{broadcast::error::RecvError, watch, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, warn};

use crate::state::SessionState;

// ----------------------------------------------------------------------------
// Subscription Handle
// ----------------------------------------------------------------------------

/// The peer-accepted subscription held for the notification server lifetime
#[derive(Debug)]
pub(crate) struct Subscription {
    accept_task: JoinHandle<()>,
}

impl Subscription {
    /// Stop listening for accepted peers
    pub(crate) fn cancel(&self) {
        self.accept_task.abort();
    }
}

// ----------------------------------------------------------------------------
// Event Bridge
// ----------------------------------------------------------------------------

#[derive(Clone)]
pub(crate) struct EventBridge {
    state: Arc<RwLock<SessionState>>,
    sink: Arc<dyn NotificationSink>,
    stats: Arc<BridgeStats>,
    shutdown: watch::Receiver<bool>,
}

impl EventBridge {
    pub(crate) fn new(
        state: Arc<RwLock<SessionState>>,
        sink: Arc<dyn NotificationSink>,
        stats: Arc<BridgeStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            state,
            sink,
            stats,
            shutdown,
        }
    }

    /// Start the accept loop and return its subscription handle
    pub(crate) fn subscribe(&self, accepted: PeerAcceptedReceiver) -> Subscription {
        let bridge = self.clone();
        let accept_task = tokio::spawn(async move { bridge.run_accept_loop(accepted).await });
        Subscription { accept_task }
    }

    async fn run_accept_loop(self, mut accepted: PeerAcceptedReceiver) {
        let stop = wait_for_shutdown(self.shutdown.clone());
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                event = accepted.recv() => match event {
                    Ok(peer) => self.on_peer_accepted(peer),
                    Err(RecvError::Lagged(missed)) => {
                        warn!("Peer-accepted listener lagged, {} connections missed", missed);
                    }
                    Err(RecvError::Closed) => {
                        debug!("Notification server closed its accept stream");
                        break;
                    }
                },
            }
        }

        debug!("Accept loop ended");
    }

    /// Attach a message-received listener to one accepted connection
    fn on_peer_accepted(&self, peer: AcceptedPeer) {
        self.stats.record_peer_accepted();

        let connection = peer.connection_id();
        let received = peer.subscribe_message_received();
        debug!("Notification connection {} accepted", connection);

        let bridge = self.clone();
        tokio::spawn(async move { bridge.run_message_loop(connection, received).await });
    }

    async fn run_message_loop(self, connection: u64, mut received: MessageReceivedReceiver) {
        let stop = wait_for_shutdown(self.shutdown.clone());
        tokio::pin!(stop);

        loop {
            tokio::select! {
                _ = &mut stop => break,
                event = received.recv() => match event {
                    Ok(handle) => self.on_message_received(handle),
                    Err(RecvError::Lagged(missed)) => {
                        warn!(
                            "Connection {} listener lagged, {} notifications missed",
                            connection, missed
                        );
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        debug!("Notification connection {} listener ended", connection);
    }

    /// Handle one notification on its own task so a slow fetch never stalls
    /// the next one
    pub(crate) fn on_message_received(&self, handle: MessageHandle) {
        self.stats.record_notification();

        let bridge = self.clone();
        tokio::spawn(async move {
            match bridge.fetch_and_notify(&handle).await {
                Ok(()) => {}
                Err(FetchError::NotConnected) => {
                    bridge.stats.record_dropped();
                    warn!("Notification for {} arrived while disconnected, dropped", handle);
                }
                Err(e) => {
                    bridge.stats.record_fetch_failure();
                    error!("Failed to fetch message {}: {}", handle, e);
                }
            }
        });
    }

    async fn fetch_and_notify(&self, handle: &MessageHandle) -> Result<(), FetchError> {
        let session = self
            .state
            .read()
            .await
            .outbound()
            .ok_or(FetchError::NotConnected)?;

        let message = session.get_message(handle).await?;
        debug!("Fetched message {} from {}", handle, message.originator);

        self.sink.show_message_notification(message);
        self.stats.record_delivered();
        Ok(())
    }
}

/// Resolves once shutdown has been signalled (or the coordinator is gone)
async fn wait_for_shutdown(mut shutdown: watch::Receiver<bool>) {
    while !*shutdown.borrow_and_update() {
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
