//! Session Collaborator Traits
//!
//! Defines the interfaces the coordinator consumes. The byte-level protocol,
//! the Bluetooth transport and the user-facing alerting all live behind these
//! traits; concrete implementations are supplied by the embedding application
//! (or by `mapbridge-harness` for tests and simulation).

use std::sync::Arc;

use tokio::sync::broadcast;

use crate::errors::SessionError;
use crate::types::{DeviceId, Message, MessageHandle};

// ----------------------------------------------------------------------------
// Event Channels
// ----------------------------------------------------------------------------

/// A notification server connection accepted by the inbound session
pub type AcceptedPeer = Arc<dyn NotificationServer>;

/// Subscription to the inbound session's peer-accepted event
pub type PeerAcceptedReceiver = broadcast::Receiver<AcceptedPeer>;

/// Subscription to one accepted connection's message-received event
pub type MessageReceivedReceiver = broadcast::Receiver<MessageHandle>;

// ----------------------------------------------------------------------------
// Outbound Session
// ----------------------------------------------------------------------------

/// Client-role session used to pull message content from the remote device
///
/// One instance is created per connect cycle and is shared between the
/// coordinator and in-flight fetch tasks, so every method takes `&self`.
///
/// ## Contract
///
/// - `connect` fails with [`SessionError::DeviceUnavailable`] when the device
///   is out of range; every other error is a protocol or session fault.
/// - Once `dispose` has run, further calls fail with
///   [`SessionError::Disposed`] instead of touching the transport.
/// - `dispose` is idempotent.
#[async_trait::async_trait]
pub trait OutboundSession: Send + Sync {
    /// Open the session to the remote device
    async fn connect(&self) -> Result<(), SessionError>;

    /// Ask the remote device to push (or stop pushing) new-message events
    async fn set_notification_registration(&self, enabled: bool) -> Result<(), SessionError>;

    /// Fetch a full message by the handle carried in a notification
    async fn get_message(&self, handle: &MessageHandle) -> Result<Message, SessionError>;

    /// Release the session and its transport resources
    async fn dispose(&self);
}

/// Creates a fresh outbound session bound to a device for each connect cycle
pub trait OutboundSessionFactory: Send + Sync {
    fn create(&self, device: &DeviceId) -> Arc<dyn OutboundSession>;
}

impl<F> OutboundSessionFactory for F
where
    F: Fn(&DeviceId) -> Arc<dyn OutboundSession> + Send + Sync,
{
    fn create(&self, device: &DeviceId) -> Arc<dyn OutboundSession> {
        self(device)
    }
}

// ----------------------------------------------------------------------------
// Inbound Session
// ----------------------------------------------------------------------------

/// Server-role listener that receives new-message pushes from the device
///
/// Started at most once per coordinator; it outlives individual outbound
/// sessions. `dispose` must be a no-op if `start` never ran.
#[async_trait::async_trait]
pub trait InboundSession: Send + Sync {
    /// Start listening for incoming notification connections
    async fn start(&self) -> Result<(), SessionError>;

    /// Subscribe to the peer-accepted event
    ///
    /// The event fires once per physical incoming connection.
    fn subscribe_peer_accepted(&self) -> PeerAcceptedReceiver;

    /// Stop listening and drop all accepted connections
    async fn dispose(&self);
}

/// One accepted notification connection
pub trait NotificationServer: Send + Sync {
    /// Identifier of the underlying connection, for diagnostics
    fn connection_id(&self) -> u64;

    /// Subscribe to the message-received event of this connection
    fn subscribe_message_received(&self) -> MessageReceivedReceiver;
}

// ----------------------------------------------------------------------------
// Notification Sink
// ----------------------------------------------------------------------------

/// User-facing alerting for fetched messages
///
/// Fire-and-forget: implementations must not block the caller.
pub trait NotificationSink: Send + Sync {
    fn show_message_notification(&self, message: Message);
}
