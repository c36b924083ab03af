//! Session Coordinator
//!
//! Owns the outbound session for each connect cycle and the inbound
//! notification server for the coordinator's lifetime:
//!
//! - `connect` opens a fresh outbound session, starts the notification
//!   server on the first success, then enables notification delivery
//! - `disconnect` releases the outbound session and leaves the server running
//! - `dispose` releases everything and makes the coordinator unusable
//!
//! Lifecycle operations are serialized; notification events are handled
//! concurrently by the event bridge.

use std::mem;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use mapbridge_core::{
    BridgeStats, BridgeStatsSnapshot, CoordinatorConfig, CoordinatorError, DeviceId,
    InboundSession, MapResult, NotificationSink, OutboundSession, OutboundSessionFactory,
    SessionError,
};
use tokio::sync::{watch, Mutex, OnceCell, RwLock};
use tracing::{debug, error, info, warn};

use crate::bridge::{EventBridge, Subscription};
use crate::state::{ConnectionState, SessionState};

// ----------------------------------------------------------------------------
// Session Coordinator
// ----------------------------------------------------------------------------

/// Coordinates the client and server MAP sessions for one paired device
///
/// Call [`dispose`](Self::dispose) before dropping. Dropping only stops the
/// event listeners; releasing the sessions needs an async context.
pub struct SessionCoordinator {
    device: DeviceId,
    config: CoordinatorConfig,
    factory: Arc<dyn OutboundSessionFactory>,
    inbound: Arc<dyn InboundSession>,
    state: Arc<RwLock<SessionState>>,
    stats: Arc<BridgeStats>,
    bridge: EventBridge,
    // Serializes connect and disconnect
    lifecycle: Mutex<()>,
    // Set once the notification server has started and been subscribed
    subscription: OnceCell<Subscription>,
    disposed: AtomicBool,
    shutdown: watch::Sender<bool>,
}

impl SessionCoordinator {
    /// Create a coordinator with default configuration
    pub fn new(
        device: DeviceId,
        factory: Arc<dyn OutboundSessionFactory>,
        inbound: Arc<dyn InboundSession>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self::with_config(device, factory, inbound, sink, CoordinatorConfig::default())
    }

    /// Create a coordinator with the given configuration
    pub fn with_config(
        device: DeviceId,
        factory: Arc<dyn OutboundSessionFactory>,
        inbound: Arc<dyn InboundSession>,
        sink: Arc<dyn NotificationSink>,
        config: CoordinatorConfig,
    ) -> Self {
        let state = Arc::new(RwLock::new(SessionState::Disconnected));
        let stats = Arc::new(BridgeStats::new());
        let (shutdown, shutdown_rx) = watch::channel(false);
        let bridge = EventBridge::new(state.clone(), sink, stats.clone(), shutdown_rx);

        Self {
            device,
            config,
            factory,
            inbound,
            state,
            stats,
            bridge,
            lifecycle: Mutex::new(()),
            subscription: OnceCell::new(),
            disposed: AtomicBool::new(false),
            shutdown,
        }
    }

    /// The device this coordinator serves
    pub fn device(&self) -> DeviceId {
        self.device
    }

    pub fn config(&self) -> &CoordinatorConfig {
        &self.config
    }

    /// Current connection state
    pub async fn state(&self) -> ConnectionState {
        self.state.read().await.public()
    }

    pub async fn is_connected(&self) -> bool {
        self.state().await == ConnectionState::Connected
    }

    /// Whether the notification server has been started
    pub fn inbound_started(&self) -> bool {
        self.subscription.initialized()
    }

    /// Bridge counters
    pub fn stats(&self) -> BridgeStatsSnapshot {
        self.stats.snapshot()
    }

    /// Connect the outbound session
    ///
    /// Returns `Ok(true)` once connected with notifications enabled, and
    /// `Ok(false)` if the device was unreachable (safe to retry). Any other
    /// session failure is returned as [`CoordinatorError::Fatal`]; a failing
    /// notification server start as [`CoordinatorError::StartFailed`].
    /// Calling this while already connected is a no-op returning `Ok(true)`.
    pub async fn connect(&self) -> MapResult<bool> {
        let _lifecycle = self.lifecycle.lock().await;

        {
            let mut state = self.state.write().await;
            match &*state {
                SessionState::Disposed => return Err(CoordinatorError::Disposed),
                SessionState::Connected(_) => {
                    debug!("Already connected to {}", self.device);
                    return Ok(true);
                }
                SessionState::Disconnected | SessionState::Connecting => {}
            }
            *state = SessionState::Connecting;
        }

        info!("Connecting to {}", self.device);
        let session = self.factory.create(&self.device);

        if let Err(e) = self.open_transport(&session).await {
            return self.abandon(session, "connect", e).await;
        }

        if let Err(e) = self.ensure_inbound_started().await {
            if !matches!(e, CoordinatorError::Disposed) {
                error!("Notification server for {} failed to start: {}", self.device, e);
            }
            self.release(session).await;
            return Err(e);
        }

        if let Err(e) = session.set_notification_registration(true).await {
            return self.abandon(session, "enable notifications", e).await;
        }

        let mut state = self.state.write().await;
        if state.is_disposed() {
            drop(state);
            session.dispose().await;
            return Err(CoordinatorError::Disposed);
        }
        *state = SessionState::Connected(session);

        info!("Connected to {}", self.device);
        Ok(true)
    }

    /// Release the outbound session, keeping the notification server alive
    pub async fn disconnect(&self) -> MapResult<()> {
        let _lifecycle = self.lifecycle.lock().await;

        let session = {
            let mut state = self.state.write().await;
            if state.is_disposed() {
                return Err(CoordinatorError::Disposed);
            }
            match mem::replace(&mut *state, SessionState::Disconnected) {
                SessionState::Connected(session) => session,
                _ => return Ok(()),
            }
        };

        if self.config.unregister_on_disconnect {
            if let Err(e) = session.set_notification_registration(false).await {
                warn!("Failed to unregister notifications on {}: {}", self.device, e);
            }
        }
        session.dispose().await;

        info!("Disconnected from {}", self.device);
        Ok(())
    }

    /// Release every session; idempotent and callable from any state
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        let _ = self.shutdown.send(true);
        if let Some(subscription) = self.subscription.get() {
            subscription.cancel();
        }

        let previous = mem::replace(&mut *self.state.write().await, SessionState::Disposed);
        if let Some(session) = previous.outbound() {
            session.dispose().await;
        }
        self.inbound.dispose().await;

        info!("Session coordinator for {} disposed", self.device);
    }

    async fn open_transport(&self, session: &Arc<dyn OutboundSession>) -> Result<(), SessionError> {
        match self.config.connect_timeout {
            Some(limit) => tokio::time::timeout(limit, session.connect())
                .await
                .map_err(|_| {
                    SessionError::unavailable(format!("connect timed out after {:?}", limit))
                })?,
            None => session.connect().await,
        }
    }

    /// Start the notification server and subscribe to it, at most once
    ///
    /// The cell stays empty if start fails, so the next connect retries.
    async fn ensure_inbound_started(&self) -> MapResult<()> {
        self.subscription
            .get_or_try_init(|| async {
                if self.disposed.load(Ordering::SeqCst) {
                    return Err(CoordinatorError::Disposed);
                }
                // Subscribe before start so no accepted peer slips between the two
                let accepted = self.inbound.subscribe_peer_accepted();
                self.inbound
                    .start()
                    .await
                    .map_err(CoordinatorError::StartFailed)?;
                // A dispose that ran during start may have released the server
                // before it was up
                if self.disposed.load(Ordering::SeqCst) {
                    self.inbound.dispose().await;
                    return Err(CoordinatorError::Disposed);
                }
                info!("Notification server started for {}", self.device);
                Ok::<_, CoordinatorError>(self.bridge.subscribe(accepted))
            })
            .await?;
        Ok(())
    }

    /// Tear down a failed attempt and classify the failure
    async fn abandon(
        &self,
        session: Arc<dyn OutboundSession>,
        step: &str,
        cause: SessionError,
    ) -> MapResult<bool> {
        self.release(session).await;

        if cause.is_transient() {
            warn!("{} unavailable during {}: {}", self.device, step, cause);
            return Ok(false);
        }

        error!("{} failed for {}: {}", step, self.device, cause);
        Err(CoordinatorError::fatal(
            format!("{} to {} failed", step, self.device),
            cause,
        ))
    }

    async fn release(&self, session: Arc<dyn OutboundSession>) {
        session.dispose().await;

        let mut state = self.state.write().await;
        if !state.is_disposed() {
            *state = SessionState::Disconnected;
        }
    }
}

impl Drop for SessionCoordinator {
    fn drop(&mut self) {
        if !self.disposed.load(Ordering::SeqCst) {
            warn!(
                "Session coordinator for {} dropped without dispose; sessions were not released",
                self.device
            );
        }
        let _ = self.shutdown.send(true);
        if let Some(subscription) = self.subscription.get() {
            subscription.cancel();
        }
    }
}
