//! MAP notification bridge core
//!
//! Stable API shared by the bridge runtime, the simulation harness and the
//! embedding application:
//!
//! - [`types`] - device identity, message handles and fetched messages
//! - [`errors`] - session, coordinator and fetch error taxonomy
//! - [`session`] - traits for the outbound/inbound sessions and the sink
//! - [`config`] - coordinator and reconnect settings
//! - [`monitoring`] - bridge counters
//!
//! The session coordinator itself lives in `mapbridge-runtime`.

pub mod config;
pub mod errors;
pub mod monitoring;
pub mod session;
pub mod types;

pub use config::{CoordinatorConfig, ReconnectConfig};
pub use errors::{CoordinatorError, FetchError, MapResult, SessionError};
pub use monitoring::{BridgeStats, BridgeStatsSnapshot};
pub use session::{
    AcceptedPeer, InboundSession, MessageReceivedReceiver, NotificationServer, NotificationSink,
    OutboundSession, OutboundSessionFactory, PeerAcceptedReceiver,
};
pub use types::{DeviceId, Message, MessageHandle};
