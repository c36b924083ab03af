//! Coordinator connection state

use std::fmt;
use std::sync::Arc;

use mapbridge_core::OutboundSession;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Public State
// ----------------------------------------------------------------------------

/// Observable state of the outbound side of a coordinator
///
/// Whether the notification server is running is tracked separately and does
/// not reset on disconnect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disposed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
            ConnectionState::Disposed => write!(f, "disposed"),
        }
    }
}

// ----------------------------------------------------------------------------
// Internal State
// ----------------------------------------------------------------------------

/// Connection state carrying the live outbound session
///
/// The session handle only exists inside `Connected`, so there is never a
/// handle without a connection or a connection without a handle.
pub(crate) enum SessionState {
    Disconnected,
    Connecting,
    Connected(Arc<dyn OutboundSession>),
    Disposed,
}

impl SessionState {
    pub(crate) fn public(&self) -> ConnectionState {
        match self {
            SessionState::Disconnected => ConnectionState::Disconnected,
            SessionState::Connecting => ConnectionState::Connecting,
            SessionState::Connected(_) => ConnectionState::Connected,
            SessionState::Disposed => ConnectionState::Disposed,
        }
    }

    /// The live outbound session, if connected
    pub(crate) fn outbound(&self) -> Option<Arc<dyn OutboundSession>> {
        match self {
            SessionState::Connected(session) => Some(Arc::clone(session)),
            _ => None,
        }
    }

    pub(crate) fn is_disposed(&self) -> bool {
        matches!(self, SessionState::Disposed)
    }
}
