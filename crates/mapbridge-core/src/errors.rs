//! Error types for the MAP notification bridge
//!
//! Three layers of error exist:
//!
//! - [`SessionError`] is what the session collaborators report.
//! - [`CoordinatorError`] is what the coordinator surfaces to its caller.
//! - [`FetchError`] stays inside the message bridge and is only logged.

use thiserror::Error;

// ----------------------------------------------------------------------------
// Collaborator Errors
// ----------------------------------------------------------------------------

/// Failures reported by the outbound and inbound session collaborators
#[derive(Debug, Error)]
pub enum SessionError {
    /// The peer is out of range or not accepting connections
    #[error("Device unavailable: {0}")]
    DeviceUnavailable(String),

    #[error("Session handshake failed: {0}")]
    Handshake(String),

    #[error("Remote device lacks capability: {0}")]
    Capability(String),

    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Session not connected")]
    NotConnected,

    #[error("Session disposed")]
    Disposed,

    #[error("Notification server failed to start: {0}")]
    ServerStart(String),

    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Whether the caller may simply retry
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionError::DeviceUnavailable(_))
    }

    /// Create a protocol error
    pub fn protocol<S: Into<String>>(reason: S) -> Self {
        SessionError::Protocol(reason.into())
    }

    /// Create a device unavailable error
    pub fn unavailable<S: Into<String>>(reason: S) -> Self {
        SessionError::DeviceUnavailable(reason.into())
    }
}

// ----------------------------------------------------------------------------
// Coordinator Errors
// ----------------------------------------------------------------------------

/// Errors surfaced to the owner of a session coordinator
#[derive(Debug, Error)]
pub enum CoordinatorError {
    /// Non-transient session failure; retry only after backoff or diagnosis
    #[error("{context}: {source}")]
    Fatal {
        context: String,
        #[source]
        source: SessionError,
    },

    /// The notification server could not be started
    #[error("Notification server start failed: {0}")]
    StartFailed(#[source] SessionError),

    /// The coordinator has been disposed and cannot be used again
    #[error("Coordinator disposed")]
    Disposed,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl CoordinatorError {
    /// Wrap a session failure with context
    pub fn fatal<S: Into<String>>(context: S, source: SessionError) -> Self {
        CoordinatorError::Fatal {
            context: context.into(),
            source,
        }
    }

    /// The session failure at the root of this error, if any
    pub fn session_cause(&self) -> Option<&SessionError> {
        match self {
            CoordinatorError::Fatal { source, .. } => Some(source),
            CoordinatorError::StartFailed(source) => Some(source),
            CoordinatorError::Disposed | CoordinatorError::Config(_) => None,
        }
    }
}

// ----------------------------------------------------------------------------
// Bridge Errors
// ----------------------------------------------------------------------------

/// Failure to turn a new-message notification into a delivered message
#[derive(Debug, Error)]
pub enum FetchError {
    /// A notification arrived while no outbound session was live
    #[error("No outbound session to fetch with")]
    NotConnected,

    #[error("Fetch failed: {0}")]
    Session(#[from] SessionError),
}

/// Result type for caller-facing coordinator operations
pub type MapResult<T> = Result<T, CoordinatorError>;
