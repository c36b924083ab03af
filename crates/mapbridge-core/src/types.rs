//! Core types for the MAP notification bridge
//!
//! This module defines the values that flow between the coordinator and its
//! collaborators, using newtype patterns so a device address can never be
//! confused with a message handle.

use core::fmt;
use core::ops::Deref;
use core::str::FromStr;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::errors::SessionError;

// ----------------------------------------------------------------------------
// Device Identity
// ----------------------------------------------------------------------------

/// Bluetooth address of the paired remote device
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DeviceId([u8; 6]);

impl DeviceId {
    /// Create a new DeviceId from the 6 address bytes (most significant first)
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02X}:{b:02X}:{c:02X}:{d:02X}:{e:02X}:{g:02X}")
    }
}

impl FromStr for DeviceId {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let clean: String = s.chars().filter(|c| *c != ':' && *c != '-').collect();

        let bytes = hex::decode(&clean)
            .map_err(|_| SessionError::Protocol(format!("invalid device address: {s}")))?;

        let bytes: [u8; 6] = bytes
            .try_into()
            .map_err(|_| SessionError::Protocol(format!("device address must be 6 bytes: {s}")))?;

        Ok(Self(bytes))
    }
}

impl Deref for DeviceId {
    type Target = [u8; 6];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

// ----------------------------------------------------------------------------
// Message Handle
// ----------------------------------------------------------------------------

/// Opaque identifier of a message stored on the remote device
///
/// Handles are assigned by the device and only ever compared or echoed back
/// through the outbound session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageHandle(String);

impl MessageHandle {
    pub fn new(handle: impl Into<String>) -> Self {
        Self(handle.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MessageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MessageHandle {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for MessageHandle {
    fn from(value: String) -> Self {
        Self(value)
    }
}

// ----------------------------------------------------------------------------
// Message
// ----------------------------------------------------------------------------

/// A fully fetched message, ready to be handed to the notification sink
///
/// The bridge never inspects the body; addressing is carried verbatim as the
/// device reported it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Handle the message was fetched with
    pub handle: MessageHandle,
    /// Sender address as reported by the device
    pub originator: String,
    /// Recipient addresses (usually exactly one)
    pub recipients: SmallVec<[String; 1]>,
    /// Message body, untouched
    pub body: String,
}

impl Message {
    pub fn new(
        handle: impl Into<MessageHandle>,
        originator: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            handle: handle.into(),
            originator: originator.into(),
            recipients: SmallVec::new(),
            body: body.into(),
        }
    }

    /// Add a recipient address
    pub fn with_recipient(mut self, recipient: impl Into<String>) -> Self {
        self.recipients.push(recipient.into());
        self
    }
}
