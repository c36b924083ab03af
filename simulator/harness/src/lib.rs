//! MAP Bridge Test Harness
//!
//! Deterministic mock collaborators for the session coordinator:
//!
//! - [`MockDevice`] - the phone's message access server, handing out
//!   scriptable outbound sessions
//! - [`MockInboundSession`] - the local notification server, with
//!   connections opened on demand
//! - [`RecordingSink`] - keeps every delivered message
//!
//! [`MockSetup`] bundles one of each for tests and the demo CLI.

pub mod mock_device;
pub mod mock_server;
pub mod recording_sink;

use std::sync::Arc;

use mapbridge_core::{DeviceId, Message};

pub use mock_device::{ConnectFailure, MockDevice, MockDeviceConfig, MockOutboundSession};
pub use mock_server::{MockInboundSession, MockNotificationServer};
pub use recording_sink::RecordingSink;

/// Address used by harness fixtures
pub const TEST_DEVICE: DeviceId = DeviceId::new([0x00, 0x1A, 0x7D, 0xDA, 0x71, 0x13]);

/// One simulated phone, notification server and sink
#[derive(Clone)]
pub struct MockSetup {
    pub device: MockDevice,
    pub server: Arc<MockInboundSession>,
    pub sink: Arc<RecordingSink>,
}

impl MockSetup {
    /// Ideal device, default event buffers
    pub fn new() -> Self {
        Self::with_parts(MockDevice::ideal(TEST_DEVICE), MockInboundSession::new(64))
    }

    pub fn with_parts(device: MockDevice, server: MockInboundSession) -> Self {
        Self {
            device,
            server: Arc::new(server),
            sink: Arc::new(RecordingSink::new()),
        }
    }

    /// Store simple text messages under the given handles
    pub fn with_messages(self, handles: &[&str]) -> Self {
        for handle in handles {
            self.device.store_message(
                Message::new(*handle, "+15550100", format!("body of {}", handle))
                    .with_recipient("+15550199"),
            );
        }
        self
    }
}

impl Default for MockSetup {
    fn default() -> Self {
        Self::new()
    }
}
