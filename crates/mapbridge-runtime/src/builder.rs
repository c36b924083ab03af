//! Coordinator Builder API
//!
//! Builder-style construction for embedders that wire collaborators from
//! different places (CLI, app shell, tests).

use std::sync::Arc;

use mapbridge_core::{
    CoordinatorConfig, CoordinatorError, DeviceId, InboundSession, MapResult, NotificationSink,
    OutboundSessionFactory,
};

use crate::coordinator::SessionCoordinator;

// ----------------------------------------------------------------------------
// Coordinator Builder
// ----------------------------------------------------------------------------

/// Builder for [`SessionCoordinator`]
pub struct CoordinatorBuilder {
    device: DeviceId,
    config: CoordinatorConfig,
    factory: Option<Arc<dyn OutboundSessionFactory>>,
    inbound: Option<Arc<dyn InboundSession>>,
    sink: Option<Arc<dyn NotificationSink>>,
}

impl CoordinatorBuilder {
    /// Start building a coordinator for the given device
    pub fn new(device: DeviceId) -> Self {
        Self {
            device,
            config: CoordinatorConfig::default(),
            factory: None,
            inbound: None,
            sink: None,
        }
    }

    pub fn with_config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the factory producing one outbound session per connect cycle
    pub fn outbound_factory(mut self, factory: Arc<dyn OutboundSessionFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Set the notification server session
    pub fn inbound_session(mut self, inbound: Arc<dyn InboundSession>) -> Self {
        self.inbound = Some(inbound);
        self
    }

    /// Set where fetched messages are delivered
    pub fn notification_sink(mut self, sink: Arc<dyn NotificationSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Validate the configuration and build the coordinator
    pub fn build(self) -> MapResult<SessionCoordinator> {
        self.config.validate()?;

        let factory = self
            .factory
            .ok_or_else(|| CoordinatorError::Config("outbound session factory not set".into()))?;
        let inbound = self
            .inbound
            .ok_or_else(|| CoordinatorError::Config("inbound session not set".into()))?;
        let sink = self
            .sink
            .ok_or_else(|| CoordinatorError::Config("notification sink not set".into()))?;

        Ok(SessionCoordinator::with_config(
            self.device,
            factory,
            inbound,
            sink,
            self.config,
        ))
    }
}
