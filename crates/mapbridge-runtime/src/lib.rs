//! MAP Bridge Runtime
//!
//! This crate contains the engine of the bridge:
//! - `SessionCoordinator`: connect/disconnect/dispose lifecycle for the
//!   outbound session, plus the once-only start of the notification server
//! - the event bridge turning new-message notifications into fetched messages
//!   delivered to the notification sink
//! - `ReconnectSupervisor`: follows device link status with backoff
//!
//! `mapbridge-core` provides the types and collaborator traits it runs on.

mod bridge;
pub mod builder;
mod coordinator;
pub mod state;
pub mod supervisor;

pub use builder::CoordinatorBuilder;
pub use coordinator::SessionCoordinator;
pub use state::ConnectionState;
pub use supervisor::{DeviceStatus, ReconnectSupervisor};

// Re-export core types for convenience
pub use mapbridge_core::{
    BridgeStatsSnapshot, CoordinatorConfig, CoordinatorError, DeviceId, MapResult, Message,
    MessageHandle, ReconnectConfig, SessionError,
};
