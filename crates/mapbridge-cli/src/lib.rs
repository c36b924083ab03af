//! MAP Bridge CLI Library
//!
//! Drives the notification bridge against a simulated phone so the whole
//! connect, notify, fetch and deliver path can be exercised from a terminal.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;

pub use app::{run_simulation, SimulationOptions, SimulationReport};
pub use config::{AppConfig, SimulationConfig};
pub use error::{CliError, Result};
