//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bridge against a simulated phone and print delivered messages
    Simulate {
        /// Bluetooth address of the simulated phone
        #[arg(short, long, default_value = "00:1A:7D:DA:71:13")]
        device: String,
        /// Number of new-message notifications the phone pushes
        #[arg(short = 'n', long, default_value_t = 3)]
        messages: usize,
        /// Connect attempts that find the phone out of range before it appears
        #[arg(long, default_value_t = 0)]
        unreachable: u32,
    },
    /// Print the effective configuration as TOML
    Config,
}
