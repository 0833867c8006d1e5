//! Command-line interface definition for Wayfarer
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// Wayfarer - travel-planning assistant server
///
/// Serves GitHub OAuth login routes and session-guarded assistant tools.
#[derive(Parser, Debug, Clone)]
#[command(name = "wayfarer")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub json_logs: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Wayfarer
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Run the HTTP server
    Serve {
        /// Interface to bind (overrides config and WAYFARER_HOST)
        #[arg(long)]
        host: Option<String>,

        /// Port to bind (overrides config and WAYFARER_PORT)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Print the effective configuration with secrets redacted
    CheckConfig,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
