//! Wayfarer - travel-planning assistant server library
//!
//! Wayfarer exposes travel-planning tools to assistant hosts and guards them
//! with GitHub OAuth sessions.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: state tokens, sessions, session resolution, the login flow
//!   controller, and the guard for protected operations
//! - `tools`: tool registry, GitHub auth tools, and the itinerary tool
//! - `resources`: read-only JSON views of the current login
//! - `collaborators`: weather and prompt interfaces supplied by the host
//! - `server`: axum routes for login, tools and resources
//! - `config`: configuration management and validation
//! - `error`: error types and result aliases
//! - `cli`: command-line interface definition
//!
//! # Example
//!
//! ```no_run
//! use wayfarer::cli::Cli;
//! use wayfarer::server::{self, AppState};
//! use wayfarer::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cli = Cli::parse_args();
//!     let config = Config::load("config/config.yaml", &cli)?;
//!     config.validate()?;
//!
//!     let state = AppState::from_config(&config)?;
//!     server::serve(config, state).await
//! }
//! ```

pub mod auth;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod resources;
pub mod server;
pub mod tools;

// Re-export commonly used types
pub use auth::{AuthGuard, AuthManager, SessionContext};
pub use config::Config;
pub use error::{Result, WayfarerError};
