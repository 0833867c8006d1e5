//! Error types for Wayfarer
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.
//!
//! Guard denials ("not logged in") are not errors; they are modelled by
//! [`crate::auth::guard::Denial`].

use thiserror::Error;

/// Main error type for Wayfarer operations
///
/// Covers configuration problems, every failure state of the OAuth login
/// flow, tool execution, and listener I/O.
#[derive(Error, Debug)]
pub enum WayfarerError {
    /// Missing or invalid configuration (including OAuth credentials)
    #[error("Configuration error: {0}")]
    Config(String),

    /// OAuth `state` token missing, expired, reused, or never issued
    #[error("Invalid or expired OAuth state. Please restart the login flow.")]
    InvalidState,

    /// Identity provider rejected the code exchange or the request failed
    #[error("Token exchange failed: {0}")]
    Exchange(String),

    /// Authenticated, but fetching the user profile failed
    #[error("Profile fetch failed: {0}")]
    ProfileFetch(String),

    /// Tool execution errors
    #[error("Tool execution error: {0}")]
    Tool(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Wayfarer operations
///
/// Uses `anyhow::Error` so callers can attach context; the route layer
/// downcasts back to [`WayfarerError`] to pick a status code.
pub type Result<T> = anyhow::Result<T>;
