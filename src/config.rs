//! Configuration management for Wayfarer
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from files, environment variables, and CLI overrides.
//!
//! Missing OAuth credentials are not a load-time failure. They surface as a
//! [`WayfarerError::Config`] the first time a login is attempted, so the
//! server can still start and report setup instructions.

use crate::error::{Result, WayfarerError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure for Wayfarer
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,
    /// GitHub OAuth and session settings
    #[serde(default)]
    pub auth: AuthConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Interface to bind
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind
    #[serde(default = "default_port")]
    pub port: u16,

    /// Externally reachable base URL, used when telling users where to log in
    #[serde(default = "default_public_url")]
    pub public_url: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_public_url() -> String {
    "http://localhost:8000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            public_url: default_public_url(),
        }
    }
}

/// How an incoming call is bound to a session
///
/// `SingleUser` keeps the "current session" pointer with its hint and
/// most-recent fallback, which suits a tool driven by one person.
/// `PerCaller` only honours the session id carried by each request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionBinding {
    /// Explicit pointer, then hint, then most recently created session
    #[default]
    SingleUser,
    /// Only the caller-supplied session id is considered
    PerCaller,
}

/// GitHub OAuth configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Whether the `/auth/*` routes and auth tools are mounted at all
    ///
    /// Off unless the file sets it or `IS_OAUTH_ENABLED` is exactly `"true"`.
    #[serde(default)]
    pub enabled: bool,

    /// OAuth App client id (`GITHUB_CLIENT_ID`)
    #[serde(default)]
    pub client_id: Option<String>,

    /// OAuth App client secret (`GITHUB_CLIENT_SECRET`)
    #[serde(default)]
    pub client_secret: Option<String>,

    /// Callback URL registered with the OAuth App (`GITHUB_REDIRECT_URI`)
    #[serde(default)]
    pub redirect_uri: Option<String>,

    /// Provider authorize endpoint
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    /// Provider token endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Provider REST API base, used for the `/user` profile lookup
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Lifetime of an OAuth `state` token in seconds
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: u64,

    /// Timeout applied to every identity-provider request
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// How often abandoned `state` tokens are swept
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_seconds: u64,

    /// Session binding strategy
    #[serde(default)]
    pub binding: SessionBinding,

    /// Out-of-band session id hint (`MCP_SESSION_ID`)
    #[serde(default)]
    pub session_hint: Option<String>,
}

fn default_authorize_url() -> String {
    "https://github.com/login/oauth/authorize".to_string()
}

fn default_token_url() -> String {
    "https://github.com/login/oauth/access_token".to_string()
}

fn default_api_base() -> String {
    "https://api.github.com".to_string()
}

fn default_state_ttl() -> u64 {
    600
}

fn default_request_timeout() -> u64 {
    10
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            client_id: None,
            client_secret: None,
            redirect_uri: None,
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            api_base: default_api_base(),
            state_ttl_seconds: default_state_ttl(),
            request_timeout_seconds: default_request_timeout(),
            sweep_interval_seconds: default_sweep_interval(),
            binding: SessionBinding::default(),
            session_hint: None,
        }
    }
}

/// The three values a login round-trip cannot proceed without
#[derive(Clone)]
pub struct OAuthCredentials {
    /// OAuth App client id
    pub client_id: String,
    /// OAuth App client secret
    pub client_secret: String,
    /// Registered callback URL
    pub redirect_uri: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("client_id", &mask_client_id(&self.client_id))
            .field("client_secret", &"********")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

impl AuthConfig {
    /// Returns the OAuth credentials, or a configuration error naming every
    /// missing environment variable.
    ///
    /// Empty strings count as missing.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::Config`] when any of client id, client secret
    /// or redirect URI is absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use wayfarer::config::AuthConfig;
    ///
    /// let mut auth = AuthConfig::default();
    /// assert!(auth.credentials().is_err());
    ///
    /// auth.client_id = Some("Iv1.abc".to_string());
    /// auth.client_secret = Some("shh".to_string());
    /// auth.redirect_uri = Some("http://localhost:8000/auth/callback".to_string());
    /// assert!(auth.credentials().is_ok());
    /// ```
    pub fn credentials(&self) -> Result<OAuthCredentials> {
        fn present(value: &Option<String>) -> Option<String> {
            value.as_ref().filter(|v| !v.trim().is_empty()).cloned()
        }

        let client_id = present(&self.client_id);
        let client_secret = present(&self.client_secret);
        let redirect_uri = present(&self.redirect_uri);

        match (client_id, client_secret, redirect_uri) {
            (Some(client_id), Some(client_secret), Some(redirect_uri)) => Ok(OAuthCredentials {
                client_id,
                client_secret,
                redirect_uri,
            }),
            (client_id, client_secret, redirect_uri) => {
                let mut missing = Vec::new();
                if client_id.is_none() {
                    missing.push("GITHUB_CLIENT_ID");
                }
                if client_secret.is_none() {
                    missing.push("GITHUB_CLIENT_SECRET");
                }
                if redirect_uri.is_none() {
                    missing.push("GITHUB_REDIRECT_URI");
                }
                Err(WayfarerError::Config(format!(
                    "Missing GitHub OAuth configuration. Please set: {}",
                    missing.join(", ")
                ))
                .into())
            }
        }
    }
}

/// Masks a client id to its first 8 and last 4 characters
///
/// Short ids are fully masked.
pub fn mask_client_id(client_id: &str) -> String {
    let chars: Vec<char> = client_id.chars().collect();
    if chars.len() <= 12 {
        return "*".repeat(chars.len());
    }
    let head: String = chars[..8].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{}...{}", head, tail)
}

impl Config {
    /// Load configuration from file with environment and CLI overrides
    ///
    /// # Arguments
    ///
    /// * `path` - Path to configuration file
    /// * `cli` - CLI arguments for overrides
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: &str, cli: &crate::cli::Cli) -> Result<Self> {
        let mut config = if Path::new(path).exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!("Config file not found at {}, using defaults", path);
            Self::default()
        };

        config.apply_env_vars();
        config.apply_cli_overrides(cli);

        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| WayfarerError::Config(format!("Failed to read config file: {}", e)))?;
        serde_yaml::from_str(&contents)
            .map_err(|e| WayfarerError::Config(format!("Failed to parse config: {}", e)).into())
    }

    fn apply_env_vars(&mut self) {
        if let Ok(client_id) = std::env::var("GITHUB_CLIENT_ID") {
            self.auth.client_id = Some(client_id);
        }

        if let Ok(client_secret) = std::env::var("GITHUB_CLIENT_SECRET") {
            self.auth.client_secret = Some(client_secret);
        }

        if let Ok(redirect_uri) = std::env::var("GITHUB_REDIRECT_URI") {
            tracing::debug!(redirect_uri = %redirect_uri, "Env override: GITHUB_REDIRECT_URI");
            self.auth.redirect_uri = Some(redirect_uri);
        }

        if let Ok(enabled) = std::env::var("IS_OAUTH_ENABLED") {
            self.auth.enabled = enabled == "true";
            tracing::debug!(enabled = self.auth.enabled, "Env override: IS_OAUTH_ENABLED");
        }

        if let Ok(hint) = std::env::var("MCP_SESSION_ID") {
            if !hint.is_empty() {
                self.auth.session_hint = Some(hint);
            }
        }

        if let Ok(host) = std::env::var("WAYFARER_HOST") {
            self.server.host = host;
        }

        if let Ok(port) = std::env::var("WAYFARER_PORT") {
            if let Ok(value) = port.parse() {
                self.server.port = value;
            } else {
                tracing::warn!("Invalid WAYFARER_PORT: {}", port);
            }
        }
    }

    fn apply_cli_overrides(&mut self, cli: &crate::cli::Cli) {
        if let crate::cli::Commands::Serve { host, port } = &cli.command {
            if let Some(host) = host {
                self.server.host = host.clone();
            }
            if let Some(port) = port {
                self.server.port = *port;
            }
        }
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::Config`] describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.server.host.is_empty() {
            return Err(WayfarerError::Config("server.host cannot be empty".to_string()).into());
        }

        if self.server.port == 0 {
            return Err(
                WayfarerError::Config("server.port must be greater than 0".to_string()).into(),
            );
        }

        if self.auth.state_ttl_seconds == 0 {
            return Err(WayfarerError::Config(
                "auth.state_ttl_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.auth.request_timeout_seconds == 0 {
            return Err(WayfarerError::Config(
                "auth.request_timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        if self.auth.sweep_interval_seconds == 0 {
            return Err(WayfarerError::Config(
                "auth.sweep_interval_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        for (name, value) in [
            ("auth.authorize_url", &self.auth.authorize_url),
            ("auth.token_url", &self.auth.token_url),
            ("auth.api_base", &self.auth.api_base),
        ] {
            url::Url::parse(value)
                .map_err(|e| WayfarerError::Config(format!("{} is not a valid URL: {}", name, e)))?;
        }

        Ok(())
    }

    /// Human-readable summary with secrets redacted
    pub fn redacted_summary(&self) -> String {
        let client_id = self
            .auth
            .client_id
            .as_deref()
            .map(mask_client_id)
            .unwrap_or_else(|| "(not set)".to_string());
        let client_secret = if self.auth.client_secret.is_some() {
            "******** (hidden)"
        } else {
            "(not set)"
        };
        let redirect_uri = self.auth.redirect_uri.as_deref().unwrap_or("(not set)");

        format!(
            concat!(
                "Server: {}:{} ({})\n",
                "OAuth enabled: {}\n",
                "Client ID: {}\n",
                "Client Secret: {}\n",
                "Redirect URI: {}\n",
                "Session binding: {:?}\n",
                "State TTL: {}s",
            ),
            self.server.host,
            self.server.port,
            self.server.public_url,
            self.auth.enabled,
            client_id,
            client_secret,
            redirect_uri,
            self.auth.binding,
            self.auth.state_ttl_seconds,
        )
    }
}
