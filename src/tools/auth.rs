//! GitHub authentication tools
//!
//! These tools let an assistant host drive the login flow without touching
//! the HTTP routes directly. They report through [`ToolResult`] text and
//! never include an access token in their output.

use std::fmt::Write as _;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::{Tool, ToolExecutor, ToolResult};
use crate::auth::{session_id_prefix, AuthManager, SessionContext};
use crate::config::mask_client_id;
use crate::error::{Result, WayfarerError};

pub const LOGIN_TOOL: &str = "github_login";
pub const LOGOUT_TOOL: &str = "github_logout";
pub const STATUS_TOOL: &str = "github_auth_status";
pub const CONFIG_CHECK_TOOL: &str = "github_config_check";
pub const DEBUG_SESSIONS_TOOL: &str = "github_debug_sessions";

/// Steps shown whenever OAuth credentials are missing.
const SETUP_INSTRUCTIONS: &str = "To set up GitHub OAuth:
1. Create an OAuth App at https://github.com/settings/developers
2. Set the callback URL to <public_url>/auth/callback
3. Export GITHUB_CLIENT_ID, GITHUB_CLIENT_SECRET and GITHUB_REDIRECT_URI
4. Restart the server";

fn setup_message(public_url: &str, err: &anyhow::Error) -> String {
    format!(
        "{}\n\n{}",
        err,
        SETUP_INSTRUCTIONS.replace("<public_url>", public_url.trim_end_matches('/'))
    )
}

fn is_config_error(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<WayfarerError>(), Some(WayfarerError::Config(_)))
}

// ---------------------------------------------------------------------------
// github_login
// ---------------------------------------------------------------------------

/// Reports the current user, or where to go to log in.
pub struct LoginTool {
    manager: Arc<AuthManager>,
    public_url: String,
}

impl LoginTool {
    pub fn new(manager: Arc<AuthManager>, public_url: impl Into<String>) -> Self {
        Self {
            manager,
            public_url: public_url.into(),
        }
    }
}

#[async_trait]
impl ToolExecutor for LoginTool {
    fn tool_definition(&self) -> Value {
        Tool::without_parameters(
            LOGIN_TOOL,
            concat!(
                "Start GitHub OAuth login. ",
                "Returns the URL to open in a browser, or the logged-in user.",
            ),
        )
        .to_value()
    }

    async fn execute(&self, ctx: &SessionContext, _args: Value) -> Result<ToolResult> {
        if let Some(session) = self.manager.current_session(ctx) {
            let display = session.user.name.as_deref().unwrap_or(&session.user.login);
            return Ok(ToolResult::success(format!(
                "Already logged in as {} (@{}). Use '{}' to log out first.",
                display, session.user.login, LOGOUT_TOOL
            )));
        }

        match self.manager.credentials() {
            Ok(_) => {
                let url = format!("{}/auth/login", self.public_url.trim_end_matches('/'));
                Ok(ToolResult::success(format!(
                    "Open {} in your browser to log in with GitHub. \
                     After authorizing, call '{}' to confirm.",
                    url, STATUS_TOOL
                ))
                .with_metadata("login_url".to_string(), url))
            }
            Err(err) if is_config_error(&err) => {
                Ok(ToolResult::error(setup_message(&self.public_url, &err)))
            }
            Err(err) => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// github_logout
// ---------------------------------------------------------------------------

/// Clears every session.
pub struct LogoutTool {
    manager: Arc<AuthManager>,
}

impl LogoutTool {
    pub fn new(manager: Arc<AuthManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ToolExecutor for LogoutTool {
    fn tool_definition(&self) -> Value {
        Tool::without_parameters(LOGOUT_TOOL, "Log out of GitHub and clear all sessions.")
            .to_value()
    }

    async fn execute(&self, ctx: &SessionContext, _args: Value) -> Result<ToolResult> {
        let Some(session) = self.manager.current_session(ctx) else {
            return Ok(ToolResult::success("Not currently logged in.".to_string()));
        };

        let count = self.manager.logout();
        Ok(ToolResult::success(format!(
            "Logged out {}. Cleared {} session(s).",
            session.user.login, count
        ))
        .with_metadata("cleared".to_string(), count.to_string()))
    }
}

// ---------------------------------------------------------------------------
// github_auth_status
// ---------------------------------------------------------------------------

/// Describes the caller's login.
pub struct AuthStatusTool {
    manager: Arc<AuthManager>,
}

impl AuthStatusTool {
    pub fn new(manager: Arc<AuthManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ToolExecutor for AuthStatusTool {
    fn tool_definition(&self) -> Value {
        Tool::without_parameters(STATUS_TOOL, "Show the current GitHub login and session details.")
            .to_value()
    }

    async fn execute(&self, ctx: &SessionContext, _args: Value) -> Result<ToolResult> {
        let Some(session) = self.manager.current_session(ctx) else {
            return Ok(ToolResult::success(format!(
                "Not authenticated. Use the '{}' tool to log in.",
                LOGIN_TOOL
            )));
        };

        let user = &session.user;
        let mut out = String::from("Authenticated with GitHub\n\n");
        let _ = writeln!(out, "User: {}", user.login);
        if let Some(name) = &user.name {
            let _ = writeln!(out, "Name: {}", name);
        }
        if let Some(email) = &user.email {
            let _ = writeln!(out, "Email: {}", email);
        }
        if let Some(company) = &user.company {
            let _ = writeln!(out, "Company: {}", company);
        }
        if let Some(location) = &user.location {
            let _ = writeln!(out, "Location: {}", location);
        }
        let _ = writeln!(out, "Profile: {}", user.profile_url());
        let _ = writeln!(out, "\nToken type: {}", session.token_type);
        let scope = if session.scope.is_empty() {
            "(none)"
        } else {
            session.scope.as_str()
        };
        let _ = writeln!(out, "Scope: {}", scope);
        let _ = write!(out, "Logged in at: {}", session.created_at.to_rfc3339());

        Ok(ToolResult::success(out))
    }
}

// ---------------------------------------------------------------------------
// github_config_check
// ---------------------------------------------------------------------------

/// Reports whether OAuth credentials are configured, with secrets masked.
pub struct ConfigCheckTool {
    manager: Arc<AuthManager>,
    public_url: String,
}

impl ConfigCheckTool {
    pub fn new(manager: Arc<AuthManager>, public_url: impl Into<String>) -> Self {
        Self {
            manager,
            public_url: public_url.into(),
        }
    }
}

#[async_trait]
impl ToolExecutor for ConfigCheckTool {
    fn tool_definition(&self) -> Value {
        Tool::without_parameters(
            CONFIG_CHECK_TOOL,
            "Check the GitHub OAuth configuration without revealing secrets.",
        )
        .to_value()
    }

    async fn execute(&self, _ctx: &SessionContext, _args: Value) -> Result<ToolResult> {
        match self.manager.credentials() {
            Ok(credentials) => Ok(ToolResult::success(format!(
                concat!(
                    "GitHub OAuth is configured\n\n",
                    "Client ID: {}\n",
                    "Client Secret: ******** (hidden)\n",
                    "Redirect URI: {}",
                ),
                mask_client_id(&credentials.client_id),
                credentials.redirect_uri
            ))),
            Err(err) if is_config_error(&err) => {
                Ok(ToolResult::error(setup_message(&self.public_url, &err)))
            }
            Err(err) => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// github_debug_sessions
// ---------------------------------------------------------------------------

/// Lists stored sessions by id prefix.
pub struct DebugSessionsTool {
    manager: Arc<AuthManager>,
}

impl DebugSessionsTool {
    pub fn new(manager: Arc<AuthManager>) -> Self {
        Self { manager }
    }
}

#[async_trait]
impl ToolExecutor for DebugSessionsTool {
    fn tool_definition(&self) -> Value {
        Tool::without_parameters(
            DEBUG_SESSIONS_TOOL,
            "List stored sessions (id prefix, user, creation time, validity).",
        )
        .to_value()
    }

    async fn execute(&self, ctx: &SessionContext, _args: Value) -> Result<ToolResult> {
        let sessions = self.manager.sessions().list();
        let mut out = format!("Total sessions: {}\n", sessions.len());

        for (id, session) in &sessions {
            let _ = writeln!(
                out,
                "- {} user={} created={} valid={}",
                session_id_prefix(id),
                session.user.login,
                session.created_at.to_rfc3339(),
                session.is_valid()
            );
        }

        let current = self
            .manager
            .current_session_entry(ctx)
            .map(|(id, session)| format!("{} ({})", session_id_prefix(&id), session.user.login))
            .unwrap_or_else(|| "none".to_string());
        let _ = write!(out, "Current session: {}", current);

        Ok(ToolResult::success(out).with_metadata("total".to_string(), sessions.len().to_string()))
    }
}
