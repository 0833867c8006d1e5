//! Authentication guard for protected operations
//!
//! The guard resolves the caller's session before running an operation. A
//! missing or invalid session is a routine outcome, so it is returned as a
//! [`Denial`] value inside [`Guarded::Denied`] rather than as an error. The
//! guard never mutates session state.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;

use super::current::{SessionContext, SessionLookup};
use super::manager::AuthManager;
use super::session::AuthSession;
use crate::error::Result;
use crate::tools::{ToolExecutor, ToolResult};

const RELOGIN_HINT: &str = "Please re-authenticate with the 'github_login' tool.";

// ---------------------------------------------------------------------------
// Denial
// ---------------------------------------------------------------------------

/// Why a protected operation was not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum Denial {
    /// No session resolved for the caller.
    NotAuthenticated { message: String },
    /// A session resolved but failed the validity check.
    InvalidSession {
        username: Option<String>,
        message: String,
    },
}

impl Denial {
    fn not_authenticated() -> Self {
        Denial::NotAuthenticated {
            message: format!("Not authenticated. {}", RELOGIN_HINT),
        }
    }

    fn invalid_session(session: &AuthSession) -> Self {
        let username = Some(session.user.login.clone()).filter(|login| !login.is_empty());
        let message = match &username {
            Some(name) => format!("Session for '{}' is no longer valid. {}", name, RELOGIN_HINT),
            None => format!("Session is no longer valid. {}", RELOGIN_HINT),
        };
        Denial::InvalidSession { username, message }
    }

    /// User-facing explanation, including the remediation step.
    pub fn message(&self) -> &str {
        match self {
            Denial::NotAuthenticated { message } => message,
            Denial::InvalidSession { message, .. } => message,
        }
    }

    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Denial::NotAuthenticated { .. } => "not_authenticated",
            Denial::InvalidSession { .. } => "invalid_session",
        }
    }
}

impl std::fmt::Display for Denial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Outcome of a guarded operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guarded<T> {
    /// The operation ran; its result is passed through unchanged.
    Allowed(T),
    /// The operation was not run.
    Denied(Denial),
}

impl<T> Guarded<T> {
    pub fn is_denied(&self) -> bool {
        matches!(self, Guarded::Denied(_))
    }

    pub fn denial(&self) -> Option<&Denial> {
        match self {
            Guarded::Denied(denial) => Some(denial),
            Guarded::Allowed(_) => None,
        }
    }
}

// ---------------------------------------------------------------------------
// AuthGuard
// ---------------------------------------------------------------------------

/// Runs operations only for callers with a valid session.
#[derive(Debug, Clone)]
pub struct AuthGuard {
    manager: Arc<AuthManager>,
}

impl AuthGuard {
    pub fn new(manager: Arc<AuthManager>) -> Self {
        Self { manager }
    }

    /// Resolves the caller's session or the reason there is none.
    pub fn check(&self, ctx: &SessionContext) -> std::result::Result<AuthSession, Denial> {
        match self.manager.resolve(ctx) {
            SessionLookup::Active { session, .. } => Ok(session),
            SessionLookup::Invalid { session, .. } => Err(Denial::invalid_session(&session)),
            SessionLookup::Missing => Err(Denial::not_authenticated()),
        }
    }

    /// Runs `op` with the caller's session, or returns the denial without
    /// running it.
    pub async fn run<F, Fut, T>(&self, ctx: &SessionContext, op: F) -> Guarded<T>
    where
        F: FnOnce(AuthSession) -> Fut,
        Fut: Future<Output = T>,
    {
        match self.check(ctx) {
            Ok(session) => Guarded::Allowed(op(session).await),
            Err(denial) => {
                tracing::debug!(reason = denial.reason(), "Guard denied protected operation");
                Guarded::Denied(denial)
            }
        }
    }

    /// Wraps a tool so every execution goes through [`run`](Self::run).
    pub fn wrap(&self, tool: Arc<dyn ToolExecutor>) -> GuardedTool {
        GuardedTool {
            guard: self.clone(),
            inner: tool,
        }
    }
}

// ---------------------------------------------------------------------------
// GuardedTool
// ---------------------------------------------------------------------------

/// A tool that is only executed for authenticated callers.
///
/// Denials become a failed [`ToolResult`] tagged with a `denial` metadata
/// entry; they are never returned as `Err`.
pub struct GuardedTool {
    guard: AuthGuard,
    inner: Arc<dyn ToolExecutor>,
}

#[async_trait]
impl ToolExecutor for GuardedTool {
    fn tool_definition(&self) -> serde_json::Value {
        self.inner.tool_definition()
    }

    async fn execute(&self, ctx: &SessionContext, args: serde_json::Value) -> Result<ToolResult> {
        let inner = Arc::clone(&self.inner);
        match self
            .guard
            .run(ctx, |_session| async move { inner.execute(ctx, args).await })
            .await
        {
            Guarded::Allowed(result) => result,
            Guarded::Denied(denial) => Ok(ToolResult::error(denial.message().to_string())
                .with_metadata("denial".to_string(), denial.reason().to_string())),
        }
    }
}
