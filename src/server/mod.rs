//! HTTP server
//!
//! Serves the `/auth/*` login routes, the tool endpoints and the auth
//! resources over axum. All handlers share one [`AppState`] holding the
//! explicitly constructed [`AuthManager`] and the tool registry.
//!
//! Each request's session id is read from the `wayfarer_session` cookie or
//! the `x-session-id` header and handed to the handler as a
//! [`SessionContext`] through the [`CallerSession`] extractor.

pub mod routes;
pub mod tools;

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Router;
use axum_extra::extract::CookieJar;

use crate::auth::{AuthManager, SessionContext};
use crate::collaborators::{PromptBuilder, WeatherProvider};
use crate::config::Config;
use crate::error::{Result, WayfarerError};
use crate::tools::registry_builder::ToolRegistryBuilder;
use crate::tools::ToolRegistry;

/// Cookie carrying the caller's session id.
pub const SESSION_COOKIE: &str = "wayfarer_session";

/// Header carrying the caller's session id, for non-browser clients.
pub const SESSION_HEADER: &str = "x-session-id";

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

/// State shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub manager: Arc<AuthManager>,
    pub tools: Arc<ToolRegistry>,
    /// Mark the session cookie `Secure`
    pub secure_cookies: bool,
}

impl AppState {
    /// Builds the manager and tool registry from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::Config`] if the identity provider client
    /// cannot be created.
    pub fn from_config(config: &Config) -> Result<Self> {
        let manager = Arc::new(AuthManager::from_config(&config.auth)?);
        let tools =
            ToolRegistryBuilder::new(Arc::clone(&manager), config.server.public_url.clone())
                .build();
        Ok(Self::new(manager, tools, &config.server.public_url))
    }

    /// Assembles state from prebuilt parts.
    pub fn new(manager: Arc<AuthManager>, tools: ToolRegistry, public_url: &str) -> Self {
        Self {
            manager,
            tools: Arc::new(tools),
            secure_cookies: public_url.starts_with("https://"),
        }
    }

    /// Same as [`from_config`](Self::from_config), with the itinerary tool's
    /// collaborators registered.
    pub fn with_collaborators(
        config: &Config,
        weather: Arc<dyn WeatherProvider>,
        prompts: Arc<dyn PromptBuilder>,
    ) -> Result<Self> {
        let manager = Arc::new(AuthManager::from_config(&config.auth)?);
        let tools = ToolRegistryBuilder::new(Arc::clone(&manager), config.server.public_url.clone())
            .with_collaborators(weather, prompts)
            .build();
        Ok(Self::new(manager, tools, &config.server.public_url))
    }
}

// ---------------------------------------------------------------------------
// CallerSession extractor
// ---------------------------------------------------------------------------

/// The session context presented by a request.
///
/// The cookie wins over the header when both are present. Never rejects; a
/// request without either is anonymous.
#[derive(Debug, Clone)]
pub struct CallerSession(pub SessionContext);

#[axum::async_trait]
impl<S> FromRequestParts<S> for CallerSession
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let from_cookie = CookieJar::from_headers(&parts.headers)
            .get(SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string());
        let from_header = || {
            parts
                .headers
                .get(SESSION_HEADER)
                .and_then(|value| value.to_str().ok())
                .map(str::to_string)
        };

        Ok(CallerSession(SessionContext::from_option(
            from_cookie.filter(|id| !id.is_empty()).or_else(from_header),
        )))
    }
}

// ---------------------------------------------------------------------------
// Router and serve loop
// ---------------------------------------------------------------------------

/// Builds the application router.
///
/// The `/auth/*` routes and resources are only mounted when OAuth is
/// enabled; `/tools` is always available.
pub fn router(state: AppState) -> Router {
    let mut app: Router<AppState> = tools::tool_routes();

    if state.manager.config().enabled {
        app = app
            .merge(routes::auth_routes())
            .merge(tools::resource_routes());
    }

    app.with_state(state)
}

/// Runs the server until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(config: Config, state: AppState) -> Result<()> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| WayfarerError::Config(format!("failed to bind {}: {}", addr, e)))?;

    let reaper = state
        .manager
        .config()
        .enabled
        .then(|| state.manager.spawn_reaper());

    tracing::info!(
        address = %addr,
        public_url = %config.server.public_url,
        oauth_enabled = config.auth.enabled,
        binding = ?config.auth.binding,
        tools = state.tools.len(),
        "Wayfarer listening"
    );

    let result = axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await;

    if let Some(handle) = reaper {
        handle.abort();
    }

    result.map_err(WayfarerError::Io)?;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
