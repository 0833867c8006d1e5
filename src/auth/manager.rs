//! OAuth login flow controller
//!
//! [`AuthManager`] owns the state-token store, the session store and the
//! current-session pointer, and drives the login round-trip:
//!
//! ```text
//! begin_login     -> issue state -> authorize URL      (AWAITING_CALLBACK)
//! complete_login  -> validate state                    (InvalidState on failure)
//!                 -> exchange code                     (Exchange on failure)
//!                 -> fetch profile                     (ProfileFetch on failure)
//!                 -> create session, set current       (DONE)
//! ```
//!
//! The manager is constructed explicitly and shared behind an `Arc`; there
//! is no global instance. Store locks are only held for the duration of a
//! single map operation and never across the provider calls.
//!
//! # Examples
//!
//! ```
//! use wayfarer::auth::AuthManager;
//! use wayfarer::config::AuthConfig;
//!
//! # fn main() -> wayfarer::error::Result<()> {
//! let config = AuthConfig {
//!     client_id: Some("Iv1.example".to_string()),
//!     client_secret: Some("secret".to_string()),
//!     redirect_uri: Some("http://localhost:8000/auth/callback".to_string()),
//!     ..Default::default()
//! };
//! let manager = AuthManager::from_config(&config)?;
//!
//! let url = manager.begin_login()?;
//! assert!(url.contains("client_id=Iv1.example"));
//! assert!(url.contains("state="));
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use super::current::{CurrentSession, SessionContext, SessionLookup};
use super::provider::{GitHubProvider, IdentityProvider};
use super::session::{AuthSession, IdentityUser, SessionStore, SessionSummary};
use super::state_store::{spawn_state_reaper, StateStore};
use super::session_id_prefix;
use crate::config::{AuthConfig, OAuthCredentials, SessionBinding};
use crate::error::{Result, WayfarerError};

// ---------------------------------------------------------------------------
// AuthStatus
// ---------------------------------------------------------------------------

/// Login status as reported to callers. Never carries the access token.
#[derive(Debug, Clone, Serialize)]
pub struct AuthStatus {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<IdentityUser>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<SessionSummary>,
}

impl AuthStatus {
    fn anonymous() -> Self {
        Self {
            authenticated: false,
            user: None,
            session: None,
        }
    }
}

// ---------------------------------------------------------------------------
// AuthManager
// ---------------------------------------------------------------------------

/// Owner of all login and session state for one server instance.
pub struct AuthManager {
    config: AuthConfig,
    provider: Arc<dyn IdentityProvider>,
    states: Arc<StateStore>,
    sessions: SessionStore,
    current: CurrentSession,
}

impl std::fmt::Debug for AuthManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthManager")
            .field("binding", &self.config.binding)
            .field("pending_states", &self.states.len())
            .field("sessions", &self.sessions.len())
            .finish()
    }
}

impl AuthManager {
    /// Creates a manager that talks to `provider`.
    pub fn new(config: AuthConfig, provider: Arc<dyn IdentityProvider>) -> Self {
        let states = Arc::new(StateStore::new(Duration::from_secs(config.state_ttl_seconds)));
        let current = CurrentSession::new(config.session_hint.clone());
        Self {
            config,
            provider,
            states,
            sessions: SessionStore::new(),
            current,
        }
    }

    /// Creates a manager backed by GitHub.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::Config`] if the HTTP client cannot be built.
    pub fn from_config(config: &AuthConfig) -> Result<Self> {
        let provider = GitHubProvider::new(config)?;
        Ok(Self::new(config.clone(), Arc::new(provider)))
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn binding(&self) -> SessionBinding {
        self.config.binding
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn state_store(&self) -> &StateStore {
        &self.states
    }

    /// Credentials required to log in.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::Config`] listing any missing values.
    pub fn credentials(&self) -> Result<OAuthCredentials> {
        self.config.credentials()
    }

    /// Starts the periodic sweep of abandoned `state` tokens.
    pub fn spawn_reaper(&self) -> tokio::task::JoinHandle<()> {
        spawn_state_reaper(
            Arc::clone(&self.states),
            Duration::from_secs(self.config.sweep_interval_seconds),
        )
    }

    // -----------------------------------------------------------------------
    // Login flow
    // -----------------------------------------------------------------------

    /// Issues a `state` token and returns the provider authorize URL.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::Config`] when OAuth credentials are missing.
    /// No state token is issued in that case.
    pub fn begin_login(&self) -> Result<String> {
        let credentials = self.credentials()?;
        let state = self.states.issue();
        let url = self.provider.authorize_url(&credentials, &state)?;
        tracing::info!(pending_states = self.states.len(), "Issued OAuth authorize URL");
        Ok(url)
    }

    /// Finishes a login round-trip and returns the new session id.
    ///
    /// The new session becomes the current session.
    ///
    /// # Errors
    ///
    /// - [`WayfarerError::InvalidState`] if `state` is unknown, reused or
    ///   expired
    /// - [`WayfarerError::Config`] if credentials are missing
    /// - [`WayfarerError::Exchange`] if the code exchange fails
    /// - [`WayfarerError::ProfileFetch`] if the profile lookup fails
    pub async fn complete_login(&self, code: &str, state: &str) -> Result<String> {
        let Some(issued) = self.states.take(state) else {
            tracing::warn!("OAuth callback with invalid or expired state");
            return Err(WayfarerError::InvalidState.into());
        };
        tracing::debug!(
            state_age_secs = (chrono::Utc::now() - issued.created_at).num_seconds(),
            "OAuth state accepted"
        );

        let credentials = self.credentials()?;

        let grant = self.provider.exchange_code(&credentials, code).await?;
        let user = self.provider.fetch_user(&grant.access_token).await?;
        let login = user.login.clone();

        let session_id = self
            .sessions
            .create(grant.access_token, grant.token_type, grant.scope, user);
        self.current.set(&session_id);

        tracing::info!(
            user = %login,
            session = %session_id_prefix(&session_id),
            "GitHub login completed"
        );
        Ok(session_id)
    }

    // -----------------------------------------------------------------------
    // Session queries
    // -----------------------------------------------------------------------

    /// Resolves the session for a call under the configured binding.
    pub fn lookup(&self, ctx: &SessionContext) -> SessionLookup {
        self.current.lookup(&self.sessions, ctx, self.config.binding)
    }

    /// Same as [`lookup`](Self::lookup), but never moves the pointer.
    pub fn resolve(&self, ctx: &SessionContext) -> SessionLookup {
        self.current.resolve(&self.sessions, ctx, self.config.binding)
    }

    /// The valid session for a call, if any.
    pub fn current_session(&self, ctx: &SessionContext) -> Option<AuthSession> {
        self.lookup(ctx).active().map(|(_, session)| session)
    }

    /// Id and session for a call, if a valid one resolves.
    pub fn current_session_entry(&self, ctx: &SessionContext) -> Option<(String, AuthSession)> {
        self.lookup(ctx).active()
    }

    /// Login status for a call.
    pub fn status(&self, ctx: &SessionContext) -> AuthStatus {
        match self.current_session(ctx) {
            Some(session) => AuthStatus {
                authenticated: true,
                session: Some(session.summary()),
                user: Some(session.user),
            },
            None => AuthStatus::anonymous(),
        }
    }

    /// The explicit current-session pointer, without resolving fallbacks.
    pub fn current_session_id(&self) -> Option<String> {
        self.current.current_id()
    }

    // -----------------------------------------------------------------------
    // Logout
    // -----------------------------------------------------------------------

    /// Deletes every session and clears the pointer; returns how many
    /// sessions were removed.
    pub fn delete_all(&self) -> usize {
        let count = self.sessions.delete_all();
        self.current.clear();
        count
    }

    /// Logs everyone out. Same as [`delete_all`](Self::delete_all).
    pub fn logout(&self) -> usize {
        let count = self.delete_all();
        tracing::info!(count, "Cleared all sessions");
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::provider::TokenGrant;
    use crate::auth::session::tests::user;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider stub that hands out a fixed token and profile.
    struct StubProvider {
        login: String,
        exchanges: AtomicUsize,
        fail_exchange: bool,
        fail_profile: bool,
    }

    impl StubProvider {
        fn ok(login: &str) -> Self {
            Self {
                login: login.to_string(),
                exchanges: AtomicUsize::new(0),
                fail_exchange: false,
                fail_profile: false,
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for StubProvider {
        fn authorize_url(&self, credentials: &OAuthCredentials, state: &str) -> Result<String> {
            Ok(format!(
                "https://example.test/authorize?client_id={}&state={}",
                credentials.client_id, state
            ))
        }

        async fn exchange_code(
            &self,
            _credentials: &OAuthCredentials,
            code: &str,
        ) -> Result<TokenGrant> {
            self.exchanges.fetch_add(1, Ordering::SeqCst);
            if self.fail_exchange {
                return Err(WayfarerError::Exchange("bad_verification_code".to_string()).into());
            }
            Ok(TokenGrant {
                access_token: format!("gho_{}", code),
                token_type: "bearer".to_string(),
                scope: "read:user,user:email".to_string(),
            })
        }

        async fn fetch_user(&self, _access_token: &str) -> Result<IdentityUser> {
            if self.fail_profile {
                let detail = "user endpoint returned 500".to_string();
                return Err(WayfarerError::ProfileFetch(detail).into());
            }
            Ok(user(&self.login))
        }
    }

    fn configured() -> AuthConfig {
        AuthConfig {
            client_id: Some("Iv1.stub-client".to_string()),
            client_secret: Some("stub-secret".to_string()),
            redirect_uri: Some("http://localhost:8000/auth/callback".to_string()),
            ..Default::default()
        }
    }

    fn state_from(url: &str) -> String {
        let parsed = url::Url::parse(url).unwrap();
        parsed
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    #[test]
    fn test_begin_login_without_credentials_is_config_error() {
        let manager =
            AuthManager::new(AuthConfig::default(), Arc::new(StubProvider::ok("octocat")));
        let err = manager.begin_login().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WayfarerError>(),
            Some(WayfarerError::Config(_))
        ));
        assert!(manager.state_store().is_empty());
    }

    #[tokio::test]
    async fn test_complete_login_sets_current_session() {
        let manager = AuthManager::new(configured(), Arc::new(StubProvider::ok("octocat")));
        let url = manager.begin_login().unwrap();
        assert!(url.contains("client_id=Iv1.stub-client"));

        let id = manager.complete_login("abc", &state_from(&url)).await.unwrap();
        let session = manager.current_session(&SessionContext::anonymous()).unwrap();
        assert_eq!(session.user.login, "octocat");
        assert_eq!(session.access_token, "gho_abc");
        assert_eq!(manager.current_session_id(), Some(id));
    }

    #[tokio::test]
    async fn test_complete_login_rejects_reused_state() {
        let provider = Arc::new(StubProvider::ok("octocat"));
        let manager = AuthManager::new(configured(), provider.clone());
        let state = state_from(&manager.begin_login().unwrap());

        manager.complete_login("one", &state).await.unwrap();
        let err = manager.complete_login("two", &state).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WayfarerError>(),
            Some(WayfarerError::InvalidState)
        ));
        assert_eq!(provider.exchanges.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exchange_failure_creates_no_session() {
        let provider = StubProvider {
            fail_exchange: true,
            ..StubProvider::ok("octocat")
        };
        let manager = AuthManager::new(configured(), Arc::new(provider));
        let state = state_from(&manager.begin_login().unwrap());

        let err = manager.complete_login("abc", &state).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WayfarerError>(),
            Some(WayfarerError::Exchange(_))
        ));
        assert!(manager.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_profile_failure_creates_no_session() {
        let provider = StubProvider {
            fail_profile: true,
            ..StubProvider::ok("octocat")
        };
        let manager = AuthManager::new(configured(), Arc::new(provider));
        let state = state_from(&manager.begin_login().unwrap());

        let err = manager.complete_login("abc", &state).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WayfarerError>(),
            Some(WayfarerError::ProfileFetch(_))
        ));
        assert!(manager.sessions().is_empty());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let manager = AuthManager::new(configured(), Arc::new(StubProvider::ok("octocat")));
        for code in ["a", "b"] {
            let state = state_from(&manager.begin_login().unwrap());
            manager.complete_login(code, &state).await.unwrap();
        }

        assert_eq!(manager.logout(), 2);
        assert!(manager.current_session(&SessionContext::anonymous()).is_none());
        assert!(manager.current_session_id().is_none());
        assert_eq!(manager.logout(), 0);
    }

    #[test]
    fn test_status_for_anonymous_caller() {
        let manager = AuthManager::new(configured(), Arc::new(StubProvider::ok("octocat")));
        let status = manager.status(&SessionContext::anonymous());
        assert!(!status.authenticated);
        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json, serde_json::json!({ "authenticated": false }));
    }

    #[tokio::test]
    async fn test_status_never_contains_token() {
        let manager = AuthManager::new(configured(), Arc::new(StubProvider::ok("octocat")));
        let state = state_from(&manager.begin_login().unwrap());
        manager.complete_login("zzz", &state).await.unwrap();

        let status = manager.status(&SessionContext::anonymous());
        let json = serde_json::to_string(&status).unwrap();
        assert!(status.authenticated);
        assert!(!json.contains("gho_zzz"));
        assert!(json.contains("octocat"));
    }

    #[tokio::test]
    async fn test_per_caller_binding_requires_session_id() {
        let config = AuthConfig {
            binding: SessionBinding::PerCaller,
            ..configured()
        };
        let manager = AuthManager::new(config, Arc::new(StubProvider::ok("octocat")));
        let state = state_from(&manager.begin_login().unwrap());
        let id = manager.complete_login("abc", &state).await.unwrap();

        assert!(manager.current_session(&SessionContext::anonymous()).is_none());
        assert!(manager
            .current_session(&SessionContext::with_session(id))
            .is_some());
    }
}
