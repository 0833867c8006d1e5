//! Authenticated sessions
//!
//! A session is created once per successful login and holds the provider
//! access token together with a snapshot of the user's profile taken at
//! login time. The snapshot is never refreshed.
//!
//! Access tokens never leave this module in serialized form: [`AuthSession`]
//! is not `Serialize`, its `Debug` output is redacted, and user-facing
//! payloads are built from [`SessionSummary`] instead.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// IdentityUser
// ---------------------------------------------------------------------------

/// Profile snapshot returned by the identity provider's user endpoint.
///
/// Unknown fields in the provider response are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityUser {
    /// Numeric account id.
    pub id: u64,
    /// Account handle, e.g. `octocat`.
    pub login: String,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Public email address.
    #[serde(default)]
    pub email: Option<String>,
    /// Avatar image URL.
    #[serde(default)]
    pub avatar_url: String,
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    /// Account creation date as reported by the provider.
    #[serde(default)]
    pub created_at: Option<String>,
}

impl IdentityUser {
    /// Link to the user's public GitHub profile.
    pub fn profile_url(&self) -> String {
        format!("https://github.com/{}", self.login)
    }
}

// ---------------------------------------------------------------------------
// AuthSession
// ---------------------------------------------------------------------------

/// A completed login.
#[derive(Clone)]
pub struct AuthSession {
    /// Provider access token. Sensitive.
    pub access_token: String,
    /// Grant type reported by the provider, typically `bearer`.
    pub token_type: String,
    /// Space-separated granted scopes.
    pub scope: String,
    /// Profile snapshot taken at login.
    pub user: IdentityUser,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("user", &self.user.login)
            .field("created_at", &self.created_at)
            .finish()
    }
}

impl AuthSession {
    /// Builds a session stamped with the current time.
    pub fn new(
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        scope: impl Into<String>,
        user: IdentityUser,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: token_type.into(),
            scope: scope.into(),
            user,
            created_at: Utc::now(),
        }
    }

    /// Replaces the creation timestamp.
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Structural validity: a non-empty access token and a user snapshot
    /// with a login.
    ///
    /// The provider is never consulted, so a revoked token still counts as
    /// valid here.
    ///
    /// # Examples
    ///
    /// ```
    /// use wayfarer::auth::session::{AuthSession, IdentityUser};
    ///
    /// let user = IdentityUser {
    ///     id: 1,
    ///     login: "octocat".to_string(),
    ///     name: None,
    ///     email: None,
    ///     avatar_url: String::new(),
    ///     bio: None,
    ///     location: None,
    ///     company: None,
    ///     created_at: None,
    /// };
    ///
    /// assert!(AuthSession::new("gho_abc", "bearer", "read:user", user.clone()).is_valid());
    /// assert!(!AuthSession::new("", "bearer", "read:user", user).is_valid());
    /// ```
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.user.login.is_empty()
    }

    /// Token-free view suitable for status payloads.
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            token_type: self.token_type.clone(),
            scope: self.scope.clone(),
            created_at: self.created_at,
        }
    }
}

/// The grant shape of a session without its credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub token_type: String,
    pub scope: String,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Thread-safe mapping of session id to [`AuthSession`].
///
/// Session ids come from a cryptographically secure source, so inserts never
/// collide in practice.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, AuthSession>>,
}

impl SessionStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a session stamped with the current time and returns its id.
    pub fn create(
        &self,
        access_token: impl Into<String>,
        token_type: impl Into<String>,
        scope: impl Into<String>,
        user: IdentityUser,
    ) -> String {
        self.insert(AuthSession::new(access_token, token_type, scope, user))
    }

    /// Stores a prebuilt session under a fresh id and returns the id.
    pub fn insert(&self, session: AuthSession) -> String {
        let session_id = super::random_token();
        self.write().insert(session_id.clone(), session);
        session_id
    }

    /// Looks up a session by id.
    pub fn get(&self, session_id: &str) -> Option<AuthSession> {
        self.read().get(session_id).cloned()
    }

    /// Removes one session; returns whether it existed.
    pub fn delete(&self, session_id: &str) -> bool {
        self.write().remove(session_id).is_some()
    }

    /// Removes every session and returns how many there were.
    pub fn delete_all(&self) -> usize {
        let mut sessions = self.write();
        let count = sessions.len();
        sessions.clear();
        count
    }

    /// The session with the latest `created_at`, with its id.
    pub fn most_recent(&self) -> Option<(String, AuthSession)> {
        self.read()
            .iter()
            .max_by_key(|(_, session)| session.created_at)
            .map(|(id, session)| (id.clone(), session.clone()))
    }

    /// All sessions ordered oldest first.
    pub fn list(&self) -> Vec<(String, AuthSession)> {
        let mut all: Vec<(String, AuthSession)> = self
            .read()
            .iter()
            .map(|(id, session)| (id.clone(), session.clone()))
            .collect();
        all.sort_by_key(|(_, session)| session.created_at);
        all
    }

    /// Number of stored sessions.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, AuthSession>> {
        self.sessions.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, AuthSession>> {
        self.sessions.write().unwrap_or_else(PoisonError::into_inner)
    }
}
