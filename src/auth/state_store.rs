//! One-time OAuth `state` tokens
//!
//! A `state` token binds an authorize-URL issuance to its callback. Checking
//! a token always removes it, so a token can succeed at most once. Tokens
//! that are never checked are removed by [`StateStore::sweep`], which the
//! server runs periodically through [`spawn_state_reaper`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};

/// Default lifetime of a `state` token.
pub const DEFAULT_STATE_TTL: Duration = Duration::from_secs(600);

/// An in-flight authorization attempt.
#[derive(Debug, Clone)]
pub struct StateToken {
    /// Opaque random token sent as the OAuth `state` parameter.
    pub token: String,
    /// When the token was issued.
    pub created_at: DateTime<Utc>,
    /// Optional data carried across the redirect; empty by default.
    pub payload: HashMap<String, serde_json::Value>,
}

/// Thread-safe store of outstanding `state` tokens.
///
/// # Examples
///
/// ```
/// use wayfarer::auth::state_store::StateStore;
///
/// let store = StateStore::default();
/// let token = store.issue();
/// assert!(store.validate(&token));
/// // Tokens are single use.
/// assert!(!store.validate(&token));
/// ```
#[derive(Debug)]
pub struct StateStore {
    entries: Mutex<HashMap<String, StateToken>>,
    ttl: chrono::Duration,
}

impl Default for StateStore {
    fn default() -> Self {
        Self::new(DEFAULT_STATE_TTL)
    }
}

impl StateStore {
    /// Creates an empty store whose tokens expire after `ttl`.
    pub fn new(ttl: Duration) -> Self {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or(chrono::Duration::MAX);
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Issues a fresh token with an empty payload.
    ///
    /// The token is inserted before it is returned, so it is visible to any
    /// later [`validate`](Self::validate) call.
    pub fn issue(&self) -> String {
        self.insert_at(super::random_token(), Utc::now(), HashMap::new())
    }

    fn insert_at(
        &self,
        token: String,
        created_at: DateTime<Utc>,
        payload: HashMap<String, serde_json::Value>,
    ) -> String {
        let entry = StateToken {
            token: token.clone(),
            created_at,
            payload,
        };
        self.lock().insert(token.clone(), entry);
        token
    }

    /// Consumes `token` and reports whether it was issued here and is still
    /// fresh.
    pub fn validate(&self, token: &str) -> bool {
        self.validate_at(token, Utc::now())
    }

    /// Same as [`validate`](Self::validate) with an explicit clock reading.
    pub fn validate_at(&self, token: &str, now: DateTime<Utc>) -> bool {
        self.take_at(token, now).is_some()
    }

    /// Consumes `token`, returning the entry only when it is still fresh.
    ///
    /// The entry is removed whether or not it has expired.
    pub fn take(&self, token: &str) -> Option<StateToken> {
        self.take_at(token, Utc::now())
    }

    fn take_at(&self, token: &str, now: DateTime<Utc>) -> Option<StateToken> {
        let entry = self.lock().remove(token)?;
        if now - entry.created_at < self.ttl {
            Some(entry)
        } else {
            tracing::debug!("Rejected expired OAuth state token");
            None
        }
    }

    /// Removes every expired token and returns how many were dropped.
    pub fn sweep(&self) -> usize {
        self.sweep_at(Utc::now())
    }

    /// Same as [`sweep`](Self::sweep) with an explicit clock reading.
    pub fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        let ttl = self.ttl;
        entries.retain(|_, entry| now - entry.created_at < ttl);
        before - entries.len()
    }

    /// Number of outstanding tokens.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no tokens are outstanding.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, StateToken>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Spawns a background task that sweeps expired tokens every `every`.
///
/// The task runs until the returned handle is aborted or the runtime stops.
pub fn spawn_state_reaper(store: Arc<StateStore>, every: Duration) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = store.sweep();
            if removed > 0 {
                tracing::debug!(removed, "Swept expired OAuth state tokens");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // -----------------------------------------------------------------------
    // issue / validate
    // -----------------------------------------------------------------------

    #[test]
    fn test_validate_immediately_after_issue_succeeds_once() {
        let store = StateStore::default();
        let token = store.issue();
        assert!(store.validate(&token));
        assert!(!store.validate(&token));
    }

    #[test]
    fn test_validate_unknown_token_fails() {
        let store = StateStore::default();
        assert!(!store.validate("never-issued"));
    }

    #[test]
    fn test_token_older_than_ttl_fails_on_first_use() {
        let store = StateStore::default();
        let token = store.issue();
        let later = Utc::now() + chrono::Duration::seconds(601);
        assert!(!store.validate_at(&token, later));
        // The failed check still consumed it.
        assert!(store.is_empty());
    }

    #[test]
    fn test_token_at_exact_ttl_boundary_fails() {
        let store = StateStore::default();
        let issued = Utc::now();
        let token = store.insert_at("fixed".to_string(), issued, HashMap::new());
        assert!(!store.validate_at(&token, issued + chrono::Duration::seconds(600)));
    }

    #[test]
    fn test_token_just_inside_ttl_succeeds() {
        let store = StateStore::default();
        let issued = Utc::now();
        let token = store.insert_at("fixed".to_string(), issued, HashMap::new());
        assert!(store.validate_at(&token, issued + chrono::Duration::seconds(599)));
    }

    #[test]
    fn test_issued_tokens_are_unique() {
        let store = StateStore::default();
        let a = store.issue();
        let b = store.issue();
        assert_ne!(a, b);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_payload_survives_until_take() {
        let store = StateStore::default();
        let mut payload = HashMap::new();
        payload.insert("return_to".to_string(), serde_json::json!("/tools"));
        let token = store.insert_at("with-payload".to_string(), Utc::now(), payload);

        let entry = store.take(&token).expect("fresh token");
        assert_eq!(entry.payload["return_to"], "/tools");
        assert!(store.take(&token).is_none());
    }

    #[test]
    fn test_custom_ttl_is_honoured() {
        let store = StateStore::new(Duration::from_secs(5));
        let issued = Utc::now();
        let token = store.insert_at("short".to_string(), issued, HashMap::new());
        assert!(!store.validate_at(&token, issued + chrono::Duration::seconds(6)));
    }

    // -----------------------------------------------------------------------
    // sweep
    // -----------------------------------------------------------------------

    #[test]
    fn test_sweep_removes_only_expired_tokens() {
        let store = StateStore::default();
        let now = Utc::now();
        store.insert_at(
            "old".to_string(),
            now - chrono::Duration::seconds(700),
            HashMap::new(),
        );
        store.insert_at("fresh".to_string(), now, HashMap::new());

        assert_eq!(store.sweep_at(now), 1);
        assert_eq!(store.len(), 1);
        assert!(store.validate_at("fresh", now));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reaper_sweeps_in_background() {
        let store = Arc::new(StateStore::new(Duration::from_secs(1)));
        store.insert_at(
            "stale".to_string(),
            Utc::now() - chrono::Duration::seconds(10),
            HashMap::new(),
        );

        let handle = spawn_state_reaper(Arc::clone(&store), Duration::from_secs(30));
        tokio::time::sleep(Duration::from_secs(31)).await;
        // Let the reaper task run after the timer fires.
        tokio::task::yield_now().await;

        assert!(store.is_empty());
        handle.abort();
    }
}
