//! Current-session resolution
//!
//! Every authenticated call carries a [`SessionContext`] holding the session
//! id its request presented (cookie or header), if any. How far resolution
//! goes beyond that id depends on [`SessionBinding`]:
//!
//! - `PerCaller`: only the caller's own session id counts.
//! - `SingleUser`: the caller's id, then the explicit pointer, then the
//!   out-of-band hint, then the most recently created session.
//!
//! Each step only accepts a session that passes
//! [`AuthSession::is_valid`](super::session::AuthSession::is_valid).

use std::sync::{Mutex, MutexGuard, PoisonError};

use super::session::{AuthSession, SessionStore};
use crate::config::SessionBinding;

// ---------------------------------------------------------------------------
// SessionContext
// ---------------------------------------------------------------------------

/// The session identity a single call presents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    session_id: Option<String>,
}

impl SessionContext {
    /// A call that presented no session id.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// A call that presented `session_id`.
    pub fn with_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
        }
    }

    /// Builds a context from an optional id, ignoring empty strings.
    pub fn from_option(session_id: Option<String>) -> Self {
        Self {
            session_id: session_id.filter(|id| !id.is_empty()),
        }
    }

    /// The presented session id.
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }
}

// ---------------------------------------------------------------------------
// SessionLookup
// ---------------------------------------------------------------------------

/// Outcome of resolving the session for a call.
#[derive(Debug, Clone)]
pub enum SessionLookup {
    /// A valid session was found.
    Active {
        session_id: String,
        session: AuthSession,
    },
    /// A session was found but failed the validity check.
    Invalid {
        session_id: String,
        session: AuthSession,
    },
    /// Nothing resolved.
    Missing,
}

impl SessionLookup {
    /// The active session, if any.
    pub fn active(self) -> Option<(String, AuthSession)> {
        match self {
            SessionLookup::Active {
                session_id,
                session,
            } => Some((session_id, session)),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// CurrentSession
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Pointer {
    current: Option<String>,
    hint: Option<String>,
}

/// The "active" session pointer used in single-user binding.
///
/// Holds session ids only; the sessions themselves stay in the
/// [`SessionStore`].
#[derive(Debug, Default)]
pub struct CurrentSession {
    pointer: Mutex<Pointer>,
}

impl CurrentSession {
    /// Creates a pointer with no current session and an optional hint.
    pub fn new(hint: Option<String>) -> Self {
        Self {
            pointer: Mutex::new(Pointer {
                current: None,
                hint: hint.filter(|h| !h.is_empty()),
            }),
        }
    }

    /// Points at `session_id` and records it as the hint.
    pub fn set(&self, session_id: &str) {
        let mut pointer = self.lock();
        pointer.current = Some(session_id.to_string());
        pointer.hint = Some(session_id.to_string());
    }

    /// Forgets both the pointer and the hint.
    pub fn clear(&self) {
        let mut pointer = self.lock();
        pointer.current = None;
        pointer.hint = None;
    }

    /// The explicit pointer value.
    pub fn current_id(&self) -> Option<String> {
        self.lock().current.clone()
    }

    /// The recorded hint.
    pub fn hint(&self) -> Option<String> {
        self.lock().hint.clone()
    }

    /// Resolves the session for a call without touching the pointer.
    pub fn resolve(
        &self,
        store: &SessionStore,
        ctx: &SessionContext,
        binding: SessionBinding,
    ) -> SessionLookup {
        let mut first_invalid: Option<(String, AuthSession)> = None;
        let mut check = |id: &str| -> Option<AuthSession> {
            let session = store.get(id)?;
            if session.is_valid() {
                Some(session)
            } else {
                if first_invalid.is_none() {
                    first_invalid = Some((id.to_string(), session));
                }
                None
            }
        };

        if let Some(id) = ctx.session_id() {
            if let Some(session) = check(id) {
                return SessionLookup::Active {
                    session_id: id.to_string(),
                    session,
                };
            }
        }

        if binding == SessionBinding::SingleUser {
            let (current, hint) = {
                let pointer = self.lock();
                (pointer.current.clone(), pointer.hint.clone())
            };

            for id in current.into_iter().chain(hint) {
                if let Some(session) = check(&id) {
                    return SessionLookup::Active {
                        session_id: id,
                        session,
                    };
                }
            }

            if let Some((id, session)) = store.most_recent() {
                if session.is_valid() {
                    return SessionLookup::Active {
                        session_id: id,
                        session,
                    };
                }
                if first_invalid.is_none() {
                    first_invalid = Some((id, session));
                }
            }
        }

        match first_invalid {
            Some((session_id, session)) => SessionLookup::Invalid {
                session_id,
                session,
            },
            None => SessionLookup::Missing,
        }
    }

    /// Resolves the session for a call, as [`resolve`](Self::resolve).
    ///
    /// Ids that resolve through the hint or the most-recent fallback become
    /// the new pointer, so later calls take the first step.
    pub fn lookup(
        &self,
        store: &SessionStore,
        ctx: &SessionContext,
        binding: SessionBinding,
    ) -> SessionLookup {
        let lookup = self.resolve(store, ctx, binding);
        if let SessionLookup::Active { session_id, .. } = &lookup {
            let from_caller = ctx.session_id() == Some(session_id.as_str());
            if binding == SessionBinding::SingleUser && !from_caller {
                let mut pointer = self.lock();
                if pointer.current.as_deref() != Some(session_id.as_str()) {
                    pointer.current = Some(session_id.clone());
                }
            }
        }
        lookup
    }

    fn lock(&self) -> MutexGuard<'_, Pointer> {
        self.pointer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::session::tests::user;
    use chrono::Utc;

    fn active_login(lookup: SessionLookup) -> Option<String> {
        lookup.active().map(|(_, s)| s.user.login)
    }

    #[test]
    fn test_empty_store_resolves_to_missing() {
        let store = SessionStore::new();
        let current = CurrentSession::new(None);
        let lookup = current.lookup(
            &store,
            &SessionContext::anonymous(),
            SessionBinding::SingleUser,
        );
        assert!(matches!(lookup, SessionLookup::Missing));
    }

    #[test]
    fn test_explicit_pointer_wins_over_newer_session() {
        let store = SessionStore::new();
        let now = Utc::now();
        let older = store.insert(
            crate::auth::AuthSession::new("t1", "bearer", "", user("pinned"))
                .with_created_at(now - chrono::Duration::minutes(10)),
        );
        store.insert(
            crate::auth::AuthSession::new("t2", "bearer", "", user("newest")).with_created_at(now),
        );

        let current = CurrentSession::new(None);
        current.set(&older);
        let lookup = current.lookup(
            &store,
            &SessionContext::anonymous(),
            SessionBinding::SingleUser,
        );
        assert_eq!(active_login(lookup).as_deref(), Some("pinned"));
    }

    #[test]
    fn test_hint_resolves_and_becomes_pointer() {
        let store = SessionStore::new();
        let now = Utc::now();
        let hinted = store.insert(
            crate::auth::AuthSession::new("t1", "bearer", "", user("hinted"))
                .with_created_at(now - chrono::Duration::minutes(10)),
        );
        store.insert(
            crate::auth::AuthSession::new("t2", "bearer", "", user("newest")).with_created_at(now),
        );

        let current = CurrentSession::new(Some(hinted.clone()));
        assert!(current.current_id().is_none());
        let lookup = current.lookup(
            &store,
            &SessionContext::anonymous(),
            SessionBinding::SingleUser,
        );
        assert_eq!(active_login(lookup).as_deref(), Some("hinted"));
        assert_eq!(current.current_id(), Some(hinted));
    }

    #[test]
    fn test_fallback_picks_latest_created_session() {
        let store = SessionStore::new();
        let now = Utc::now();
        store.insert(
            crate::auth::AuthSession::new("t1", "bearer", "", user("earlier"))
                .with_created_at(now - chrono::Duration::seconds(60)),
        );
        let later = store.insert(
            crate::auth::AuthSession::new("t2", "bearer", "", user("later")).with_created_at(now),
        );

        let current = CurrentSession::new(None);
        let lookup = current.lookup(
            &store,
            &SessionContext::anonymous(),
            SessionBinding::SingleUser,
        );
        assert_eq!(active_login(lookup).as_deref(), Some("later"));
        assert_eq!(current.current_id(), Some(later));
    }

    #[test]
    fn test_invalid_most_recent_session_is_reported_invalid() {
        let store = SessionStore::new();
        store.create("", "bearer", "", user("broken"));
        let current = CurrentSession::new(None);
        let lookup = current.lookup(
            &store,
            &SessionContext::anonymous(),
            SessionBinding::SingleUser,
        );
        match lookup {
            SessionLookup::Invalid { session, .. } => assert_eq!(session.user.login, "broken"),
            other => panic!("expected invalid lookup, got {:?}", other),
        }
    }

    #[test]
    fn test_caller_session_takes_precedence() {
        let store = SessionStore::new();
        let mine = store.create("t1", "bearer", "", user("mine"));
        let theirs = store.create("t2", "bearer", "", user("theirs"));
        let current = CurrentSession::new(None);
        current.set(&theirs);

        let lookup = current.lookup(
            &store,
            &SessionContext::with_session(mine),
            SessionBinding::SingleUser,
        );
        assert_eq!(active_login(lookup).as_deref(), Some("mine"));
    }

    #[test]
    fn test_per_caller_binding_ignores_pointer_and_fallback() {
        let store = SessionStore::new();
        let id = store.create("t1", "bearer", "", user("someone"));
        let current = CurrentSession::new(Some(id.clone()));
        current.set(&id);

        let anonymous = current.lookup(
            &store,
            &SessionContext::anonymous(),
            SessionBinding::PerCaller,
        );
        assert!(matches!(anonymous, SessionLookup::Missing));

        let own = current.lookup(
            &store,
            &SessionContext::with_session(id),
            SessionBinding::PerCaller,
        );
        assert_eq!(active_login(own).as_deref(), Some("someone"));
    }

    #[test]
    fn test_resolve_leaves_pointer_untouched() {
        let store = SessionStore::new();
        let id = store.create("t1", "bearer", "", user("octocat"));
        let current = CurrentSession::new(Some(id.clone()));

        let lookup = current.resolve(
            &store,
            &SessionContext::anonymous(),
            SessionBinding::SingleUser,
        );
        assert_eq!(active_login(lookup).as_deref(), Some("octocat"));
        assert!(current.current_id().is_none());

        current.lookup(&store, &SessionContext::anonymous(), SessionBinding::SingleUser);
        assert_eq!(current.current_id(), Some(id));
    }

    #[test]
    fn test_caller_session_does_not_become_pointer() {
        let store = SessionStore::new();
        let mine = store.create("t1", "bearer", "", user("mine"));
        let current = CurrentSession::new(None);

        current.lookup(&store, &SessionContext::with_session(mine), SessionBinding::SingleUser);
        assert!(current.current_id().is_none());
    }

    #[test]
    fn test_clear_removes_pointer_and_hint() {
        let current = CurrentSession::new(Some("hint".to_string()));
        current.set("abc");
        assert_eq!(current.hint().as_deref(), Some("abc"));
        current.clear();
        assert!(current.current_id().is_none());
        assert!(current.hint().is_none());
    }

    #[test]
    fn test_context_from_option_ignores_empty() {
        assert_eq!(SessionContext::from_option(Some(String::new())), SessionContext::anonymous());
        assert_eq!(
            SessionContext::from_option(Some("x".to_string())).session_id(),
            Some("x")
        );
    }
}
