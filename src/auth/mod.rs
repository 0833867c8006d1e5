//! GitHub OAuth login and session management
//!
//! Everything that needs to know whether a caller is logged in goes through
//! an explicitly constructed [`AuthManager`]; there is no process-wide
//! session state.
//!
//! # Module Layout
//!
//! - [`state_store`] -- one-time CSRF `state` tokens and their reaper
//! - [`session`]     -- identity snapshots, sessions, and the session store
//! - [`current`]     -- current-session pointer and per-call session context
//! - [`provider`]    -- identity provider seam and the GitHub implementation
//! - [`manager`]     -- the login flow controller tying the above together
//! - [`guard`]       -- wrapper that denies protected operations without a session

pub mod current;
pub mod guard;
pub mod manager;
pub mod provider;
pub mod session;
pub mod state_store;

pub use current::SessionContext;
pub use guard::{AuthGuard, Denial, Guarded};
pub use manager::{AuthManager, AuthStatus};
pub use provider::{GitHubProvider, IdentityProvider, TokenGrant};
pub use session::{AuthSession, IdentityUser, SessionStore};
pub use state_store::StateStore;

use base64::Engine as _;

/// Generates an unguessable URL-safe identifier.
///
/// 32 bytes from the thread-local CSPRNG encoded as base64url without
/// padding (43 characters, 256 bits of entropy).
pub(crate) fn random_token() -> String {
    use rand::RngCore as _;
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

/// Shortens a session id for display and logging.
pub fn session_id_prefix(session_id: &str) -> String {
    let prefix: String = session_id.chars().take(16).collect();
    format!("{}...", prefix)
}
