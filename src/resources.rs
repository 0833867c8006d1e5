//! Read-only auth resources
//!
//! Two JSON documents describe the caller's login: the profile snapshot and
//! the session grant. Neither ever contains the access token.

use serde_json::{json, Value};

use crate::auth::{AuthManager, SessionContext};

pub const USER_PROFILE_URI: &str = "auth://user/profile";
pub const SESSION_INFO_URI: &str = "auth://session/info";

fn not_authenticated() -> Value {
    json!({
        "authenticated": false,
        "message": "Not authenticated. Use the 'github_login' tool to log in."
    })
}

/// Descriptors of every resource, for listing.
pub fn descriptors() -> Vec<Value> {
    vec![
        json!({
            "uri": USER_PROFILE_URI,
            "name": "GitHub user profile",
            "mimeType": "application/json"
        }),
        json!({
            "uri": SESSION_INFO_URI,
            "name": "Session information",
            "mimeType": "application/json"
        }),
    ]
}

/// The caller's profile snapshot.
pub fn user_profile(manager: &AuthManager, ctx: &SessionContext) -> Value {
    let Some(session) = manager.current_session(ctx) else {
        return not_authenticated();
    };
    let user = &session.user;
    json!({
        "authenticated": true,
        "id": user.id,
        "login": user.login,
        "name": user.name,
        "email": user.email,
        "avatar_url": user.avatar_url,
        "bio": user.bio,
        "location": user.location,
        "company": user.company,
        "created_at": user.created_at,
        "profile_url": user.profile_url(),
    })
}

/// The caller's session grant and a short user summary.
pub fn session_info(manager: &AuthManager, ctx: &SessionContext) -> Value {
    let Some(session) = manager.current_session(ctx) else {
        return not_authenticated();
    };
    json!({
        "authenticated": true,
        "token_type": session.token_type,
        "scope": session.scope,
        "created_at": session.created_at.to_rfc3339(),
        "user": {
            "login": session.user.login,
            "name": session.user.name,
        },
    })
}

/// Reads a resource by URI; `None` for unknown URIs.
pub fn read(manager: &AuthManager, uri: &str, ctx: &SessionContext) -> Option<Value> {
    match uri {
        USER_PROFILE_URI => Some(user_profile(manager, ctx)),
        SESSION_INFO_URI => Some(session_info(manager, ctx)),
        _ => None,
    }
}
