//! `/auth/*` routes
//!
//! | Route                | Success                     | Failure                         |
//! |----------------------|-----------------------------|---------------------------------|
//! | `GET /auth/login`    | 302 to the authorize URL    | 500 on missing configuration    |
//! | `GET /auth/callback` | 200 with session summary    | 400 bad request/state, 500 else |
//! | `GET /auth/status`   | 200 status payload          |                                 |
//! | `GET /auth/logout`   | 200 with cleared count      |                                 |

use axum::extract::{Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, SameSite};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use serde_json::json;

use super::{AppState, CallerSession, SESSION_COOKIE};
use crate::auth::session_id_prefix;
use crate::error::WayfarerError;

/// Router for the login flow.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(login))
        .route("/auth/callback", get(callback))
        .route("/auth/status", get(status))
        .route("/auth/logout", get(logout))
}

pub(crate) fn error_response(
    status: StatusCode,
    error: &str,
    message: impl Into<String>,
) -> Response {
    (
        status,
        Json(json!({
            "error": error,
            "message": message.into(),
        })),
    )
        .into_response()
}

/// Maps a login-flow failure to its HTTP status and error code.
fn classify(err: &anyhow::Error) -> (StatusCode, &'static str) {
    match err.downcast_ref::<WayfarerError>() {
        Some(WayfarerError::InvalidState) => (StatusCode::BAD_REQUEST, "invalid_state"),
        Some(WayfarerError::Config(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "configuration_error")
        }
        Some(WayfarerError::Exchange(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "token_exchange_failed")
        }
        Some(WayfarerError::ProfileFetch(_)) => {
            (StatusCode::INTERNAL_SERVER_ERROR, "profile_fetch_failed")
        }
        _ => (StatusCode::INTERNAL_SERVER_ERROR, "authentication_error"),
    }
}

// ── Login ──────────────────────────────────────────────────────────

async fn login(State(state): State<AppState>) -> Response {
    match state.manager.begin_login() {
        Ok(url) => (StatusCode::FOUND, [(header::LOCATION, url)]).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Cannot start GitHub login");
            let (status, code) = classify(&e);
            error_response(
                status,
                code,
                format!("{}. Please check your GitHub OAuth configuration.", e),
            )
        }
    }
}

// ── Callback ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

async fn callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(params): Query<CallbackParams>,
) -> Result<(CookieJar, Json<serde_json::Value>), Response> {
    if let Some(error) = &params.error {
        let desc = params.error_description.as_deref().unwrap_or(error);
        tracing::warn!(error = %error, description = %desc, "OAuth error from GitHub");
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            error,
            format!("Authentication failed: {}", desc),
        ));
    }

    let (Some(code), Some(oauth_state)) = (
        params.code.filter(|c| !c.is_empty()),
        params.state.filter(|s| !s.is_empty()),
    ) else {
        return Err(error_response(
            StatusCode::BAD_REQUEST,
            "invalid_request",
            "Missing required parameters (code or state).",
        ));
    };

    let session_id = state
        .manager
        .complete_login(&code, &oauth_state)
        .await
        .map_err(|e| {
            let (status, error) = classify(&e);
            if status.is_server_error() {
                tracing::error!(error = %e, "GitHub login failed");
            }
            error_response(status, error, e.to_string())
        })?;

    let session = state
        .manager
        .sessions()
        .get(&session_id)
        .ok_or_else(|| {
            error_response(
                StatusCode::INTERNAL_SERVER_ERROR,
                "authentication_error",
                "Session disappeared before it could be reported.",
            )
        })?;

    let cookie = Cookie::build((SESSION_COOKIE, session_id.clone()))
        .http_only(true)
        .secure(state.secure_cookies)
        .same_site(SameSite::Lax)
        .path("/")
        .build();

    let user = &session.user;
    let body = json!({
        "authenticated": true,
        "message": "You have successfully authenticated with GitHub.",
        "session": session_id_prefix(&session_id),
        "user": {
            "login": user.login,
            "name": user.name,
            "email": user.email,
            "avatar_url": user.avatar_url,
            "location": user.location,
            "company": user.company,
        },
    });

    Ok((jar.add(cookie), Json(body)))
}

// ── Status ─────────────────────────────────────────────────────────

async fn status(
    State(state): State<AppState>,
    CallerSession(ctx): CallerSession,
) -> impl IntoResponse {
    Json(state.manager.status(&ctx))
}

// ── Logout ─────────────────────────────────────────────────────────

async fn logout(
    State(state): State<AppState>,
    CallerSession(ctx): CallerSession,
    jar: CookieJar,
) -> (CookieJar, Json<serde_json::Value>) {
    let username = state
        .manager
        .current_session(&ctx)
        .map(|session| session.user.login)
        .unwrap_or_else(|| "unknown".to_string());

    let count = state.manager.logout();

    let removal = Cookie::build((SESSION_COOKIE, "")).path("/").build();
    (
        jar.remove(removal),
        Json(json!({
            "logged_out": true,
            "username": username,
            "sessions_cleared": count,
        })),
    )
}
