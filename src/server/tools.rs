//! Tool and resource endpoints
//!
//! `GET /tools` lists tool definitions and `POST /tools/:name` executes one
//! with a JSON argument body; an empty body means `{}`. The auth resources
//! are served read-only under `/resources`, with `/resources/user/profile`
//! reading `auth://user/profile`.

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};

use super::routes::error_response;
use super::{AppState, CallerSession};
use crate::resources;

/// Router for tool listing and execution.
pub fn tool_routes() -> Router<AppState> {
    Router::new()
        .route("/tools", get(list_tools))
        .route("/tools/:name", post(call_tool))
}

/// Router for the auth resources.
pub fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/resources", get(list_resources))
        .route("/resources/*path", get(read_resource))
}

async fn list_tools(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "tools": state.tools.all_definitions() }))
}

async fn call_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    CallerSession(ctx): CallerSession,
    body: Bytes,
) -> Response {
    let Some(tool) = state.tools.get(&name) else {
        return error_response(
            StatusCode::NOT_FOUND,
            "unknown_tool",
            format!("No tool named '{}'", name),
        );
    };

    let args = if body.iter().all(u8::is_ascii_whitespace) {
        json!({})
    } else {
        match serde_json::from_slice::<Value>(&body) {
            Ok(args) => args,
            Err(e) => {
                tracing::warn!(tool = %name, error = %e, "Rejected malformed tool arguments");
                return error_response(
                    StatusCode::BAD_REQUEST,
                    "invalid_arguments",
                    format!("Tool arguments must be a JSON document: {}", e),
                );
            }
        }
    };

    match tool.execute(&ctx, args).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => {
            tracing::error!(tool = %name, error = %e, "Tool execution failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "tool_error", e.to_string())
        }
    }
}

async fn list_resources() -> Json<Value> {
    Json(json!({ "resources": resources::descriptors() }))
}

async fn read_resource(
    State(state): State<AppState>,
    Path(path): Path<String>,
    CallerSession(ctx): CallerSession,
) -> Response {
    let uri = format!("auth://{}", path.trim_start_matches('/'));
    match resources::read(&state.manager, &uri, &ctx) {
        Some(value) => Json(value).into_response(),
        None => error_response(
            StatusCode::NOT_FOUND,
            "unknown_resource",
            format!("No resource at '{}'", uri),
        ),
    }
}
