use std::fs;
use std::path::PathBuf;

use tempfile::TempDir;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use wayfarer::config::AuthConfig;

pub const CLIENT_ID: &str = "Iv1.integration-client";
pub const ACCESS_TOKEN: &str = "gho_integration_token";

/// Auth configuration whose GitHub endpoints point at `server`.
#[allow(dead_code)]
pub fn auth_config_for(server: &MockServer) -> AuthConfig {
    AuthConfig {
        enabled: true,
        client_id: Some(CLIENT_ID.to_string()),
        client_secret: Some("integration-secret".to_string()),
        redirect_uri: Some("http://localhost:8000/auth/callback".to_string()),
        authorize_url: format!("{}/login/oauth/authorize", server.uri()),
        token_url: format!("{}/login/oauth/access_token", server.uri()),
        api_base: server.uri(),
        ..Default::default()
    }
}

/// Enabled auth configuration with no credentials.
#[allow(dead_code)]
pub fn enabled_auth_config() -> AuthConfig {
    AuthConfig {
        enabled: true,
        ..Default::default()
    }
}

/// Minimal GitHub `/user` body.
#[allow(dead_code)]
pub fn user_body(login: &str) -> serde_json::Value {
    serde_json::json!({
        "id": 583231,
        "login": login,
        "name": "The Octocat",
        "email": "octocat@github.com",
        "avatar_url": "https://avatars.githubusercontent.com/u/583231",
        "location": "San Francisco",
        "company": "@github",
        "created_at": "2011-01-25T18:44:36Z"
    })
}

/// Stubs a successful token exchange and profile fetch for `login`.
#[allow(dead_code)]
pub async fn mount_github_success(server: &MockServer, login: &str) {
    Mock::given(method("POST"))
        .and(path("/login/oauth/access_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": ACCESS_TOKEN,
            "token_type": "bearer",
            "scope": "read:user,user:email"
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/user"))
        .and(header("authorization", format!("Bearer {}", ACCESS_TOKEN).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body(login)))
        .mount(server)
        .await;
}

/// Extracts the `state` query parameter from an authorize URL.
#[allow(dead_code)]
pub fn state_param(url: &str) -> String {
    url::Url::parse(url)
        .expect("valid authorize URL")
        .query_pairs()
        .find(|(k, _)| k == "state")
        .map(|(_, v)| v.into_owned())
        .expect("state parameter present")
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
