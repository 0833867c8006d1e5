//! Identity provider seam and the GitHub OAuth App implementation
//!
//! [`AuthManager`](super::manager::AuthManager) only talks to the provider
//! through [`IdentityProvider`], which keeps the login flow testable against
//! a stubbed provider. [`GitHubProvider`] is the production implementation.
//!
//! Both network calls run with a bounded timeout and are never retried:
//! authorization codes are single use.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::session::IdentityUser;
use crate::config::{AuthConfig, OAuthCredentials};
use crate::error::{Result, WayfarerError};

/// Scopes requested on every login: read the profile and the email address.
pub const GITHUB_SCOPES: &str = "read:user user:email";

const USER_AGENT: &str = concat!("wayfarer/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// TokenGrant
// ---------------------------------------------------------------------------

/// Access token obtained from a successful code exchange.
#[derive(Clone)]
pub struct TokenGrant {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[redacted]")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Raw token endpoint body.
///
/// GitHub answers a rejected exchange with `200 OK` and an `error` field, so
/// every field is optional and the error check happens after parsing.
#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
    #[serde(default)]
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

impl TokenResponse {
    fn into_grant(self) -> Result<TokenGrant> {
        if let Some(error) = self.error {
            let detail = match self.error_description {
                Some(description) => format!("{}: {}", error, description),
                None => error,
            };
            return Err(WayfarerError::Exchange(detail).into());
        }

        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                WayfarerError::Exchange("response contained no access_token".to_string())
            })?;

        Ok(TokenGrant {
            access_token,
            token_type: self.token_type.unwrap_or_else(|| "bearer".to_string()),
            scope: self.scope.unwrap_or_default(),
        })
    }
}

// ---------------------------------------------------------------------------
// IdentityProvider
// ---------------------------------------------------------------------------

/// An OAuth authority that issues codes, tokens and profile data.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Builds the URL the user is redirected to, embedding `state`.
    fn authorize_url(&self, credentials: &OAuthCredentials, state: &str) -> Result<String>;

    /// Exchanges an authorization code for an access token.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::Exchange`] on transport failure, a non-2xx
    /// status, or an `error` field in the response body.
    async fn exchange_code(&self, credentials: &OAuthCredentials, code: &str) -> Result<TokenGrant>;

    /// Fetches the profile of the user that owns `access_token`.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::ProfileFetch`] on any failure.
    async fn fetch_user(&self, access_token: &str) -> Result<IdentityUser>;
}

// ---------------------------------------------------------------------------
// GitHubProvider
// ---------------------------------------------------------------------------

/// GitHub OAuth App endpoints reached over HTTPS.
///
/// Endpoint URLs come from [`AuthConfig`] so tests can point them at a local
/// mock server.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    http: reqwest::Client,
    authorize_url: String,
    token_url: String,
    api_base: String,
}

impl GitHubProvider {
    /// Creates a provider using the endpoints and timeout from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`WayfarerError::Config`] if the HTTP client cannot be built.
    pub fn new(config: &AuthConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| WayfarerError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            http,
            authorize_url: config.authorize_url.clone(),
            token_url: config.token_url.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl IdentityProvider for GitHubProvider {
    fn authorize_url(&self, credentials: &OAuthCredentials, state: &str) -> Result<String> {
        let mut url = Url::parse(&self.authorize_url)
            .map_err(|e| WayfarerError::Config(format!("invalid authorize URL: {}", e)))?;

        url.query_pairs_mut()
            .append_pair("client_id", &credentials.client_id)
            .append_pair("redirect_uri", &credentials.redirect_uri)
            .append_pair("scope", GITHUB_SCOPES)
            .append_pair("state", state);

        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        credentials: &OAuthCredentials,
        code: &str,
    ) -> Result<TokenGrant> {
        let mut params: HashMap<&str, &str> = HashMap::new();
        params.insert("client_id", &credentials.client_id);
        params.insert("client_secret", &credentials.client_secret);
        params.insert("code", code);
        params.insert("redirect_uri", &credentials.redirect_uri);

        let resp = self
            .http
            .post(&self.token_url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&params)
            .send()
            .await
            .map_err(|e| WayfarerError::Exchange(format!("token request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            let detail = format!("token endpoint returned {}: {}", status, body);
            return Err(WayfarerError::Exchange(detail).into());
        }

        let raw: TokenResponse = resp
            .json()
            .await
            .map_err(|e| {
                WayfarerError::Exchange(format!("failed to parse token response: {}", e))
            })?;

        raw.into_grant()
    }

    async fn fetch_user(&self, access_token: &str) -> Result<IdentityUser> {
        let resp = self
            .http
            .get(format!("{}/user", self.api_base))
            .bearer_auth(access_token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .send()
            .await
            .map_err(|e| WayfarerError::ProfileFetch(format!("user request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            return Err(
                WayfarerError::ProfileFetch(format!("user endpoint returned {}", status)).into(),
            );
        }

        resp.json::<IdentityUser>().await.map_err(|e| {
            WayfarerError::ProfileFetch(format!("failed to parse user profile: {}", e)).into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> OAuthCredentials {
        OAuthCredentials {
            client_id: "Iv1.test-client".to_string(),
            client_secret: "secret".to_string(),
            redirect_uri: "http://localhost:8000/auth/callback".to_string(),
        }
    }

    #[test]
    fn test_authorize_url_embeds_all_parameters() {
        let provider = GitHubProvider::new(&AuthConfig::default()).unwrap();
        let url = provider.authorize_url(&credentials(), "state-123").unwrap();
        let parsed = Url::parse(&url).unwrap();
        let pairs: HashMap<String, String> = parsed.query_pairs().into_owned().collect();

        assert_eq!(parsed.host_str(), Some("github.com"));
        assert_eq!(pairs["client_id"], "Iv1.test-client");
        assert_eq!(pairs["redirect_uri"], "http://localhost:8000/auth/callback");
        assert_eq!(pairs["scope"], GITHUB_SCOPES);
        assert_eq!(pairs["state"], "state-123");
    }

    #[test]
    fn test_authorize_url_rejects_invalid_endpoint() {
        let config = AuthConfig {
            authorize_url: "::not a url::".to_string(),
            ..Default::default()
        };
        let provider = GitHubProvider::new(&config).unwrap();
        let err = provider.authorize_url(&credentials(), "s").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<WayfarerError>(),
            Some(WayfarerError::Config(_))
        ));
    }

    #[test]
    fn test_token_response_error_field_becomes_exchange_error() {
        let raw: TokenResponse = serde_json::from_value(serde_json::json!({
            "error": "bad_verification_code",
            "error_description": "The code passed is incorrect or expired."
        }))
        .unwrap();
        let err = raw.into_grant().unwrap_err();
        assert!(err.to_string().contains("bad_verification_code"));
        assert!(matches!(
            err.downcast_ref::<WayfarerError>(),
            Some(WayfarerError::Exchange(_))
        ));
    }

    #[test]
    fn test_token_response_without_token_is_rejected() {
        let raw: TokenResponse = serde_json::from_value(serde_json::json!({
            "token_type": "bearer"
        }))
        .unwrap();
        assert!(raw.into_grant().is_err());
    }

    #[test]
    fn test_token_response_success_defaults() {
        let raw: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "gho_abc"
        }))
        .unwrap();
        let grant = raw.into_grant().unwrap();
        assert_eq!(grant.access_token, "gho_abc");
        assert_eq!(grant.token_type, "bearer");
        assert_eq!(grant.scope, "");
    }

    #[test]
    fn test_token_grant_debug_is_redacted() {
        let grant = TokenGrant {
            access_token: "gho_secret".to_string(),
            token_type: "bearer".to_string(),
            scope: String::new(),
        };
        assert!(!format!("{:?}", grant).contains("gho_secret"));
    }
}
