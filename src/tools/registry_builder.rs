//! Tool registry builder
//!
//! Assembles the registry exposed by the server. Auth tools are only
//! registered when OAuth is enabled; the itinerary tool is only registered
//! when the host supplies both a weather provider and a prompt builder, and
//! is guarded whenever OAuth is enabled.

use std::sync::Arc;

use crate::auth::{AuthGuard, AuthManager};
use crate::collaborators::{PromptBuilder, WeatherProvider};
use crate::tools::auth::{
    AuthStatusTool, ConfigCheckTool, DebugSessionsTool, LoginTool, LogoutTool, CONFIG_CHECK_TOOL,
    DEBUG_SESSIONS_TOOL, LOGIN_TOOL, LOGOUT_TOOL, STATUS_TOOL,
};
use crate::tools::itinerary::{ItineraryTool, ITINERARY_TOOL};
use crate::tools::{ToolExecutor, ToolRegistry};

/// Builder for the server's tool registry
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use wayfarer::auth::AuthManager;
/// use wayfarer::config::AuthConfig;
/// use wayfarer::tools::registry_builder::ToolRegistryBuilder;
///
/// let manager = Arc::new(AuthManager::from_config(&AuthConfig::default()).unwrap());
/// let registry = ToolRegistryBuilder::new(manager, "http://localhost:8000").build();
/// assert_eq!(registry.len(), 5);
/// ```
pub struct ToolRegistryBuilder {
    manager: Arc<AuthManager>,
    public_url: String,
    weather: Option<Arc<dyn WeatherProvider>>,
    prompts: Option<Arc<dyn PromptBuilder>>,
}

impl ToolRegistryBuilder {
    /// Create a builder for `manager`, advertising `public_url` as the
    /// server's externally reachable base URL
    pub fn new(manager: Arc<AuthManager>, public_url: impl Into<String>) -> Self {
        Self {
            manager,
            public_url: public_url.into(),
            weather: None,
            prompts: None,
        }
    }

    /// Supply the collaborators needed by the itinerary tool
    pub fn with_collaborators(
        mut self,
        weather: Arc<dyn WeatherProvider>,
        prompts: Arc<dyn PromptBuilder>,
    ) -> Self {
        self.weather = Some(weather);
        self.prompts = Some(prompts);
        self
    }

    /// Build the registry
    pub fn build(self) -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        let auth_enabled = self.manager.config().enabled;

        if auth_enabled {
            let manager = &self.manager;
            registry.register(
                LOGIN_TOOL,
                Arc::new(LoginTool::new(Arc::clone(manager), self.public_url.clone())),
            );
            registry.register(LOGOUT_TOOL, Arc::new(LogoutTool::new(Arc::clone(manager))));
            registry.register(STATUS_TOOL, Arc::new(AuthStatusTool::new(Arc::clone(manager))));
            registry.register(
                CONFIG_CHECK_TOOL,
                Arc::new(ConfigCheckTool::new(Arc::clone(manager), self.public_url.clone())),
            );
            registry.register(
                DEBUG_SESSIONS_TOOL,
                Arc::new(DebugSessionsTool::new(Arc::clone(manager))),
            );
        }

        if let (Some(weather), Some(prompts)) = (self.weather, self.prompts) {
            let tool: Arc<dyn ToolExecutor> = Arc::new(ItineraryTool::new(weather, prompts));
            let tool: Arc<dyn ToolExecutor> = if auth_enabled {
                Arc::new(AuthGuard::new(Arc::clone(&self.manager)).wrap(tool))
            } else {
                tool
            };
            registry.register(ITINERARY_TOOL, tool);
        }

        tracing::debug!(tools = ?registry.names(), "Built tool registry");
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::SessionContext;
    use crate::config::AuthConfig;
    use crate::tools::itinerary::tests::{FixedWeather, ListPrompt};

    fn manager(enabled: bool) -> Arc<AuthManager> {
        let config = AuthConfig {
            enabled,
            ..Default::default()
        };
        Arc::new(AuthManager::from_config(&config).unwrap())
    }

    #[test]
    fn test_enabled_without_collaborators_has_auth_tools_only() {
        let registry = ToolRegistryBuilder::new(manager(true), "http://localhost:8000").build();
        assert_eq!(
            registry.names(),
            vec![
                "github_auth_status",
                "github_config_check",
                "github_debug_sessions",
                "github_login",
                "github_logout"
            ]
        );
    }

    #[test]
    fn test_disabled_omits_auth_tools() {
        let registry = ToolRegistryBuilder::new(manager(false), "http://localhost:8000").build();
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_itinerary_is_guarded_when_auth_enabled() {
        let registry = ToolRegistryBuilder::new(manager(true), "http://localhost:8000")
            .with_collaborators(Arc::new(FixedWeather), Arc::new(ListPrompt))
            .build();
        let tool = registry.get(ITINERARY_TOOL).expect("registered");
        let result = tool
            .execute(
                &SessionContext::anonymous(),
                serde_json::json!({ "start_date": "2026-04-01" }),
            )
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.metadata["denial"], "not_authenticated");
    }

    #[tokio::test]
    async fn test_itinerary_runs_unguarded_when_auth_disabled() {
        let registry = ToolRegistryBuilder::new(manager(false), "http://localhost:8000")
            .with_collaborators(Arc::new(FixedWeather), Arc::new(ListPrompt))
            .build();
        assert_eq!(registry.len(), 1);
        let result = registry
            .get(ITINERARY_TOOL)
            .unwrap()
            .execute(
                &SessionContext::anonymous(),
                serde_json::json!({ "start_date": "2026-04-01" }),
            )
            .await
            .unwrap();
        assert!(result.success);
    }
}
