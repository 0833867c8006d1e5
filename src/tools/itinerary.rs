//! Itinerary planning tool
//!
//! Combines the host's weather forecast with its prompt templates. The tool
//! itself performs no authentication; the registry builder wraps it in an
//! [`AuthGuard`](crate::auth::AuthGuard) when OAuth is enabled.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::Value;

use super::{Tool, ToolExecutor, ToolResult};
use crate::auth::SessionContext;
use crate::collaborators::{ItineraryRequest, PromptBuilder, WeatherProvider};
use crate::error::{Result, WayfarerError};

pub const ITINERARY_TOOL: &str = "plan_itinerary";

/// Longest trip the tool will plan.
pub const MAX_DAYS: u32 = 14;

/// Builds an itinerary prompt from a forecast.
pub struct ItineraryTool {
    weather: Arc<dyn WeatherProvider>,
    prompts: Arc<dyn PromptBuilder>,
}

impl ItineraryTool {
    pub fn new(weather: Arc<dyn WeatherProvider>, prompts: Arc<dyn PromptBuilder>) -> Self {
        Self { weather, prompts }
    }

    fn parse_request(args: &Value) -> std::result::Result<ItineraryRequest, String> {
        let start_date = args
            .get("start_date")
            .and_then(Value::as_str)
            .ok_or_else(|| "start_date is required (YYYY-MM-DD)".to_string())?;
        let start_date = NaiveDate::parse_from_str(start_date, "%Y-%m-%d")
            .map_err(|e| format!("invalid start_date '{}': {}", start_date, e))?;

        let days = args.get("days").and_then(Value::as_u64).unwrap_or(3);
        let days = u32::try_from(days)
            .ok()
            .filter(|d| (1..=MAX_DAYS).contains(d))
            .ok_or_else(|| format!("days must be between 1 and {}", MAX_DAYS))?;

        let destination = args
            .get("destination")
            .and_then(Value::as_str)
            .map(str::to_string);
        let interests = args
            .get("interests")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        Ok(ItineraryRequest {
            destination,
            start_date,
            days,
            interests,
        })
    }
}

#[async_trait]
impl ToolExecutor for ItineraryTool {
    fn tool_definition(&self) -> Value {
        Tool::new(
            ITINERARY_TOOL,
            concat!(
                "Draft a day-by-day travel itinerary prompt ",
                "that takes the weather forecast into account.",
            ),
            serde_json::json!({
                "type": "object",
                "properties": {
                    "start_date": {
                        "type": "string",
                        "description": "First day of the trip (YYYY-MM-DD)"
                    },
                    "days": { "type": "integer", "minimum": 1, "maximum": MAX_DAYS, "default": 3 },
                    "destination": { "type": "string" },
                    "interests": { "type": "array", "items": { "type": "string" } }
                },
                "required": ["start_date"]
            }),
        )
        .to_value()
    }

    async fn execute(&self, _ctx: &SessionContext, args: Value) -> Result<ToolResult> {
        let request = match Self::parse_request(&args) {
            Ok(request) => request,
            Err(message) => return Ok(ToolResult::error(message)),
        };

        let forecast = self
            .weather
            .forecast(request.start_date, request.days)
            .await
            .map_err(|e| WayfarerError::Tool(format!("weather lookup failed: {}", e)))?;

        tracing::debug!(
            days = request.days,
            forecast_days = forecast.len(),
            "Building itinerary prompt"
        );

        let prompt = self.prompts.itinerary_prompt(&request, &forecast);
        Ok(ToolResult::success(prompt)
            .with_metadata("forecast_days".to_string(), forecast.len().to_string()))
    }
}
