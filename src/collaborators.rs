//! Narrow interfaces to the travel-planning collaborators
//!
//! Weather data and prompt text are supplied by the embedding host. Wayfarer
//! only defines the shapes it consumes; the auth subsystem does not depend on
//! either of them.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// One day of forecast data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    pub date: NaiveDate,
    /// Degrees Celsius
    pub temp_min: f64,
    /// Degrees Celsius
    pub temp_max: f64,
    /// Short description such as "Light rain"
    pub conditions: String,
    /// Chance of precipitation, 0-100
    #[serde(default)]
    pub precipitation_probability: Option<u8>,
}

/// Source of daily forecasts.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Forecast for `days` consecutive days starting at `start_date`.
    ///
    /// Providers may return fewer days than requested when their forecast
    /// horizon is shorter.
    async fn forecast(&self, start_date: NaiveDate, days: u32) -> Result<Vec<DailyForecast>>;
}

/// Parameters of an itinerary request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItineraryRequest {
    #[serde(default)]
    pub destination: Option<String>,
    pub start_date: NaiveDate,
    pub days: u32,
    #[serde(default)]
    pub interests: Vec<String>,
}

/// Pure text templating for planning prompts.
pub trait PromptBuilder: Send + Sync {
    /// Natural-language prompt asking for an itinerary that fits `forecast`.
    fn itinerary_prompt(&self, request: &ItineraryRequest, forecast: &[DailyForecast]) -> String;
}
