//! 天气工具（Meteosource 风格两段式：find_places -> current）

use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::schema::{parse_args, schema_value};
use crate::tools::{Tool, ToolError};

const DEFAULT_BASE: &str = "https://ai-weather-by-meteosource.p.rapidapi.com";
const RAPIDAPI_HOST: &str = "ai-weather-by-meteosource.p.rapidapi.com";

#[derive(Deserialize, JsonSchema)]
pub struct GetWeatherInput {
    /// The name of the city to get the weather for.
    pub city_name: String,
}

/// get_weather：城市名 -> place_id -> 当前天气小结
pub struct GetWeatherTool {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl GetWeatherTool {
    pub fn new(api_key: impl Into<String>, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            api_key: api_key.into(),
            base_url: DEFAULT_BASE.to_string(),
        }
    }

    pub fn with_base_url(mut self, base: impl Into<String>) -> Self {
        self.base_url = base.into();
        self
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> Result<Value, ToolError> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .header("X-RapidAPI-Key", &self.api_key)
            .header("X-RapidAPI-Host", RAPIDAPI_HOST)
            .query(query)
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Weather request failed: {}", e)))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ToolError::Failed(format!("Weather API error {}", status)));
        }
        response
            .json()
            .await
            .map_err(|e| ToolError::Failed(format!("Weather response was not JSON: {}", e)))
    }
}

#[async_trait]
impl Tool for GetWeatherTool {
    fn name(&self) -> &str {
        "get_weather"
    }

    fn description(&self) -> &str {
        "Get the current weather of a city. Args: {\"city_name\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<GetWeatherInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: GetWeatherInput = parse_args(args)?;

        let places = self
            .get_json(
                "/find_places",
                &[("text", input.city_name.as_str()), ("language", "en")],
            )
            .await?;
        let Some(place_id) = places[0]["place_id"].as_str() else {
            return Ok(format!(
                "I could not find a place named \"{}\".",
                input.city_name
            ));
        };

        let weather = self
            .get_json(
                "/current",
                &[
                    ("place_id", place_id),
                    ("timezone", "auto"),
                    ("language", "en"),
                    ("units", "auto"),
                ],
            )
            .await?;
        let current = &weather["current"];

        let mut response = format!(
            "In {}, the weather is currently {}. ",
            input.city_name,
            current["summary"].as_str().unwrap_or("unknown")
        );
        response += &format!(
            "The temperature is {}°C, but it feels like {}°C. ",
            current["temperature"], current["feels_like"]
        );
        response += &format!(
            "The wind speed is {} m/s coming from the {} direction, with gusts up to {} m/s. ",
            current["wind"]["speed"],
            current["wind"]["dir"].as_str().unwrap_or("unknown"),
            current["wind"]["gusts"]
        );
        response += &format!(
            "There is {} precipitation, and the humidity level is {}%. ",
            current["precipitation"]["type"]
                .as_str()
                .unwrap_or("no"),
            current["humidity"]
        );
        response += &format!("The UV index is {}.", current["uv_index"]);
        Ok(response)
    }
}
