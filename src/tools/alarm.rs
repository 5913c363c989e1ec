//! 闹钟工具：向设备端点下发倒计时
//!
//! 端点来自会话能力（如树莓派闹钟服务的 URL），不存在则不注册本工具。

use std::time::Duration;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::schema::{parse_args, schema_value};
use crate::tools::{Tool, ToolError};

#[derive(Deserialize, JsonSchema)]
pub struct SetAlarmInput {
    /// The countdown for the alarm in HH:MM:SS format.
    pub time: String,
}

/// set_alarm：HH:MM:SS 倒计时 POST 到闹钟端点
pub struct SetAlarmTool {
    http: reqwest::Client,
    url: String,
}

impl SetAlarmTool {
    pub fn new(url: impl Into<String>, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            url: url.into(),
        }
    }
}

#[async_trait]
impl Tool for SetAlarmTool {
    fn name(&self) -> &str {
        "set_alarm"
    }

    fn description(&self) -> &str {
        "Set an alarm countdown. Args: {\"time\": \"HH:MM:SS\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<SetAlarmInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: SetAlarmInput = parse_args(args)?;

        let parts: Vec<&str> = input.time.trim().split(':').collect();
        if parts.len() != 3 || parts.iter().any(|p| p.parse::<u32>().is_err()) {
            // 原样反馈给模型，让它修正格式后重试
            return Ok("Time not in HH:MM:SS format.".to_string());
        }
        let count_down = serde_json::json!({
            "hour": parts[0],
            "minute": parts[1],
            "second": parts[2],
        });

        let response = self
            .http
            .post(&self.url)
            .json(&count_down)
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Alarm request failed: {}", e)))?;
        if !response.status().is_success() {
            return Err(ToolError::Failed(format!(
                "Alarm endpoint error {}",
                response.status()
            )));
        }
        Ok("Alarm has been successfully set.".to_string())
    }
}
