//! Google API 访问层
//!
//! GoogleClient 持有 reqwest::Client 与调用方注入的访问令牌（令牌对核心不透明，
//! 核心只在会话构建时判断其有无）。Calendar / Gmail / Tasks 工具共享同一客户端；
//! base_url 可替换，供测试对接 mock 服务器。

use std::time::Duration;

use serde_json::Value;

use crate::tools::ToolError;

const CALENDAR_BASE: &str = "https://www.googleapis.com/calendar/v3";
const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
const TASKS_BASE: &str = "https://tasks.googleapis.com/tasks/v1";

/// 已授权的 Google REST 客户端
pub struct GoogleClient {
    http: reqwest::Client,
    token: String,
    calendar_base: String,
    gmail_base: String,
    tasks_base: String,
}

impl GoogleClient {
    pub fn new(token: impl Into<String>, timeout_secs: u64) -> Self {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .unwrap_or_default();
        Self {
            http,
            token: token.into(),
            calendar_base: CALENDAR_BASE.to_string(),
            gmail_base: GMAIL_BASE.to_string(),
            tasks_base: TASKS_BASE.to_string(),
        }
    }

    pub fn with_calendar_base(mut self, base: impl Into<String>) -> Self {
        self.calendar_base = base.into();
        self
    }

    pub fn with_gmail_base(mut self, base: impl Into<String>) -> Self {
        self.gmail_base = base.into();
        self
    }

    pub fn with_tasks_base(mut self, base: impl Into<String>) -> Self {
        self.tasks_base = base.into();
        self
    }

    pub fn calendar_url(&self, path: &str) -> String {
        format!("{}{}", self.calendar_base, path)
    }

    pub fn gmail_url(&self, path: &str) -> String {
        format!("{}{}", self.gmail_base, path)
    }

    pub fn tasks_url(&self, path: &str) -> String {
        format!("{}{}", self.tasks_base, path)
    }

    pub(crate) async fn get_json(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> Result<Value, ToolError> {
        let response = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(query)
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Google request failed: {}", e)))?;
        Self::json_body(response).await
    }

    pub(crate) async fn post_json(&self, url: &str, body: &Value) -> Result<Value, ToolError> {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Google request failed: {}", e)))?;
        Self::json_body(response).await
    }

    pub(crate) async fn delete(&self, url: &str) -> Result<(), ToolError> {
        let response = self
            .http
            .delete(url)
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(|e| ToolError::Failed(format!("Google request failed: {}", e)))?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(ToolError::Failed(format!(
                "Google API error {}: {}",
                status,
                truncate(&body)
            )))
        }
    }

    async fn json_body(response: reqwest::Response) -> Result<Value, ToolError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(ToolError::Failed(format!(
                "Google API error {}: {}",
                status,
                truncate(&body)
            )));
        }
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&body)
            .map_err(|e| ToolError::Failed(format!("Google response was not JSON: {}", e)))
    }
}

fn truncate(body: &str) -> String {
    if body.len() > 200 {
        format!("{}...", body.chars().take(200).collect::<String>())
    } else {
        body.to_string()
    }
}
