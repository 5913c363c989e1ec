//! Gmail 工具：发信与未读摘要
//!
//! 语音转写会把收件人念成 "john at example dot com"；发送前先做口语地址规范化，
//! 已合法的地址原样放行，只改写检测到的 "at"/"dot" 候选。

use std::sync::Arc;

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE;
use base64::Engine as _;
use regex::Regex;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::google::GoogleClient;
use crate::tools::schema::{parse_args, schema_value};
use crate::tools::{Tool, ToolError};

const EMAIL_PATTERN: &str = r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$";

/// 未读摘要最多取前几封
const UNREAD_LIMIT: usize = 5;

/// 口语地址规范化："name at domain dot com" -> "name@domain.com"
///
/// 已经匹配邮箱语法的输入不动；否则改写 " at "/" dot " 并去掉残余空白，
/// 改写结果仍不合法时退回原输入（由发送端报错）。
pub(crate) fn normalize_recipient(raw: &str) -> String {
    let trimmed = raw.trim();
    let valid = Regex::new(EMAIL_PATTERN).ok();
    let is_valid = |s: &str| valid.as_ref().map(|re| re.is_match(s)).unwrap_or(false);
    if is_valid(trimmed) {
        return trimmed.to_string();
    }

    let mut candidate = trimmed.to_string();
    if let Ok(re) = Regex::new(r"(?i)\s+at\s+") {
        candidate = re.replace_all(&candidate, "@").into_owned();
    }
    if let Ok(re) = Regex::new(r"(?i)\s+dot\s+") {
        candidate = re.replace_all(&candidate, ".").into_owned();
    }
    let candidate: String = candidate.split_whitespace().collect();

    if is_valid(&candidate) {
        candidate
    } else {
        trimmed.to_string()
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct SendEmailInput {
    /// Recipient address; spoken forms like "john at example dot com" are accepted.
    pub recipient: String,
    /// The subject line.
    pub subject: String,
    /// The body text of the email.
    pub body: String,
}

/// send_email：经由 Gmail 发送一封邮件
pub struct SendEmailTool {
    google: Arc<GoogleClient>,
}

impl SendEmailTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for SendEmailTool {
    fn name(&self) -> &str {
        "send_email"
    }

    fn description(&self) -> &str {
        "Send an email via Gmail. Args: {\"recipient\": \"...\", \"subject\": \"...\", \
         \"body\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<SendEmailInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: SendEmailInput = parse_args(args)?;
        let recipient = normalize_recipient(&input.recipient);

        let rfc2822 = format!(
            "To: {}\r\nSubject: {}\r\nContent-Type: text/plain; charset=utf-8\r\n\r\n{}",
            recipient, input.subject, input.body
        );
        let raw = URL_SAFE.encode(rfc2822.as_bytes());

        let url = self.google.gmail_url("/users/me/messages/send");
        self.google
            .post_json(&url, &serde_json::json!({"raw": raw}))
            .await?;
        Ok(format!("Email sent to {}.", recipient))
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct GetUnreadMessagesInput {}

/// get_unread_messages：取未读邮件的发件人与主题摘要
pub struct GetUnreadMessagesTool {
    google: Arc<GoogleClient>,
}

impl GetUnreadMessagesTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for GetUnreadMessagesTool {
    fn name(&self) -> &str {
        "get_unread_messages"
    }

    fn description(&self) -> &str {
        "Retrieve unread messages from Gmail (sender and subject of the most recent ones)."
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<GetUnreadMessagesInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let _input: GetUnreadMessagesInput = parse_args(args)?;

        let list_url = self.google.gmail_url("/users/me/messages");
        let max_results = UNREAD_LIMIT.to_string();
        let listing = self
            .google
            .get_json(
                &list_url,
                &[("q", "is:unread"), ("maxResults", max_results.as_str())],
            )
            .await?;

        let ids: Vec<String> = listing["messages"]
            .as_array()
            .map(|msgs| {
                msgs.iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default();

        if ids.is_empty() {
            return Ok("No unread messages.".to_string());
        }

        let mut lines = Vec::new();
        for id in &ids {
            let url = self.google.gmail_url(&format!("/users/me/messages/{}", id));
            let message = self
                .google
                .get_json(
                    &url,
                    &[
                        ("format", "metadata"),
                        ("metadataHeaders", "From"),
                        ("metadataHeaders", "Subject"),
                    ],
                )
                .await?;
            let mut from = "(unknown sender)".to_string();
            let mut subject = "(no subject)".to_string();
            if let Some(headers) = message["payload"]["headers"].as_array() {
                for header in headers {
                    let Some(value) = header["value"].as_str() else {
                        continue;
                    };
                    match header["name"].as_str() {
                        Some("From") => from = value.to_string(),
                        Some("Subject") => subject = value.to_string(),
                        _ => {}
                    }
                }
            }
            lines.push(format!("From {}: {}", from, subject));
        }
        Ok(format!(
            "You have {} unread message(s):\n{}",
            lines.len(),
            lines.join("\n")
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_normalize_spoken_address() {
        assert_eq!(
            normalize_recipient("john at example dot com"),
            "john@example.com"
        );
        assert_eq!(
            normalize_recipient("anna dot svensson at kth dot se"),
            "anna.svensson@kth.se"
        );
    }

    #[test]
    fn test_normalize_leaves_valid_address_untouched() {
        assert_eq!(
            normalize_recipient("John.Doe@Example.com"),
            "John.Doe@Example.com"
        );
        assert_eq!(normalize_recipient("  a@b.se  "), "a@b.se");
    }

    #[test]
    fn test_normalize_gives_up_on_non_address() {
        // 改写后仍不合法：退回原输入
        assert_eq!(normalize_recipient("my colleague"), "my colleague");
    }

    #[tokio::test]
    async fn test_send_email_normalizes_before_dispatch() {
        let server = MockServer::start().await;
        let expected_raw = URL_SAFE.encode(
            "To: john@example.com\r\nSubject: Hi\r\nContent-Type: text/plain; charset=utf-8\r\n\r\nHello!"
                .as_bytes(),
        );
        Mock::given(method("POST"))
            .and(path("/users/me/messages/send"))
            .and(body_partial_json(serde_json::json!({"raw": expected_raw})))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "m1"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let google = Arc::new(GoogleClient::new("t", 5).with_gmail_base(server.uri()));
        let out = SendEmailTool::new(google)
            .execute(serde_json::json!({
                "recipient": "john at example dot com",
                "subject": "Hi",
                "body": "Hello!"
            }))
            .await
            .unwrap();
        assert_eq!(out, "Email sent to john@example.com.");
    }

    #[tokio::test]
    async fn test_unread_summary() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .and(query_param("q", "is:unread"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{"id": "m1"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages/m1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "payload": {"headers": [
                    {"name": "From", "value": "Alex <alex@kth.se>"},
                    {"name": "Subject", "value": "Lab report"}
                ]}
            })))
            .mount(&server)
            .await;

        let google = Arc::new(GoogleClient::new("t", 5).with_gmail_base(server.uri()));
        let out = GetUnreadMessagesTool::new(google)
            .execute(serde_json::json!({}))
            .await
            .unwrap();
        assert!(out.contains("1 unread"));
        assert!(out.contains("From Alex <alex@kth.se>: Lab report"));
    }

    #[tokio::test]
    async fn test_no_unread_messages() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&server)
            .await;

        let google = Arc::new(GoogleClient::new("t", 5).with_gmail_base(server.uri()));
        let out = GetUnreadMessagesTool::new(google)
            .execute(serde_json::json!({}))
            .await
            .unwrap();
        assert_eq!(out, "No unread messages.");
    }
}
