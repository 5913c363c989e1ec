//! Google Calendar 工具：按日查询、添加、按标题删除
//!
//! 日期类查询一律用本地时区的整日窗口 [00:00:00.000000, 23:59:59.999999]，
//! 与用户口中的「今天」对齐，而不是 UTC 的 [date, date+1)。

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, SecondsFormat, TimeZone};
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::google::GoogleClient;
use crate::tools::schema::{parse_args, schema_value};
use crate::tools::{Tool, ToolError};

/// 计算本地时区的整日窗口（微秒精度的闭区间）
pub(crate) fn local_day_window(
    date: &str,
) -> Result<(DateTime<Local>, DateTime<Local>), ToolError> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|e| ToolError::InvalidArguments(format!("date must be YYYY-MM-DD: {}", e)))?;
    let start = day
        .and_hms_micro_opt(0, 0, 0, 0)
        .ok_or_else(|| ToolError::Failed(format!("invalid start of day for {}", date)))?;
    let end = day
        .and_hms_micro_opt(23, 59, 59, 999_999)
        .ok_or_else(|| ToolError::Failed(format!("invalid end of day for {}", date)))?;
    // 夏令时切换日：起点取最早解释、终点取最晚解释
    let start = Local
        .from_local_datetime(&start)
        .earliest()
        .ok_or_else(|| ToolError::Failed(format!("no local start time on {}", date)))?;
    let end = Local
        .from_local_datetime(&end)
        .latest()
        .ok_or_else(|| ToolError::Failed(format!("no local end time on {}", date)))?;
    Ok((start, end))
}

/// 一条日历事件（从 API 响应中抽取的最小字段）
#[derive(Debug, Clone)]
struct CalendarEvent {
    id: String,
    summary: String,
    start_label: String,
}

/// 查询一天的事件，保持服务端 startTime 排序
async fn list_events_of_day(
    google: &GoogleClient,
    date: &str,
) -> Result<Vec<CalendarEvent>, ToolError> {
    let (start, end) = local_day_window(date)?;
    let time_min = start.to_rfc3339_opts(SecondsFormat::Micros, false);
    let time_max = end.to_rfc3339_opts(SecondsFormat::Micros, false);
    let url = google.calendar_url("/calendars/primary/events");
    let body = google
        .get_json(
            &url,
            &[
                ("timeMin", time_min.as_str()),
                ("timeMax", time_max.as_str()),
                ("singleEvents", "true"),
                ("orderBy", "startTime"),
            ],
        )
        .await?;

    let items = body["items"].as_array().cloned().unwrap_or_default();
    let events = items
        .iter()
        .map(|item| {
            let start_label = item["start"]["dateTime"]
                .as_str()
                // "2024-03-01T13:00:00+01:00" -> "13:00"
                .and_then(|dt| dt.get(11..16))
                .map(String::from)
                .unwrap_or_else(|| "(all day)".to_string());
            CalendarEvent {
                id: item["id"].as_str().unwrap_or_default().to_string(),
                summary: item["summary"].as_str().unwrap_or_default().to_string(),
                start_label,
            }
        })
        .collect();
    Ok(events)
}

#[derive(Deserialize, JsonSchema)]
pub struct GetEventsByDateInput {
    /// The date in YYYY-MM-DD format.
    pub date: String,
}

/// get_events_by_date：列出某天的全部事件
pub struct GetEventsByDateTool {
    google: Arc<GoogleClient>,
}

impl GetEventsByDateTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for GetEventsByDateTool {
    fn name(&self) -> &str {
        "get_events_by_date"
    }

    fn description(&self) -> &str {
        "Get all events of a day from the calendar. Args: {\"date\": \"YYYY-MM-DD\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<GetEventsByDateInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: GetEventsByDateInput = parse_args(args)?;
        let events = list_events_of_day(&self.google, &input.date).await?;
        if events.is_empty() {
            return Ok(format!("No events on {}.", input.date));
        }
        let lines: Vec<String> = events
            .iter()
            .map(|e| format!("{} {}", e.start_label, e.summary))
            .collect();
        Ok(lines.join("\n"))
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct AddEventInput {
    /// The title of the event.
    pub summary: String,
    /// The date in YYYY-MM-DD format.
    pub date: String,
    /// Start time in HH:MM format (24h).
    pub start_time: String,
    /// Optional end time in HH:MM format; defaults to one hour after start.
    #[serde(default)]
    pub end_time: Option<String>,
}

/// add_event：向日历添加事件
pub struct AddEventTool {
    google: Arc<GoogleClient>,
}

impl AddEventTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for AddEventTool {
    fn name(&self) -> &str {
        "add_event"
    }

    fn description(&self) -> &str {
        "Add an event to the calendar. Args: {\"summary\": \"...\", \"date\": \"YYYY-MM-DD\", \
         \"start_time\": \"HH:MM\", \"end_time\": \"HH:MM\" (optional)}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<AddEventInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: AddEventInput = parse_args(args)?;
        let day = NaiveDate::parse_from_str(&input.date, "%Y-%m-%d")
            .map_err(|e| ToolError::InvalidArguments(format!("date must be YYYY-MM-DD: {}", e)))?;
        let start_time = NaiveTime::parse_from_str(&input.start_time, "%H:%M")
            .map_err(|e| ToolError::InvalidArguments(format!("start_time must be HH:MM: {}", e)))?;
        let start = Local
            .from_local_datetime(&day.and_time(start_time))
            .earliest()
            .ok_or_else(|| ToolError::Failed("start time does not exist locally".to_string()))?;
        let end = match &input.end_time {
            Some(t) => {
                let end_time = NaiveTime::parse_from_str(t, "%H:%M").map_err(|e| {
                    ToolError::InvalidArguments(format!("end_time must be HH:MM: {}", e))
                })?;
                Local
                    .from_local_datetime(&day.and_time(end_time))
                    .earliest()
                    .ok_or_else(|| ToolError::Failed("end time does not exist locally".to_string()))?
            }
            None => start + Duration::hours(1),
        };

        let url = self.google.calendar_url("/calendars/primary/events");
        let body = serde_json::json!({
            "summary": input.summary,
            "start": {"dateTime": start.to_rfc3339_opts(SecondsFormat::Secs, false)},
            "end": {"dateTime": end.to_rfc3339_opts(SecondsFormat::Secs, false)},
        });
        self.google.post_json(&url, &body).await?;
        Ok(format!(
            "Added \"{}\" on {} at {}.",
            input.summary, input.date, input.start_time
        ))
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct RemoveEventInput {
    /// The title of the event to remove (case-insensitive exact match).
    pub title: String,
    /// The date in YYYY-MM-DD format.
    pub date: String,
}

/// remove_event：按标题删除当天第一条匹配事件
pub struct RemoveEventTool {
    google: Arc<GoogleClient>,
}

impl RemoveEventTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for RemoveEventTool {
    fn name(&self) -> &str {
        "remove_event"
    }

    fn description(&self) -> &str {
        "Remove an event from the calendar by title. Args: {\"title\": \"...\", \
         \"date\": \"YYYY-MM-DD\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<RemoveEventInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: RemoveEventInput = parse_args(args)?;
        let events = list_events_of_day(&self.google, &input.date).await?;
        let wanted = input.title.to_lowercase();
        // 同名多条时删列表序第一条；零匹配是预期结果，不是错误
        let target = events.iter().find(|e| e.summary.to_lowercase() == wanted);
        match target {
            Some(event) => {
                let url = self
                    .google
                    .calendar_url(&format!("/calendars/primary/events/{}", event.id));
                self.google.delete(&url).await?;
                Ok(format!(
                    "Removed \"{}\" at {} on {}.",
                    event.summary, event.start_label, input.date
                ))
            }
            None => Ok(format!(
                "No event titled \"{}\" found on {}.",
                input.title, input.date
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn google_for(server: &MockServer) -> Arc<GoogleClient> {
        Arc::new(GoogleClient::new("test-token", 5).with_calendar_base(server.uri()))
    }

    #[test]
    fn test_local_day_window_boundaries() {
        let (start, end) = local_day_window("2024-03-01").unwrap();
        assert_eq!(start.date_naive().to_string(), "2024-03-01");
        assert_eq!(end.date_naive().to_string(), "2024-03-01");
        assert_eq!((start.hour(), start.minute(), start.second()), (0, 0, 0));
        assert_eq!(start.nanosecond(), 0);
        assert_eq!((end.hour(), end.minute(), end.second()), (23, 59, 59));
        assert_eq!(end.nanosecond(), 999_999_000);
    }

    #[test]
    fn test_local_day_window_rejects_garbage() {
        assert!(matches!(
            local_day_window("March 1st"),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_get_events_sends_full_day_window() {
        let server = MockServer::start().await;
        let (start, end) = local_day_window("2024-03-01").unwrap();
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param(
                "timeMin",
                start.to_rfc3339_opts(SecondsFormat::Micros, false),
            ))
            .and(query_param(
                "timeMax",
                end.to_rfc3339_opts(SecondsFormat::Micros, false),
            ))
            .and(query_param("orderBy", "startTime"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"id": "a", "summary": "Study",
                     "start": {"dateTime": "2024-03-01T13:00:00+01:00"}},
                    {"id": "b", "summary": "Go to gym",
                     "start": {"dateTime": "2024-03-01T15:00:00+01:00"}},
                ]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let tool = GetEventsByDateTool::new(google_for(&server));
        let out = tool
            .execute(serde_json::json!({"date": "2024-03-01"}))
            .await
            .unwrap();
        assert_eq!(out, "13:00 Study\n15:00 Go to gym");
    }

    #[tokio::test]
    async fn test_get_events_idempotent_for_unchanged_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{"id": "a", "summary": "Study",
                           "start": {"dateTime": "2024-03-01T13:00:00+01:00"}}]
            })))
            .mount(&server)
            .await;

        let tool = GetEventsByDateTool::new(google_for(&server));
        let args = serde_json::json!({"date": "2024-03-01"});
        let first = tool.execute(args.clone()).await.unwrap();
        let second = tool.execute(args).await.unwrap();
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_remove_event_deletes_first_match_only() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [
                    {"id": "first", "summary": "Team Sync",
                     "start": {"dateTime": "2024-03-01T09:00:00+01:00"}},
                    {"id": "second", "summary": "Team Sync",
                     "start": {"dateTime": "2024-03-01T16:00:00+01:00"}},
                ]
            })))
            .mount(&server)
            .await;
        // 只允许删除列表序第一条
        Mock::given(method("DELETE"))
            .and(path("/calendars/primary/events/first"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let tool = RemoveEventTool::new(google_for(&server));
        let out = tool
            .execute(serde_json::json!({"title": "team sync", "date": "2024-03-01"}))
            .await
            .unwrap();
        assert!(out.contains("Removed \"Team Sync\" at 09:00"));
    }

    #[tokio::test]
    async fn test_remove_event_zero_matches_reports_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})),
            )
            .mount(&server)
            .await;

        let tool = RemoveEventTool::new(google_for(&server));
        let out = tool
            .execute(serde_json::json!({"title": "Team Sync", "date": "2024-03-01"}))
            .await
            .unwrap();
        assert_eq!(out, "No event titled \"Team Sync\" found on 2024-03-01.");
    }

    #[tokio::test]
    async fn test_add_event_posts_and_confirms() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/calendars/primary/events"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"id": "new"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let tool = AddEventTool::new(google_for(&server));
        let out = tool
            .execute(serde_json::json!({
                "summary": "Dentist",
                "date": "2024-03-01",
                "start_time": "10:30"
            }))
            .await
            .unwrap();
        assert_eq!(out, "Added \"Dentist\" on 2024-03-01 at 10:30.");
    }
}
