//! Google Tasks 工具：任务清单与任务的增删查
//!
//! 清单与任务都按名称解析：大小写不敏感的精确匹配，多条同名取列表序第一条；
//! 查不到一律返回说明文本而不是错误。

use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::Deserialize;
use serde_json::Value;

use crate::tools::google::GoogleClient;
use crate::tools::schema::{parse_args, schema_value};
use crate::tools::{Tool, ToolError};

/// (id, title) 形式的命名资源
#[derive(Debug, Clone)]
struct NamedItem {
    id: String,
    title: String,
}

fn collect_items(body: &Value) -> Vec<NamedItem> {
    body["items"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .map(|item| NamedItem {
                    id: item["id"].as_str().unwrap_or_default().to_string(),
                    title: item["title"].as_str().unwrap_or_default().to_string(),
                })
                .collect()
        })
        .unwrap_or_default()
}

/// 大小写不敏感取第一条同名项
fn find_by_title<'a>(items: &'a [NamedItem], title: &str) -> Option<&'a NamedItem> {
    let wanted = title.to_lowercase();
    items.iter().find(|item| item.title.to_lowercase() == wanted)
}

async fn list_task_lists(google: &GoogleClient) -> Result<Vec<NamedItem>, ToolError> {
    let url = google.tasks_url("/users/@me/lists");
    let body = google.get_json(&url, &[]).await?;
    Ok(collect_items(&body))
}

async fn resolve_task_list(
    google: &GoogleClient,
    name: &str,
) -> Result<Option<NamedItem>, ToolError> {
    let lists = list_task_lists(google).await?;
    Ok(find_by_title(&lists, name).cloned())
}

async fn list_tasks(google: &GoogleClient, list_id: &str) -> Result<Vec<NamedItem>, ToolError> {
    let url = google.tasks_url(&format!("/lists/{}/tasks", list_id));
    let body = google.get_json(&url, &[]).await?;
    Ok(collect_items(&body))
}

#[derive(Deserialize, JsonSchema)]
pub struct ListTaskListsInput {}

/// list_task_lists：列出全部任务清单
pub struct ListTaskListsTool {
    google: Arc<GoogleClient>,
}

impl ListTaskListsTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for ListTaskListsTool {
    fn name(&self) -> &str {
        "list_task_lists"
    }

    fn description(&self) -> &str {
        "List all task lists from Google Tasks."
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<ListTaskListsInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let _input: ListTaskListsInput = parse_args(args)?;
        let lists = list_task_lists(&self.google).await?;
        if lists.is_empty() {
            return Ok("You have no task lists.".to_string());
        }
        let names: Vec<&str> = lists.iter().map(|l| l.title.as_str()).collect();
        Ok(format!("Task lists: {}.", names.join(", ")))
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct CreateTaskListInput {
    /// The name of the new task list.
    pub name: String,
}

/// create_task_list：新建任务清单
pub struct CreateTaskListTool {
    google: Arc<GoogleClient>,
}

impl CreateTaskListTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for CreateTaskListTool {
    fn name(&self) -> &str {
        "create_task_list"
    }

    fn description(&self) -> &str {
        "Create a new task list in Google Tasks. Args: {\"name\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<CreateTaskListInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: CreateTaskListInput = parse_args(args)?;
        let url = self.google.tasks_url("/users/@me/lists");
        self.google
            .post_json(&url, &serde_json::json!({"title": input.name}))
            .await?;
        Ok(format!("Created task list \"{}\".", input.name))
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct ListTasksInListInput {
    /// The name of the task list.
    pub task_list: String,
}

/// list_tasks_in_list：列出指定清单中的任务
pub struct ListTasksInListTool {
    google: Arc<GoogleClient>,
}

impl ListTasksInListTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for ListTasksInListTool {
    fn name(&self) -> &str {
        "list_tasks_in_list"
    }

    fn description(&self) -> &str {
        "List all tasks in a specified task list from Google Tasks. \
         Args: {\"task_list\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<ListTasksInListInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: ListTasksInListInput = parse_args(args)?;
        let Some(list) = resolve_task_list(&self.google, &input.task_list).await? else {
            return Ok(format!("No task list named \"{}\".", input.task_list));
        };
        let tasks = list_tasks(&self.google, &list.id).await?;
        if tasks.is_empty() {
            return Ok(format!("\"{}\" has no tasks.", list.title));
        }
        let lines: Vec<String> = tasks.iter().map(|t| format!("- {}", t.title)).collect();
        Ok(format!("Tasks in \"{}\":\n{}", list.title, lines.join("\n")))
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct AddTaskInput {
    /// The name of the task list to add the task to.
    pub task_list: String,
    /// The title of the task.
    pub title: String,
    /// Optional notes for the task.
    #[serde(default)]
    pub notes: Option<String>,
}

/// add_task：向指定清单添加任务
pub struct AddTaskTool {
    google: Arc<GoogleClient>,
}

impl AddTaskTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for AddTaskTool {
    fn name(&self) -> &str {
        "add_task"
    }

    fn description(&self) -> &str {
        "Add a task to a specified task list in Google Tasks. \
         Args: {\"task_list\": \"...\", \"title\": \"...\", \"notes\": \"...\" (optional)}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<AddTaskInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: AddTaskInput = parse_args(args)?;
        let Some(list) = resolve_task_list(&self.google, &input.task_list).await? else {
            return Ok(format!("No task list named \"{}\".", input.task_list));
        };
        let url = self.google.tasks_url(&format!("/lists/{}/tasks", list.id));
        let mut body = serde_json::json!({"title": input.title});
        if let Some(notes) = &input.notes {
            body["notes"] = Value::String(notes.clone());
        }
        self.google.post_json(&url, &body).await?;
        Ok(format!(
            "Added task \"{}\" to \"{}\".",
            input.title, list.title
        ))
    }
}

#[derive(Deserialize, JsonSchema)]
pub struct RemoveTaskInput {
    /// The name of the task list to remove the task from.
    pub task_list: String,
    /// The title of the task to remove (case-insensitive exact match).
    pub title: String,
}

/// remove_task：从指定清单删除第一条同名任务
pub struct RemoveTaskTool {
    google: Arc<GoogleClient>,
}

impl RemoveTaskTool {
    pub fn new(google: Arc<GoogleClient>) -> Self {
        Self { google }
    }
}

#[async_trait]
impl Tool for RemoveTaskTool {
    fn name(&self) -> &str {
        "remove_task"
    }

    fn description(&self) -> &str {
        "Remove a task from a specified task list in Google Tasks. \
         Args: {\"task_list\": \"...\", \"title\": \"...\"}"
    }

    fn parameters_schema(&self) -> Value {
        schema_value::<RemoveTaskInput>()
    }

    async fn execute(&self, args: Value) -> Result<String, ToolError> {
        let input: RemoveTaskInput = parse_args(args)?;
        let Some(list) = resolve_task_list(&self.google, &input.task_list).await? else {
            return Ok(format!("No task list named \"{}\".", input.task_list));
        };
        let tasks = list_tasks(&self.google, &list.id).await?;
        match find_by_title(&tasks, &input.title) {
            Some(task) => {
                let url = self
                    .google
                    .tasks_url(&format!("/lists/{}/tasks/{}", list.id, task.id));
                self.google.delete(&url).await?;
                Ok(format!(
                    "Removed task \"{}\" from \"{}\".",
                    task.title, list.title
                ))
            }
            None => Ok(format!(
                "No task titled \"{}\" in \"{}\".",
                input.title, list.title
            )),
        }
    }
}
