//! 时间工具

use async_trait::async_trait;
use chrono::Local;
use serde_json::Value;

use crate::tools::{Tool, ToolError};

/// get_current_time：返回本地日期、时间与星期名
pub struct GetCurrentTimeTool;

#[async_trait]
impl Tool for GetCurrentTimeTool {
    fn name(&self) -> &str {
        "get_current_time"
    }

    fn description(&self) -> &str {
        "Get the current date, time and the week day name."
    }

    async fn execute(&self, _args: Value) -> Result<String, ToolError> {
        Ok(Local::now().format("%Y-%m-%d %H:%M:%S, %A").to_string())
    }
}
