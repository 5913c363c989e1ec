//! 工具箱：注册表与执行器，以及日历 / 邮件 / 任务 / 时间 / 位置 / 天气 / 交通 / 闹钟工具

pub mod alarm;
pub mod calendar;
pub mod executor;
pub mod gmail;
pub mod google;
pub mod gtasks;
pub mod location;
pub mod registry;
pub mod schema;
pub mod time;
pub mod transit;
pub mod weather;

pub use alarm::SetAlarmTool;
pub use calendar::{AddEventTool, GetEventsByDateTool, RemoveEventTool};
pub use executor::ToolExecutor;
pub use gmail::{GetUnreadMessagesTool, SendEmailTool};
pub use google::GoogleClient;
pub use gtasks::{
    AddTaskTool, CreateTaskListTool, ListTaskListsTool, ListTasksInListTool, RemoveTaskTool,
};
pub use location::GetCurrentLocationTool;
pub use registry::{Tool, ToolError, ToolRegistry};
pub use schema::{parse_args, schema_value, tool_call_schema_json};
pub use time::GetCurrentTimeTool;
pub use transit::{GetTravelSuggestionsTool, Station, StationIndex};
pub use weather::GetWeatherTool;
