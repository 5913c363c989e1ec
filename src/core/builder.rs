//! 会话构建：能力判定一次完成，按需注册工具
//!
//! 凭据是对核心不透明的能力句柄：有则在构建时注册对应工具组，无则整组省略——
//! 模型的可选集中根本看不到缺凭据的工具，也就不可能去调用它们。存在性检查只在
//! 这里发生一次，不散落在请求处理路径里。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::core::{AgentError, Planner, RecoveryEngine};
use crate::llm::{LlmClient, MockLlmClient, OpenAiClient};
use crate::tools::{
    AddEventTool, AddTaskTool, CreateTaskListTool, GetCurrentLocationTool, GetCurrentTimeTool,
    GetEventsByDateTool, GetTravelSuggestionsTool, GetUnreadMessagesTool, GetWeatherTool,
    GoogleClient, ListTaskListsTool, ListTasksInListTool, RemoveEventTool, RemoveTaskTool,
    SendEmailTool, SetAlarmTool, StationIndex, ToolExecutor, ToolRegistry,
};

/// 语音助理人设（工具目录与输出格式契约在构建时拼接在后面）
const SYS_PROMPT: &str = "\
You are a voice assistant named Ecco. Your task is to handle questions and \
requests from users. You have access to various tools and you must call them \
if they help you handle the request from the user. You may have access to the \
user's calendar, email and tasks as tools if they are connected. You can get \
real-time information by calling tools. Do not make up an answer to a question \
or request that you do not know, or if the tools do not provide information to \
answer that question.";

/// 会话能力：外部服务的不透明句柄；核心只判断有无
#[derive(Debug, Clone, Default)]
pub struct SessionCapabilities {
    /// 已授权的 Google 访问令牌（日历 / Gmail / Tasks 工具组）
    pub google_token: Option<String>,
    /// 会话坐标 (纬度, 经度)
    pub location: Option<(f64, f64)>,
    /// 天气服务 API Key
    pub weather_api_key: Option<String>,
    /// 行程规划服务 API Key
    pub transit_api_key: Option<String>,
    /// 闹钟设备端点 URL
    pub alarm_url: Option<String>,
}

impl SessionCapabilities {
    /// 全部缺省：只有无凭据工具可用
    pub fn none() -> Self {
        Self::default()
    }

    /// 从环境变量读取能力句柄
    pub fn from_env() -> Self {
        let latitude = std::env::var("ECCO_LATITUDE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok());
        let longitude = std::env::var("ECCO_LONGITUDE")
            .ok()
            .and_then(|v| v.parse::<f64>().ok());
        Self {
            google_token: std::env::var("GOOGLE_ACCESS_TOKEN").ok(),
            location: latitude.zip(longitude),
            weather_api_key: std::env::var("WEATHER_API_KEY").ok(),
            transit_api_key: std::env::var("SL_API_KEY").ok(),
            alarm_url: std::env::var("ECCO_ALARM_URL").ok(),
        }
    }
}

/// 预构建的 Agent 组件：Planner、ToolExecutor、Recovery 与轮数上限，可整个会话复用
pub struct AgentComponents {
    pub planner: Planner,
    pub executor: ToolExecutor,
    pub recovery: RecoveryEngine,
    pub max_tool_rounds: usize,
}

/// 根据配置与环境变量选择 LLM 后端（OpenAI 兼容 / Mock）
pub fn create_llm_from_config(cfg: &AppConfig) -> Arc<dyn LlmClient> {
    if std::env::var("OPENAI_API_KEY").is_ok() {
        tracing::info!("Using OpenAI LLM ({})", cfg.llm.model);
        Arc::new(OpenAiClient::new(
            cfg.llm.base_url.as_deref(),
            &cfg.llm.model,
            std::env::var("OPENAI_API_KEY").ok().as_deref(),
        ))
    } else {
        tracing::warn!("No API key set, using Mock LLM");
        Arc::new(MockLlmClient)
    }
}

/// 构建会话工具注册表：无凭据工具总是注册，凭据门控的工具组按能力有无注册
pub fn build_tool_registry(
    cfg: &AppConfig,
    caps: &SessionCapabilities,
) -> Result<ToolRegistry, AgentError> {
    let timeout = cfg.tools.tool_timeout_secs;
    let mut registry = ToolRegistry::new();

    registry.register(GetCurrentTimeTool)?;

    if let Some(token) = &caps.google_token {
        let google = Arc::new(GoogleClient::new(token.clone(), timeout));
        registry.register(GetEventsByDateTool::new(google.clone()))?;
        registry.register(AddEventTool::new(google.clone()))?;
        registry.register(RemoveEventTool::new(google.clone()))?;
        registry.register(SendEmailTool::new(google.clone()))?;
        registry.register(GetUnreadMessagesTool::new(google.clone()))?;
        registry.register(ListTaskListsTool::new(google.clone()))?;
        registry.register(CreateTaskListTool::new(google.clone()))?;
        registry.register(ListTasksInListTool::new(google.clone()))?;
        registry.register(AddTaskTool::new(google.clone()))?;
        registry.register(RemoveTaskTool::new(google))?;
    }

    if let Some((latitude, longitude)) = caps.location {
        registry.register(GetCurrentLocationTool::new(latitude, longitude))?;
    }

    if let Some(key) = &caps.weather_api_key {
        registry.register(GetWeatherTool::new(key.clone(), timeout))?;
    }

    if let Some(key) = &caps.transit_api_key {
        // 参考表损坏或缺失时跳过工具而不是让会话构建失败
        match StationIndex::load(&cfg.tools.transit.stops_path) {
            Ok(stations) => {
                registry.register(GetTravelSuggestionsTool::new(key.clone(), stations, timeout))?;
            }
            Err(e) => tracing::warn!("Transit tool disabled: {}", e),
        }
    }

    if let Some(url) = &caps.alarm_url {
        registry.register(SetAlarmTool::new(url.clone(), timeout))?;
    }

    Ok(registry)
}

/// 人设 + 工具目录 + 输出格式契约拼成完整 system prompt
fn build_system_prompt(registry: &ToolRegistry) -> String {
    format!(
        "{}\n\n## Available tools\n{}\n\n## Tool call format\n\
         To call a tool, output exactly one JSON object {{\"tool\": \"tool_name\", \
         \"args\": {{...}}}} (or a JSON array of such objects to call several tools), \
         matching this schema:\n{}\n\
         To answer the user directly, reply with plain text and no JSON.",
        SYS_PROMPT,
        registry.to_schema_json(),
        crate::tools::tool_call_schema_json()
    )
}

/// 创建 Agent 组件：能力判定、注册表、system prompt 与执行器一次构建完成
pub fn create_agent_components(
    cfg: &AppConfig,
    caps: &SessionCapabilities,
    llm: Arc<dyn LlmClient>,
) -> Result<AgentComponents, AgentError> {
    let registry = build_tool_registry(cfg, caps)?;
    tracing::info!(tools = ?registry.tool_names(), "session tools registered");

    let system_prompt = build_system_prompt(&registry);
    let executor = ToolExecutor::new(registry, cfg.tools.tool_timeout_secs);

    Ok(AgentComponents {
        planner: Planner::new(llm, system_prompt),
        executor,
        recovery: RecoveryEngine::new(),
        max_tool_rounds: cfg.agent.max_tool_rounds,
    })
}
