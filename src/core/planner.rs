//! Planner：模型调用与 Tool Call 解析
//!
//! 调用 LLM 得到回复文本；parse_model_output 从文本中提取 JSON 并解析为一组 ToolCall
//! 或直接回复。单对象与数组两种形态都接受（一轮可请求多次调用）。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::AgentError;
use crate::llm::LlmClient;
use crate::memory::Message;

/// 模型返回的 Tool Call（简化 JSON：{"tool": "add_event", "args": {"date": "..."}}）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default = "empty_args")]
    pub args: Value,
}

fn empty_args() -> Value {
    serde_json::json!({})
}

/// Planner 输出
#[derive(Debug, Clone)]
pub enum PlannerOutput {
    /// 直接回复用户（终态）
    Response(String),
    /// 需要执行的一组工具调用
    ToolCalls(Vec<ToolCall>),
}

/// 解析模型输出：若含有效 JSON（对象或数组）且 tool 非空则为 ToolCalls，否则为 Response
pub fn parse_model_output(output: &str) -> Result<PlannerOutput, AgentError> {
    let trimmed = output.trim();

    // 尝试提取 JSON 块（```json ... ``` 或纯 JSON 对象/数组）
    let json_str = if let Some(start) = trimmed.find("```json") {
        let rest = &trimmed[start + 7..];
        rest.find("```")
            .map(|end| rest[..end].trim())
            .unwrap_or_else(|| rest.trim())
    } else if let Some(start) = trimmed.find('[') {
        match (trimmed.find('{'), trimmed.rfind(']')) {
            // '[' 在首个 '{' 之前才按数组取，避免把对象内的数组值当整体
            (obj_start, Some(end)) if obj_start.map(|o| start < o).unwrap_or(true) => {
                &trimmed[start..=end]
            }
            _ => extract_object(trimmed),
        }
    } else {
        extract_object(trimmed)
    };

    if json_str.is_empty() {
        return Ok(PlannerOutput::Response(trimmed.to_string()));
    }

    let parsed: Value = serde_json::from_str(json_str)
        .map_err(|e| AgentError::JsonParseError(format!("{}: {}", e, json_str)))?;

    let calls: Vec<ToolCall> = match parsed {
        Value::Array(items) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<_, _>>()
            .map_err(|e| AgentError::JsonParseError(e.to_string()))?,
        obj @ Value::Object(_) => {
            vec![serde_json::from_value(obj)
                .map_err(|e| AgentError::JsonParseError(e.to_string()))?]
        }
        _ => return Ok(PlannerOutput::Response(trimmed.to_string())),
    };

    if calls.is_empty() || calls.iter().any(|c| c.tool.is_empty()) {
        Ok(PlannerOutput::Response(trimmed.to_string()))
    } else {
        Ok(PlannerOutput::ToolCalls(calls))
    }
}

fn extract_object(trimmed: &str) -> &str {
    match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => "",
    }
}

/// Planner：持有 LLM 与完整 system prompt（基础人设 + 工具目录 + 输出格式契约）
pub struct Planner {
    llm: Arc<dyn LlmClient>,
    system_prompt: String,
}

impl Planner {
    pub fn new(llm: Arc<dyn LlmClient>, system_prompt: impl Into<String>) -> Self {
        Self {
            llm,
            system_prompt: system_prompt.into(),
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// 获取 LLM 累计 token 使用统计
    pub fn token_usage(&self) -> (u64, u64, u64) {
        self.llm.token_usage()
    }

    /// system prompt + 当前 transcript 发给模型，拿回原始文本
    pub async fn plan(&self, messages: &[Message]) -> Result<String, AgentError> {
        let mut full_messages = vec![Message::system(self.system_prompt.clone())];
        full_messages.extend(messages.to_vec());
        self.llm
            .complete(&full_messages)
            .await
            .map_err(AgentError::LlmError)
    }
}
