//! 工具注册表
//!
//! 所有工具实现 Tool trait（name / description / parameters_schema / execute），
//! ToolRegistry 按注册顺序存储（list 与 catalog JSON 顺序稳定），register 拒绝重名，
//! resolve 查不到返回 UnknownTool。

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::core::AgentError;

/// 工具内部错误：参数未通过 schema 校验，或 handler 执行失败
#[derive(Error, Debug)]
pub enum ToolError {
    /// 参数不符合输入 schema；此时 handler 本体不会被执行
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    /// 底层服务调用失败（网络错误、非 2xx 响应等）
    #[error("{0}")]
    Failed(String),
}

/// 工具 trait：名称、描述（供模型决定何时调用）、参数 JSON Schema、异步执行（args 为 JSON）
#[async_trait]
pub trait Tool: Send + Sync {
    /// 工具名称（注册表内唯一，用于 tool call 的 "tool" 字段）
    fn name(&self) -> &str;

    /// 工具描述（供模型理解功能）
    fn description(&self) -> &str;

    /// 参数 JSON Schema（供模型生成正确的参数格式）
    /// 默认返回空对象，表示无参数
    fn parameters_schema(&self) -> Value {
        serde_json::json!({
            "type": "object",
            "properties": {},
            "required": []
        })
    }

    /// 执行工具；"未找到" 等预期结果用 Ok 文本表达，Err 只留给真正的失败
    async fn execute(&self, args: Value) -> Result<String, ToolError>;
}

/// 工具注册表：按注册顺序存储 Arc<dyn Tool>；会话构建时填充一次，之后只读
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册工具；重名返回 DuplicateTool
    pub fn register(&mut self, tool: impl Tool + 'static) -> Result<(), AgentError> {
        let name = tool.name().to_string();
        if self.tools.iter().any(|t| t.name() == name) {
            return Err(AgentError::DuplicateTool(name));
        }
        self.tools.push(Arc::new(tool));
        Ok(())
    }

    /// 按名查找；不存在返回 UnknownTool
    pub fn resolve(&self, name: &str) -> Result<Arc<dyn Tool>, AgentError> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .cloned()
            .ok_or_else(|| AgentError::UnknownTool(name.to_string()))
    }

    /// 注册顺序的工具列表
    pub fn list(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.tools.iter().map(|t| t.name().to_string()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// 生成工具目录 JSON（name / description / parameters），顺序与注册顺序一致，
    /// 用于拼入 system prompt 的 Available tools 段落
    pub fn to_schema_json(&self) -> String {
        let tools: Vec<serde_json::Value> = self
            .tools
            .iter()
            .map(|tool| {
                serde_json::json!({
                    "name": tool.name(),
                    "description": tool.description(),
                    "parameters": tool.parameters_schema()
                })
            })
            .collect();
        serde_json::to_string_pretty(&tools).unwrap_or_else(|_| "[]".to_string())
    }
}
