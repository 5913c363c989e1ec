//! Agent 错误类型与恢复动作
//!
//! 工具侧错误（UnknownTool / InvalidArguments / 执行失败 / 超时）在编排循环内就地恢复：
//! 字符串化后作为观察结果回给模型；Protocol 属调用方契约错误，直接上抛。

use thiserror::Error;

/// 编排过程中可能出现的错误
#[derive(Error, Debug)]
pub enum AgentError {
    /// 注册表中已存在同名工具
    #[error("Duplicate tool: {0}")]
    DuplicateTool(String),

    /// 模型点名了注册表中不存在的工具
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// 调用参数未通过该工具的输入 schema 校验（handler 不会被执行）
    #[error("Invalid arguments for {tool}: {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Tool execution failed: {0}")]
    ToolExecutionFailed(String),

    #[error("Tool timeout: {0}")]
    ToolTimeout(String),

    /// 模型输出的 JSON 无法解析为合法 tool call
    #[error("JSON parse error: {0}")]
    JsonParseError(String),

    #[error("LLM error: {0}")]
    LlmError(String),

    /// 对话状态不满足编排器前置条件（如缺少待回答的 user 消息）
    #[error("Protocol error: {0}")]
    Protocol(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

/// 恢复引擎根据错误类型给出的建议动作
#[derive(Debug, Clone)]
pub enum RecoveryAction {
    /// 将纠正提示注入下一轮，让模型重试（如 JSON 格式错误）
    RetryWithPrompt(String),
    /// 终止当前轮次，错误上抛
    Abort,
}
