//! 错误恢复引擎
//!
//! 根据 AgentError 类型返回 RecoveryAction，供编排循环决定注入重试提示还是终止。
//! 工具侧错误不经过这里：它们在循环内直接转为观察文本回给模型。

use crate::core::{AgentError, RecoveryAction};

/// 语义化错误恢复：将模型输出错误映射为可执行动作
#[derive(Debug, Default)]
pub struct RecoveryEngine;

impl RecoveryEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn handle(&self, err: &AgentError) -> RecoveryAction {
        match err {
            AgentError::JsonParseError(raw) => RecoveryAction::RetryWithPrompt(format!(
                "Your previous output was not valid JSON: {raw}. \
                To call a tool you must output exactly one JSON object of the form \
                {{\"tool\": \"tool_name\", \"args\": {{...}}}} (or a JSON array of such \
                objects), with no surrounding code fences or commentary. \
                To answer the user directly, reply with plain text only."
            )),
            _ => RecoveryAction::Abort,
        }
    }
}
