//! 对话状态：按时间序追加的消息历史
//!
//! 会话内只追加、不修改、不删除；最旧在前。编排器把最后一条 user 消息视为本轮输入，
//! 其余作为固定上下文；最终回复由调用方（而非编排器）追加回历史。

use serde::{Deserialize, Serialize};

use crate::core::AgentError;

/// 消息角色（与 LLM API 一致；对话历史中只会出现 User/Assistant，System 仅用于请求拼装）
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Role {
    User,
    Assistant,
    System,
}

/// 单条消息
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }
}

/// 会话级对话历史：只追加，随会话销毁，无持久化
#[derive(Clone, Debug, Default)]
pub struct ConversationMemory {
    messages: Vec<Message>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, msg: Message) {
        self.messages.push(msg);
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    /// 本轮待回答的用户输入：最后一条消息且 role 必须为 User，否则属于调用方契约错误
    pub fn latest_user_input(&self) -> Result<&str, AgentError> {
        match self.messages.last() {
            Some(m) if m.role == Role::User => Ok(&m.content),
            _ => Err(AgentError::Protocol("no pending user turn".to_string())),
        }
    }

    /// 新会话重置（会话内历史不做剪枝，完整保留）
    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
