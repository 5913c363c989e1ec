//! Mock / 脚本化 LLM 客户端（用于测试与无 API Key 场景）

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::llm::LlmClient;
use crate::memory::{Message, Role};

/// Mock 客户端：直接回显用户最后一条消息，让无 Key 环境也能跑通整条链路
#[derive(Debug, Default)]
pub struct MockLlmClient;

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, messages: &[Message]) -> Result<String, String> {
        let last_user = messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, Role::User))
            .map(|m| m.content.as_str())
            .unwrap_or("(no input)");

        Ok(format!("Echo from Mock: {}", last_user))
    }
}

/// 脚本化客户端：依次弹出预设回复；脚本耗尽后重复最后一条
/// （单条 tool call 脚本即可逼出编排器的轮数上限路径）
#[derive(Debug, Default)]
pub struct ScriptedLlmClient {
    replies: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    calls: Mutex<u64>,
}

impl ScriptedLlmClient {
    pub fn new(replies: Vec<&str>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().map(String::from).collect()),
            last: Mutex::new(String::new()),
            calls: Mutex::new(0),
        }
    }

    /// 实际发生的 complete 调用次数
    pub fn calls(&self) -> u64 {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl LlmClient for ScriptedLlmClient {
    async fn complete(&self, _messages: &[Message]) -> Result<String, String> {
        *self.calls.lock().unwrap() += 1;
        let mut replies = self.replies.lock().unwrap();
        match replies.pop_front() {
            Some(reply) => {
                *self.last.lock().unwrap() = reply.clone();
                Ok(reply)
            }
            None => {
                let last = self.last.lock().unwrap().clone();
                if last.is_empty() {
                    Err("script exhausted".to_string())
                } else {
                    Ok(last)
                }
            }
        }
    }
}
