//! LLM 层：客户端抽象与实现（OpenAI 兼容 / Mock / 脚本化）

pub mod mock;
pub mod openai;
pub mod traits;

pub use mock::{MockLlmClient, ScriptedLlmClient};
pub use openai::{OpenAiClient, TokenUsage};
pub use traits::LlmClient;
