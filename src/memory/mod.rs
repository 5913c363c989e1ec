//! 记忆层：会话内对话历史（只追加，随会话销毁）

pub mod conversation;

pub use conversation::{ConversationMemory, Message, Role};
