//! Ecco - 语音个人助理的智能体编排核心
//!
//! 模块划分：
//! - **config**: 应用配置加载（TOML + 环境变量）
//! - **core**: 错误与恢复、Planner、编排循环、会话构建
//! - **llm**: LLM 客户端抽象与实现（OpenAI 兼容 / Mock）
//! - **memory**: 会话内对话历史（只追加）
//! - **speech**: 语音适配（音频字节 <-> 文本）
//! - **tools**: 工具箱（日历 / 邮件 / 任务 / 时间 / 位置 / 天气 / 交通 / 闹钟）与执行器

pub mod config;
pub mod core;
pub mod llm;
pub mod memory;
pub mod observability;
pub mod speech;
pub mod tools;
