//! 核心层：错误与恢复、Planner、编排循环、会话构建

pub mod builder;
pub mod error;
pub mod orchestrator;
pub mod planner;
pub mod recovery;

pub use builder::{
    build_tool_registry, create_agent_components, create_llm_from_config, AgentComponents,
    SessionCapabilities,
};
pub use error::{AgentError, RecoveryAction};
pub use orchestrator::{run_pass, PassOutcome, ToolInvocation};
pub use planner::{parse_model_output, Planner, PlannerOutput, ToolCall};
pub use recovery::RecoveryEngine;
