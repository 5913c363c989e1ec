//! 工具执行器
//!
//! 持有 ToolRegistry 与单次调用超时：resolve 失败转 UnknownTool，参数校验失败转
//! InvalidArguments，handler 失败转 ToolExecutionFailed，超时转 ToolTimeout；
//! 每次调用输出结构化审计日志（JSON）。上述错误均由编排循环字符串化后回给模型。

use std::time::{Duration, Instant};

use tokio::time::timeout;

use crate::core::AgentError;
use crate::tools::{ToolError, ToolRegistry};

/// 工具执行器：对每次调用施加超时，并将结果映射为 AgentError
pub struct ToolExecutor {
    registry: ToolRegistry,
    timeout: Duration,
}

impl ToolExecutor {
    pub fn new(registry: ToolRegistry, timeout_secs: u64) -> Self {
        Self {
            registry,
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    /// 执行指定工具；输出 JSON 审计日志
    pub async fn execute(
        &self,
        tool_name: &str,
        args: serde_json::Value,
    ) -> Result<String, AgentError> {
        let start = Instant::now();
        let args_preview = args_preview(&args);

        let tool = match self.registry.resolve(tool_name) {
            Ok(t) => t,
            Err(e) => {
                self.audit(tool_name, "unknown_tool", false, start, &args_preview);
                return Err(e);
            }
        };

        let result = timeout(self.timeout, tool.execute(args)).await;

        let outcome: &str = match &result {
            Ok(Ok(_)) => "ok",
            Ok(Err(ToolError::InvalidArguments(_))) => "invalid_arguments",
            Ok(Err(ToolError::Failed(_))) => "error",
            Err(_) => "timeout",
        };
        self.audit(tool_name, outcome, outcome == "ok", start, &args_preview);

        match result {
            Ok(Ok(content)) => Ok(content),
            Ok(Err(ToolError::InvalidArguments(reason))) => Err(AgentError::InvalidArguments {
                tool: tool_name.to_string(),
                reason,
            }),
            Ok(Err(ToolError::Failed(msg))) => Err(AgentError::ToolExecutionFailed(msg)),
            Err(_) => Err(AgentError::ToolTimeout(tool_name.to_string())),
        }
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    fn audit(&self, tool: &str, outcome: &str, ok: bool, start: Instant, args_preview: &str) {
        let audit = serde_json::json!({
            "event": "tool_audit",
            "tool": tool,
            "ok": ok,
            "outcome": outcome,
            "duration_ms": start.elapsed().as_millis() as u64,
            "args_preview": args_preview,
        });
        tracing::info!(audit = %audit.to_string(), "tool");
    }
}

fn args_preview(args: &serde_json::Value) -> String {
    let s = args.to_string();
    if s.len() > 200 {
        format!("{}...", s.chars().take(200).collect::<String>())
    } else {
        s
    }
}
