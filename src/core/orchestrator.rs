//! 编排主循环
//!
//! AwaitingModel -> ExecutingTools -> AwaitingModel ... -> Done。
//! 一次 run_pass 处理一条用户输入：把既有历史作为固定上下文、最后一条 user 消息作为
//! 本轮输入，驱动有界的模型/工具往返直到产出最终回复。工具侧错误一律转观察文本回给
//! 模型；达到轮数上限时降级收尾，绝不无限循环，也绝不留下没有回复的轮次。

use serde_json::Value;

use crate::core::{
    parse_model_output, AgentError, Planner, PlannerOutput, RecoveryAction, RecoveryEngine,
    ToolCall,
};
use crate::memory::{ConversationMemory, Message};
use crate::tools::ToolExecutor;

/// 轮数上限降级时的兜底回复
const EXHAUSTED_FALLBACK: &str =
    "I was unable to complete the request within the allowed number of tool steps. \
     Please try rephrasing or splitting the request.";

/// 单次调用的临时记录：本轮内产生、随 PassOutcome 返回供日志使用，不持久化
#[derive(Debug, Clone)]
pub struct ToolInvocation {
    pub tool: String,
    pub args: Value,
    /// Ok 为工具输出文本，Err 为字符串化后的失败原因（两者都会回给模型）
    pub outcome: Result<String, String>,
}

/// 一次编排 pass 的结果
#[derive(Debug)]
pub struct PassOutcome {
    /// 最终回复；由调用方决定是否追加进对话历史
    pub answer: String,
    /// 实际消耗的模型往返轮数
    pub rounds: usize,
    /// 本轮执行过的工具调用
    pub invocations: Vec<ToolInvocation>,
    /// 是否因轮数上限降级收尾
    pub degraded: bool,
}

/// 对会话当前状态执行一次编排 pass
///
/// 前置条件：conversation 的最后一条消息是待回答的 user 输入（否则 Protocol 错误）。
/// 编排器不修改 conversation；调用方负责把 user 输入与最终回复追加进历史。
pub async fn run_pass(
    planner: &Planner,
    executor: &ToolExecutor,
    recovery: &RecoveryEngine,
    conversation: &ConversationMemory,
    max_tool_rounds: usize,
) -> Result<PassOutcome, AgentError> {
    let current_input = conversation.latest_user_input()?;

    // 工作 transcript：既有历史（不含本轮输入）+ 本轮输入；工具往返只写在这里
    let history = conversation.messages();
    let mut transcript: Vec<Message> = history[..history.len() - 1].to_vec();
    transcript.push(Message::user(current_input));

    let mut invocations: Vec<ToolInvocation> = Vec::new();
    let mut last_output = String::new();
    let mut round = 0;

    loop {
        if round >= max_tool_rounds {
            tracing::warn!(rounds = round, "tool round limit reached, degrading");
            let answer = if last_output.trim().is_empty() {
                EXHAUSTED_FALLBACK.to_string()
            } else {
                format!(
                    "{} My last intermediate output was:\n{}",
                    EXHAUSTED_FALLBACK, last_output
                )
            };
            return Ok(PassOutcome {
                answer,
                rounds: round,
                invocations,
                degraded: true,
            });
        }

        let output = planner.plan(&transcript).await?;
        last_output = output.clone();
        round += 1;

        match parse_model_output(&output) {
            Ok(PlannerOutput::Response(answer)) => {
                let (prompt_tokens, completion_tokens, total) = planner.token_usage();
                tracing::debug!(
                    rounds = round,
                    prompt_tokens,
                    completion_tokens,
                    total,
                    "pass finished"
                );
                return Ok(PassOutcome {
                    answer,
                    rounds: round,
                    invocations,
                    degraded: false,
                });
            }
            Ok(PlannerOutput::ToolCalls(calls)) => {
                for call in calls {
                    execute_call(executor, call, &mut transcript, &mut invocations).await;
                }
            }
            Err(e) => match recovery.handle(&e) {
                // 解析失败：把纠正提示注入下一轮，让模型重试（同样消耗轮数）
                RecoveryAction::RetryWithPrompt(prompt) => {
                    tracing::debug!(error = %e, "model output unparsable, retrying");
                    transcript.push(Message::user(prompt));
                }
                RecoveryAction::Abort => return Err(e),
            },
        }
    }
}

/// 执行单个 tool call 并把观察结果写回 transcript；失败不终止 pass
async fn execute_call(
    executor: &ToolExecutor,
    call: ToolCall,
    transcript: &mut Vec<Message>,
    invocations: &mut Vec<ToolInvocation>,
) {
    let result = executor.execute(&call.tool, call.args.clone()).await;
    let (observation, outcome) = match result {
        Ok(text) => (text.clone(), Ok(text)),
        Err(e) => {
            let msg = e.to_string();
            (format!("Error: {}", msg), Err(msg))
        }
    };

    invocations.push(ToolInvocation {
        tool: call.tool.clone(),
        args: call.args,
        outcome,
    });

    // 调用与观察结果成对写回，供下一轮模型推理使用
    transcript.push(Message::assistant(format!(
        "Tool call: {} | Result: {}",
        call.tool, observation
    )));
    transcript.push(Message::user(format!(
        "Observation from {}: {}",
        call.tool, observation
    )));
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use async_trait::async_trait;
    use serde::Deserialize;

    use crate::core::RecoveryEngine;
    use crate::llm::ScriptedLlmClient;
    use crate::tools::{parse_args, Tool, ToolError, ToolRegistry};

    /// 返回固定文本的时间工具替身
    struct FixedTimeTool;

    #[async_trait]
    impl Tool for FixedTimeTool {
        fn name(&self) -> &str {
            "get_current_time"
        }

        fn description(&self) -> &str {
            "Get the current date and time."
        }

        async fn execute(&self, _args: serde_json::Value) -> Result<String, ToolError> {
            Ok("2024-03-01 13:00:00, Friday".to_string())
        }
    }

    #[derive(Deserialize, schemars::JsonSchema)]
    struct EchoInput {
        text: String,
    }

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo text back."
        }

        async fn execute(&self, args: serde_json::Value) -> Result<String, ToolError> {
            let input: EchoInput = parse_args(args)?;
            Ok(input.text)
        }
    }

    fn components(replies: Vec<&str>) -> (Planner, ToolExecutor, RecoveryEngine) {
        let llm = Arc::new(ScriptedLlmClient::new(replies));
        let planner = Planner::new(llm, "You are a test assistant.");
        let mut registry = ToolRegistry::new();
        registry.register(FixedTimeTool).unwrap();
        registry.register(EchoTool).unwrap();
        let executor = ToolExecutor::new(registry, 5);
        (planner, executor, RecoveryEngine::new())
    }

    fn conversation_with(input: &str) -> ConversationMemory {
        let mut conv = ConversationMemory::new();
        conv.push(Message::user(input));
        conv
    }

    #[tokio::test]
    async fn test_direct_answer_without_tools() {
        let (planner, executor, recovery) = components(vec!["Hello there!"]);
        let conv = conversation_with("hi");
        let outcome = run_pass(&planner, &executor, &recovery, &conv, 12)
            .await
            .unwrap();
        assert_eq!(outcome.answer, "Hello there!");
        assert_eq!(outcome.rounds, 1);
        assert!(outcome.invocations.is_empty());
        assert!(!outcome.degraded);
        // 编排器不碰对话历史
        assert_eq!(conv.len(), 1);
    }

    #[tokio::test]
    async fn test_tool_round_then_answer() {
        let (planner, executor, recovery) = components(vec![
            r#"{"tool": "get_current_time", "args": {}}"#,
            "It is 13:00 on Friday.",
        ]);
        let conv = conversation_with("what time is it?");
        let outcome = run_pass(&planner, &executor, &recovery, &conv, 12)
            .await
            .unwrap();
        assert_eq!(outcome.answer, "It is 13:00 on Friday.");
        assert_eq!(outcome.rounds, 2);
        assert_eq!(outcome.invocations.len(), 1);
        assert_eq!(outcome.invocations[0].tool, "get_current_time");
        assert_eq!(
            outcome.invocations[0].outcome.as_deref(),
            Ok("2024-03-01 13:00:00, Friday")
        );
    }

    #[tokio::test]
    async fn test_unknown_tool_fed_back_not_fatal() {
        let (planner, executor, recovery) = components(vec![
            r#"{"tool": "play_music", "args": {}}"#,
            "Sorry, I cannot play music.",
        ]);
        let conv = conversation_with("play some jazz");
        let outcome = run_pass(&planner, &executor, &recovery, &conv, 12)
            .await
            .unwrap();
        assert_eq!(outcome.answer, "Sorry, I cannot play music.");
        let err = outcome.invocations[0].outcome.as_ref().unwrap_err();
        assert!(err.contains("Unknown tool"));
    }

    #[tokio::test]
    async fn test_invalid_arguments_never_run_handler() {
        let (planner, executor, recovery) = components(vec![
            r#"{"tool": "echo", "args": {"text": 42}}"#,
            "The argument was rejected.",
        ]);
        let conv = conversation_with("echo something");
        let outcome = run_pass(&planner, &executor, &recovery, &conv, 12)
            .await
            .unwrap();
        assert_eq!(outcome.answer, "The argument was rejected.");
        let err = outcome.invocations[0].outcome.as_ref().unwrap_err();
        assert!(err.contains("Invalid arguments"));
    }

    #[tokio::test]
    async fn test_round_limit_degrades_instead_of_looping() {
        // 脚本只有一条 tool call，耗尽后重复，逼出轮数上限
        let (planner, executor, recovery) =
            components(vec![r#"{"tool": "get_current_time", "args": {}}"#]);
        let conv = conversation_with("loop forever");
        let outcome = run_pass(&planner, &executor, &recovery, &conv, 4)
            .await
            .unwrap();
        assert!(outcome.degraded);
        assert_eq!(outcome.rounds, 4);
        assert_eq!(outcome.invocations.len(), 4);
        assert!(outcome.answer.contains("unable to complete"));
    }

    #[tokio::test]
    async fn test_multiple_calls_in_one_round() {
        let (planner, executor, recovery) = components(vec![
            r#"[{"tool": "get_current_time", "args": {}},
                {"tool": "echo", "args": {"text": "pong"}}]"#,
            "Both done.",
        ]);
        let conv = conversation_with("time and echo please");
        let outcome = run_pass(&planner, &executor, &recovery, &conv, 12)
            .await
            .unwrap();
        assert_eq!(outcome.invocations.len(), 2);
        assert_eq!(outcome.invocations[1].outcome.as_deref(), Ok("pong"));
        assert_eq!(outcome.rounds, 2);
    }

    #[tokio::test]
    async fn test_malformed_json_retried_via_recovery() {
        let (planner, executor, recovery) = components(vec![
            r#"{"tool": "get_current_time", "args": {"#,
            "Recovered fine.",
        ]);
        let conv = conversation_with("what time is it?");
        let outcome = run_pass(&planner, &executor, &recovery, &conv, 12)
            .await
            .unwrap();
        assert_eq!(outcome.answer, "Recovered fine.");
        assert_eq!(outcome.rounds, 2);
        assert!(outcome.invocations.is_empty());
    }

    #[tokio::test]
    async fn test_missing_pending_user_turn_is_protocol_error() {
        let (planner, executor, recovery) = components(vec!["unused"]);
        let mut conv = ConversationMemory::new();
        conv.push(Message::user("hi"));
        conv.push(Message::assistant("hello"));
        let err = run_pass(&planner, &executor, &recovery, &conv, 12)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Protocol(_)));
    }
}
