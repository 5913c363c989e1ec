//! Ecco - 语音个人助理
//!
//! 入口：初始化日志与配置，按会话能力构建 Agent，逐行读取用户输入并回答。
//! 录音/播放属于外层 UI，这里用文本行驱动同一条编排链路。

use std::io::{BufRead, Write};

use anyhow::Context;
use ecco::config::load_config;
use ecco::core::{create_agent_components, create_llm_from_config, run_pass, SessionCapabilities};
use ecco::memory::{ConversationMemory, Message};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    ecco::observability::init();

    let cfg = load_config(None).unwrap_or_else(|e| {
        tracing::warn!("Config load failed ({}), using defaults", e);
        ecco::config::AppConfig::default()
    });

    let caps = SessionCapabilities::from_env();
    let llm = create_llm_from_config(&cfg);
    let components =
        create_agent_components(&cfg, &caps, llm).context("Failed to build agent components")?;

    let mut conversation = ConversationMemory::new();

    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    loop {
        print!("you> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break; // EOF
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        if input == "exit" || input == "quit" {
            break;
        }

        conversation.push(Message::user(input));
        let answer = match run_pass(
            &components.planner,
            &components.executor,
            &components.recovery,
            &conversation,
            components.max_tool_rounds,
        )
        .await
        {
            Ok(outcome) => outcome.answer,
            // 用户永远得到一句回复；真实原因进日志
            Err(e) => {
                tracing::error!("Pass failed: {}", e);
                "Sorry, something went wrong while handling that request.".to_string()
            }
        };

        conversation.push(Message::assistant(answer.clone()));
        println!("ecco> {}", answer);
    }

    Ok(())
}
