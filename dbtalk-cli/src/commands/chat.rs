use anyhow::{Context, Result};
use tracing::info;

use dbtalk_core::config::DbtalkConfig;
use dbtalk_core::executor::QueryExecutorClient;
use dbtalk_core::history::ChatHistory;
use dbtalk_core::provider::ChatProvider;
use dbtalk_core::schema::{default_tools, extended_tools};
use dbtalk_core::trace::{escape_dollars, render_trace};
use dbtalk_core::turn_loop::{run_turn, TurnConfig};
use dbtalk_core::types::{ConversationTurn, Role};
use dbtalk_provider_gemini::GeminiProvider;

pub async fn run_chat_mode(config: DbtalkConfig) -> Result<()> {
    info!(provider = %config.provider, "starting dbtalk in chat mode");

    if let Err(e) = config.validate() {
        eprintln!("❌ Configuration error: {}", e);
        eprintln!("   Run `dbtalk config init` to set up your configuration.");
        std::process::exit(1);
    }

    let api_key = config
        .resolve_api_key(&config.provider)
        .context("no API key resolved after validation")?;
    let model = config.model_for_provider(&config.provider);
    let base_url = config
        .providers
        .gemini
        .as_ref()
        .and_then(|p| p.base_url.as_deref());

    let provider = GeminiProvider::new(&api_key, &model, base_url);

    let executor = QueryExecutorClient::new(
        &config.executor.base_url,
        config.executor.timeout(),
        config.executor.retry.to_policy(),
    )?;

    let tools = if config.chat.extended_tools {
        extended_tools()
    } else {
        default_tools()
    };
    let turn_config = TurnConfig {
        max_tool_rounds: config.chat.max_tool_rounds,
    };

    let mut history = ChatHistory::new();

    eprintln!("🗄  dbtalk v0.1.0");
    eprintln!("   Provider: {} | Model: {}", provider.name(), model);
    eprintln!("   Executor: {}", config.executor.base_url);
    eprintln!(
        "   Tools: {}",
        tools
            .iter()
            .map(|t| t.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    eprintln!("   Type /help for commands, /quit to exit\n");

    let stdin = tokio::io::stdin();
    let reader = tokio::io::BufReader::new(stdin);
    let mut lines = tokio::io::AsyncBufReadExt::lines(reader);

    loop {
        eprint!("{}> ", provider.name());
        let line = match lines.next_line().await? {
            Some(l) => l.trim().to_string(),
            None => break,
        };

        if line.is_empty() {
            continue;
        }

        if line.starts_with('/') {
            match line.as_str() {
                "/quit" | "/exit" | "/q" => {
                    eprintln!("Goodbye!");
                    break;
                }
                "/help" | "/h" => {
                    eprintln!("Available commands:");
                    eprintln!("  /history  - Redraw the conversation so far");
                    eprintln!("  /tools    - List the declared tools");
                    eprintln!("  /help     - Show this help");
                    eprintln!("  /quit     - Exit");
                }
                "/history" => {
                    if history.is_empty() {
                        eprintln!("No turns yet.");
                    } else {
                        for turn in history.turns() {
                            let marker = match turn.role {
                                Role::User => "you",
                                Role::Assistant => "assistant",
                            };
                            eprintln!("[{}] {}", marker, escape_dollars(&turn.text));
                            if !turn.trace.is_empty() {
                                eprintln!("  Function calls, parameters, and responses:");
                                for line in render_trace(&turn.trace).lines() {
                                    eprintln!("  {}", line);
                                }
                            }
                        }
                    }
                }
                "/tools" => {
                    for tool in &tools {
                        eprintln!("  • {} — {}", tool.name, tool.description);
                    }
                }
                _ => {
                    eprintln!("Unknown command: {}. Type /help for available commands.", line);
                }
            }
            continue;
        }

        history.push(ConversationTurn::user(&line));

        // One fresh conversation handle per user turn; it is dropped when
        // the turn ends and never reused.
        let mut conversation = provider.start_conversation(&tools);

        match run_turn(conversation.as_mut(), &executor, &turn_config, &line).await {
            Ok(result) => {
                let answer = result
                    .answer
                    .unwrap_or_else(|| "(the model produced no answer)".to_string());
                // The transcript is the program's output: answer and trace
                // go to stdout, everything else stays on stderr.
                println!("\n{}\n", escape_dollars(&answer));
                if !result.trace.is_empty() {
                    println!("Function calls, parameters, and responses:");
                    println!("{}", render_trace(&result.trace));
                }
                history.push(ConversationTurn::assistant(&answer, result.trace));
            }
            Err(e) => {
                // Partial tool-calling progress is not salvaged: the trace
                // is discarded and only the error is shown and recorded.
                let message = format!(
                    "Something went wrong while processing your request. \
                     Please try rephrasing your question. Details: {:#}",
                    e
                );
                eprintln!("❌ {}\n", message);
                history.push(ConversationTurn::assistant(&message, Vec::new()));
            }
        }
    }

    Ok(())
}
