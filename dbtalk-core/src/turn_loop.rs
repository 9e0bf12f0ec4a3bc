//! Tool-Calling Turn Loop
//!
//! Core loop: augmented prompt → model → while the model requests tool
//! calls, execute each one, record it, and feed the result back →
//! final answer. Strictly sequential: one model round-trip or one tool
//! call in flight at a time, with a hard cap on tool-call rounds.

use anyhow::{bail, Result};
use tracing::{debug, info, warn};

use crate::executor::ToolExecutor;
use crate::prompt::augment_prompt;
use crate::provider::Conversation;
use crate::types::{ModelTurn, ToolCallRecord};

// ---------------------------------------------------------------------------
// Configuration and result
// ---------------------------------------------------------------------------

/// Configuration for a single turn.
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Maximum tool-call rounds before the turn is failed (default 10).
    pub max_tool_rounds: usize,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self { max_tool_rounds: 10 }
    }
}

/// Outcome of a turn that terminated without an LLM transport failure.
#[derive(Debug)]
pub struct TurnResult {
    /// Final answer text. `None` when the model returned a response with
    /// no content parts, which ends the turn without an answer.
    pub answer: Option<String>,
    /// Provenance trail: one record per tool call, in call order.
    pub trace: Vec<ToolCallRecord>,
    /// Number of tool-call rounds performed.
    pub rounds: usize,
}

// ---------------------------------------------------------------------------
// The loop
// ---------------------------------------------------------------------------

/// Run one user turn through the tool-calling loop.
///
/// Tool failures are recoverable: the error payload is recorded in the
/// trace and fed back to the model as the tool's result. An error from
/// the LLM transport itself fails the whole turn with `Err`; the caller
/// discards the partial trace and shows a single error message instead.
///
/// Every record appended to the trace corresponds to a tool invocation
/// that completed (successfully or with a captured error) before the
/// model was asked to continue.
pub async fn run_turn(
    conversation: &mut dyn Conversation,
    executor: &dyn ToolExecutor,
    config: &TurnConfig,
    prompt: &str,
) -> Result<TurnResult> {
    let mut trace: Vec<ToolCallRecord> = Vec::new();
    let mut rounds = 0;

    let mut turn = conversation.send_text(&augment_prompt(prompt)).await?;

    loop {
        match turn {
            ModelTurn::FinalText(text) => {
                debug!(rounds, "model produced final answer");
                return Ok(TurnResult {
                    answer: Some(text),
                    trace,
                    rounds,
                });
            }
            ModelTurn::Empty => {
                warn!(rounds, "model response had no content parts, ending turn");
                return Ok(TurnResult {
                    answer: None,
                    trace,
                    rounds,
                });
            }
            ModelTurn::ToolCall(call) => {
                if rounds >= config.max_tool_rounds {
                    bail!(
                        "tool-call budget exceeded ({} rounds)",
                        config.max_tool_rounds
                    );
                }
                rounds += 1;
                info!(round = rounds, tool = %call.name, "executing tool call");

                let result = executor.execute(&call).await;
                trace.push(ToolCallRecord {
                    name: call.name.clone(),
                    arguments: call.arguments.clone(),
                    result: result.clone(),
                });

                turn = conversation.send_tool_result(&call.name, &result).await?;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{error_payload, ToolCallRequest};
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Scripted conversation: pops the next model turn per call and
    /// records every tool result it was fed.
    struct ScriptedConversation {
        script: VecDeque<Result<ModelTurn>>,
        received_results: Vec<(String, Value)>,
        first_prompt: Option<String>,
    }

    impl ScriptedConversation {
        fn new(script: Vec<Result<ModelTurn>>) -> Self {
            Self {
                script: script.into(),
                received_results: Vec::new(),
                first_prompt: None,
            }
        }

        fn next_turn(&mut self) -> Result<ModelTurn> {
            self.script
                .pop_front()
                .unwrap_or_else(|| Ok(ModelTurn::Empty))
        }
    }

    #[async_trait]
    impl Conversation for ScriptedConversation {
        async fn send_text(&mut self, text: &str) -> Result<ModelTurn> {
            self.first_prompt = Some(text.to_string());
            self.next_turn()
        }

        async fn send_tool_result(&mut self, name: &str, result: &Value) -> Result<ModelTurn> {
            self.received_results.push((name.to_string(), result.clone()));
            self.next_turn()
        }
    }

    /// Executor that answers from a fixed table and logs what it was
    /// asked to run.
    struct TableExecutor {
        responses: Vec<(&'static str, Value)>,
        calls: Mutex<Vec<ToolCallRequest>>,
    }

    impl TableExecutor {
        fn new(responses: Vec<(&'static str, Value)>) -> Self {
            Self {
                responses,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ToolExecutor for TableExecutor {
        async fn execute(&self, call: &ToolCallRequest) -> Value {
            self.calls.lock().unwrap().push(call.clone());
            self.responses
                .iter()
                .find(|(name, _)| *name == call.name)
                .map(|(_, v)| v.clone())
                .unwrap_or_else(|| error_payload(format!("unsupported tool: {}", call.name)))
        }
    }

    fn tool_call(name: &str, arguments: Value) -> ModelTurn {
        ModelTurn::ToolCall(ToolCallRequest {
            name: name.to_string(),
            arguments,
        })
    }

    #[tokio::test]
    async fn zero_rounds_final_text() {
        let mut conversation =
            ScriptedConversation::new(vec![Ok(ModelTurn::FinalText("42 rows".into()))]);
        let executor = TableExecutor::new(vec![]);

        let result = run_turn(
            &mut conversation,
            &executor,
            &TurnConfig::default(),
            "how many rows?",
        )
        .await
        .unwrap();

        assert_eq!(result.answer.as_deref(), Some("42 rows"));
        assert!(result.trace.is_empty());
        assert_eq!(result.rounds, 0);
    }

    #[tokio::test]
    async fn prompt_is_augmented_with_grounding_suffix() {
        let mut conversation =
            ScriptedConversation::new(vec![Ok(ModelTurn::FinalText("ok".into()))]);
        let executor = TableExecutor::new(vec![]);

        run_turn(&mut conversation, &executor, &TurnConfig::default(), "list tables")
            .await
            .unwrap();

        let sent = conversation.first_prompt.unwrap();
        assert!(sent.starts_with("list tables"));
        assert!(sent.contains("Do not make up table names"));
    }

    #[tokio::test]
    async fn customer_table_scenario() {
        let rows = json!({"result": [{"id": 1, "name": "A"}]});
        let mut conversation = ScriptedConversation::new(vec![
            Ok(tool_call("sql_query", json!({"query": "SELECT * FROM customer"}))),
            Ok(ModelTurn::FinalText("Here are the customers...".into())),
        ]);
        let executor = TableExecutor::new(vec![("sql_query", rows.clone())]);

        let result = run_turn(
            &mut conversation,
            &executor,
            &TurnConfig::default(),
            "Get all customers from customer table in postgres",
        )
        .await
        .unwrap();

        assert_eq!(result.answer.as_deref(), Some("Here are the customers..."));
        assert_eq!(result.rounds, 1);
        assert_eq!(result.trace.len(), 1);
        assert_eq!(result.trace[0].name, "sql_query");
        assert_eq!(result.trace[0].result, rows);
        // the result fed back to the model is keyed by the tool name
        assert_eq!(conversation.received_results.len(), 1);
        assert_eq!(conversation.received_results[0].0, "sql_query");
        assert_eq!(conversation.received_results[0].1, rows);
    }

    #[tokio::test]
    async fn trace_preserves_call_order_across_rounds() {
        let mut conversation = ScriptedConversation::new(vec![
            Ok(tool_call("sql_query", json!({"query": "SELECT id FROM customer"}))),
            Ok(tool_call("mongo_query", json!({"query": {"id": 1}}))),
            Ok(ModelTurn::FinalText("done".into())),
        ]);
        let executor = TableExecutor::new(vec![
            ("sql_query", json!({"result": [{"id": 1}]})),
            ("mongo_query", json!([{"id": 1, "external_loans": 5}])),
        ]);

        let result = run_turn(&mut conversation, &executor, &TurnConfig::default(), "join them")
            .await
            .unwrap();

        assert_eq!(result.rounds, 2);
        let names: Vec<&str> = result.trace.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["sql_query", "mongo_query"]);
    }

    #[tokio::test]
    async fn arguments_reach_executor_unchanged() {
        let arguments = json!({"query": "SELECT * FROM customer WHERE name = '$pecial'"});
        let mut conversation = ScriptedConversation::new(vec![
            Ok(tool_call("sql_query", arguments.clone())),
            Ok(ModelTurn::FinalText("done".into())),
        ]);
        let executor = TableExecutor::new(vec![("sql_query", json!({"result": []}))]);

        let result = run_turn(&mut conversation, &executor, &TurnConfig::default(), "q")
            .await
            .unwrap();

        // what the executor saw equals what the trace recorded
        let calls = executor.calls.lock().unwrap();
        assert_eq!(calls[0].arguments, arguments);
        assert_eq!(result.trace[0].arguments, arguments);
    }

    #[tokio::test]
    async fn tool_error_is_recorded_and_loop_continues() {
        let failure = error_payload("connection refused");
        let mut conversation = ScriptedConversation::new(vec![
            Ok(tool_call("sql_query", json!({"query": "SELECT 1"}))),
            Ok(ModelTurn::FinalText("the backend is unreachable".into())),
        ]);
        let executor = TableExecutor::new(vec![("sql_query", failure.clone())]);

        let result = run_turn(&mut conversation, &executor, &TurnConfig::default(), "q")
            .await
            .unwrap();

        assert_eq!(result.answer.as_deref(), Some("the backend is unreachable"));
        assert_eq!(result.trace[0].result, failure);
        // the error payload was fed back to the model verbatim
        assert_eq!(conversation.received_results[0].1, failure);
    }

    #[tokio::test]
    async fn llm_failure_aborts_the_turn() {
        let mut conversation = ScriptedConversation::new(vec![
            Ok(tool_call("sql_query", json!({"query": "SELECT 1"}))),
            Err(anyhow::anyhow!("quota exceeded")),
        ]);
        let executor = TableExecutor::new(vec![("sql_query", json!({"result": []}))]);

        let err = run_turn(&mut conversation, &executor, &TurnConfig::default(), "q")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("quota exceeded"));
    }

    #[tokio::test]
    async fn round_cap_fails_the_turn() {
        let script: Vec<Result<ModelTurn>> = (0..20)
            .map(|_| Ok(tool_call("sql_query", json!({"query": "SELECT 1"}))))
            .collect();
        let mut conversation = ScriptedConversation::new(script);
        let executor = TableExecutor::new(vec![("sql_query", json!({"result": []}))]);

        let config = TurnConfig { max_tool_rounds: 3 };
        let err = run_turn(&mut conversation, &executor, &config, "loop forever")
            .await
            .unwrap_err();

        assert!(err.to_string().contains("tool-call budget exceeded"));
        assert_eq!(executor.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn empty_output_ends_turn_keeping_trace() {
        let mut conversation = ScriptedConversation::new(vec![
            Ok(tool_call("sql_query", json!({"query": "SELECT 1"}))),
            Ok(ModelTurn::Empty),
        ]);
        let executor = TableExecutor::new(vec![("sql_query", json!({"result": []}))]);

        let result = run_turn(&mut conversation, &executor, &TurnConfig::default(), "q")
            .await
            .unwrap();

        assert!(result.answer.is_none());
        assert_eq!(result.trace.len(), 1);
    }

    #[tokio::test]
    async fn identical_scripts_yield_identical_traces() {
        let make_script = || {
            vec![
                Ok(tool_call("sql_query", json!({"query": "SELECT * FROM customer"}))),
                Ok(ModelTurn::FinalText("same answer".into())),
            ]
        };
        let responses = vec![("sql_query", json!({"result": [{"id": 1}]}))];

        let mut first = ScriptedConversation::new(make_script());
        let executor_a = TableExecutor::new(responses.clone());
        let result_a = run_turn(&mut first, &executor_a, &TurnConfig::default(), "q")
            .await
            .unwrap();

        let mut second = ScriptedConversation::new(make_script());
        let executor_b = TableExecutor::new(responses);
        let result_b = run_turn(&mut second, &executor_b, &TurnConfig::default(), "q")
            .await
            .unwrap();

        assert_eq!(result_a.answer, result_b.answer);
        assert_eq!(result_a.trace, result_b.trace);
    }
}
