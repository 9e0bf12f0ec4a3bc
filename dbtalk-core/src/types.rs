//! Core Data Types
//!
//! Shared tool, trace, and conversation-turn types used across the
//! dbtalk codebase.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Conversation types
// ---------------------------------------------------------------------------

/// Who produced a turn.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// A completed user or assistant turn, as kept in
/// [`ChatHistory`](crate::history::ChatHistory). Never mutated after being
/// appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique turn id.
    pub id: String,
    pub role: Role,
    /// Display text: the user's prompt, the final answer, or the error
    /// message for a failed turn.
    pub text: String,
    /// Provenance: every tool call made while producing this turn, in
    /// call order. Empty for user turns.
    pub trace: Vec<ToolCallRecord>,
    pub created_at: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a user turn.
    pub fn user(text: &str) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            text: text.to_string(),
            trace: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Create an assistant turn with its provenance trace.
    pub fn assistant(text: &str, trace: Vec<ToolCallRecord>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            text: text.to_string(),
            trace,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tool types
// ---------------------------------------------------------------------------

/// A tool advertised to the LLM. Declared once at startup; the set is
/// fixed for the lifetime of a conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDeclaration {
    /// Tool name.
    pub name: String,
    /// Human-readable description shown to the model.
    pub description: String,
    /// JSON Schema for the tool's parameters, including its `required`
    /// list.
    pub parameters: Value,
}

/// A tool call requested by the LLM. One call is active at a time; the
/// loop never batches parallel calls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON arguments to pass to the tool.
    pub arguments: Value,
}

/// One completed tool invocation: what was called, with what arguments,
/// and what came back. Immutable once appended to a turn's trace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCallRecord {
    pub name: String,
    pub arguments: Value,
    /// The backend's JSON on success, `{"error": "..."}` on failure.
    pub result: Value,
}

/// What the model produced in one round.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelTurn {
    /// Final answer text; ends the turn successfully.
    FinalText(String),
    /// The model wants a tool invoked before it continues.
    ToolCall(ToolCallRequest),
    /// The response carried no content parts at all. Ends the turn
    /// without an answer.
    Empty,
}

/// Build the uniform `{"error": string}` payload used to report any
/// tool-call failure back into the conversation.
pub fn error_payload(message: impl Into<String>) -> Value {
    serde_json::json!({ "error": message.into() })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_turn_has_empty_trace() {
        let turn = ConversationTurn::user("hello");
        assert_eq!(turn.role, Role::User);
        assert!(turn.trace.is_empty());
    }

    #[test]
    fn assistant_turn_keeps_trace_order() {
        let trace = vec![
            ToolCallRecord {
                name: "sql_query".into(),
                arguments: serde_json::json!({"query": "SELECT 1"}),
                result: serde_json::json!({"result": []}),
            },
            ToolCallRecord {
                name: "mongo_query".into(),
                arguments: serde_json::json!({"query": {}}),
                result: serde_json::json!([]),
            },
        ];
        let turn = ConversationTurn::assistant("done", trace);
        assert_eq!(turn.trace.len(), 2);
        assert_eq!(turn.trace[0].name, "sql_query");
        assert_eq!(turn.trace[1].name, "mongo_query");
    }

    #[test]
    fn error_payload_shape() {
        let payload = error_payload("connection refused");
        assert_eq!(payload["error"], "connection refused");
    }

    #[test]
    fn turn_round_trips_through_json() {
        let turn = ConversationTurn::assistant(
            "answer",
            vec![ToolCallRecord {
                name: "sql_query".into(),
                arguments: serde_json::json!({"query": "SELECT * FROM customer"}),
                result: serde_json::json!({"result": [{"id": 1}]}),
            }],
        );
        let json = serde_json::to_string(&turn).unwrap();
        let parsed: ConversationTurn = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.text, "answer");
        assert_eq!(parsed.trace, turn.trace);
    }
}
