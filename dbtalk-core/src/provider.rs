//! LLM Provider Seam
//!
//! Defines the `ChatProvider` and `Conversation` traits. A provider
//! creates one fresh conversation per user turn; the conversation handle
//! owns the turn-by-turn state and must never be reused after the turn
//! ends or shared across turns.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

use crate::types::{ModelTurn, ToolDeclaration};

/// A multi-turn exchange with the model within a single user turn.
///
/// Errors from the LLM transport itself (network failure, non-success
/// status, malformed response) propagate as `Err` and are fatal for the
/// turn — tool failures never travel this path, they are fed back to the
/// model as data.
#[async_trait]
pub trait Conversation: Send {
    /// Send user text and return the model's next turn.
    async fn send_text(&mut self, text: &str) -> Result<ModelTurn>;

    /// Send a tool result back into the conversation as a function
    /// response keyed by tool name, and return the model's next turn.
    async fn send_tool_result(&mut self, name: &str, result: &Value) -> Result<ModelTurn>;
}

/// Factory for fresh conversations against one LLM backend.
pub trait ChatProvider: Send + Sync {
    /// Provider identifier (e.g. "gemini").
    fn name(&self) -> &str;

    /// Start a new conversation configured with the given tool set.
    fn start_conversation(&self, tools: &[ToolDeclaration]) -> Box<dyn Conversation>;
}
