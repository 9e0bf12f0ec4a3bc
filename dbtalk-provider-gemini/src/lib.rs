//! Google Gemini Chat Provider
//!
//! Implements `ChatProvider`/`Conversation` for the Gemini
//! `generateContent` REST API, including function calling. Each
//! conversation handle owns the `contents` array for one user turn:
//! user text, the model's echoed parts, and `functionResponse` parts
//! keyed by tool name.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use dbtalk_core::provider::{ChatProvider, Conversation};
use dbtalk_core::types::{ModelTurn, ToolCallRequest, ToolDeclaration};

// ---------------------------------------------------------------------------
// Provider
// ---------------------------------------------------------------------------

/// Google Gemini chat provider.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    base_url: String,
    client: reqwest::Client,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: &str, base_url: Option<&str>) -> Self {
        Self {
            api_key: api_key.to_string(),
            model: model.to_string(),
            base_url: base_url
                .unwrap_or("https://generativelanguage.googleapis.com")
                .trim_end_matches('/')
                .to_string(),
            client: reqwest::Client::new(),
        }
    }
}

impl ChatProvider for GeminiProvider {
    fn name(&self) -> &str {
        "gemini"
    }

    fn start_conversation(&self, tools: &[ToolDeclaration]) -> Box<dyn Conversation> {
        let declarations: Vec<Value> = tools
            .iter()
            .map(|t| {
                json!({
                    "name": t.name,
                    "description": t.description,
                    "parameters": t.parameters
                })
            })
            .collect();

        Box::new(GeminiConversation {
            url: format!(
                "{}/v1beta/models/{}:generateContent?key={}",
                self.base_url, self.model, self.api_key
            ),
            model: self.model.clone(),
            client: self.client.clone(),
            contents: Vec::new(),
            declarations,
        })
    }
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

struct GeminiConversation {
    url: String,
    model: String,
    client: reqwest::Client,
    /// Accumulated `contents` for this turn, extended by every message.
    contents: Vec<Value>,
    declarations: Vec<Value>,
}

impl GeminiConversation {
    /// Call `generateContent` with the accumulated contents and fold the
    /// response into a [`ModelTurn`].
    async fn generate(&mut self) -> Result<ModelTurn> {
        let mut body = json!({
            "contents": self.contents,
            "generationConfig": {
                "temperature": 0,
            }
        });

        if !self.declarations.is_empty() {
            body["tools"] = json!([{
                "functionDeclarations": self.declarations
            }]);
        }

        debug!(model = %self.model, messages = self.contents.len(), "calling Gemini API");

        let response = self
            .client
            .post(&self.url)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("failed to call Gemini API")?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Gemini API error (HTTP {}): {}", status, body);
        }

        let parsed: Value = response
            .json()
            .await
            .context("failed to parse Gemini response")?;

        let Some(content) = parsed
            .get("candidates")
            .and_then(|c| c.as_array())
            .and_then(|c| c.first())
            .and_then(|candidate| candidate.get("content"))
        else {
            return Ok(ModelTurn::Empty);
        };

        // Keep the model content in the conversation verbatim so later
        // rounds see their own function calls.
        self.contents.push(content.clone());

        let Some(parts) = content.get("parts").and_then(|p| p.as_array()) else {
            return Ok(ModelTurn::Empty);
        };

        // The first functionCall part wins; otherwise the answer is the
        // concatenation of every text part.
        for part in parts {
            if let Some(fc) = part.get("functionCall") {
                return Ok(ModelTurn::ToolCall(ToolCallRequest {
                    name: fc
                        .get("name")
                        .and_then(|n| n.as_str())
                        .unwrap_or("")
                        .to_string(),
                    arguments: fc.get("args").cloned().unwrap_or_else(|| json!({})),
                }));
            }
        }

        let text: String = parts
            .iter()
            .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            Ok(ModelTurn::Empty)
        } else {
            Ok(ModelTurn::FinalText(text))
        }
    }
}

#[async_trait]
impl Conversation for GeminiConversation {
    async fn send_text(&mut self, text: &str) -> Result<ModelTurn> {
        self.contents.push(json!({
            "role": "user",
            "parts": [{ "text": text }]
        }));
        self.generate().await
    }

    async fn send_tool_result(&mut self, name: &str, result: &Value) -> Result<ModelTurn> {
        self.contents.push(json!({
            "role": "user",
            "parts": [{
                "functionResponse": {
                    "name": name,
                    "response": { "content": result }
                }
            }]
        }));
        self.generate().await
    }
}
