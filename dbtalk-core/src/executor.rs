//! Query Executor Client
//!
//! Maps tool names to backend HTTP endpoints and forwards the tool's
//! arguments as a JSON body. Every failure mode — unknown tool name,
//! transport error, non-200 status, malformed response body — collapses
//! into the uniform `{"error": ...}` payload so the turn loop can feed
//! it back to the model instead of crashing the turn.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, warn};

use crate::retry::{with_retry, RetryPolicy};
use crate::types::{error_payload, ToolCallRequest};

// ---------------------------------------------------------------------------
// Dispatch table
// ---------------------------------------------------------------------------

/// Resolve the endpoint path for a tool name. `None` means the name is
/// outside the contract and must be reported back as an error.
pub fn route_for(tool_name: &str) -> Option<&'static str> {
    match tool_name {
        "sql_query" => Some("/execute_sql"),
        "mongo_query" => Some("/query_mongo"),
        "create_table" => Some("/create_table"),
        "load_data" => Some("/load_data"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tool executor seam
// ---------------------------------------------------------------------------

/// Executes tool calls on behalf of the turn loop.
///
/// Implementations never fail the turn: any failure is returned as an
/// `{"error": ...}` payload for the model to react to.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute one call, returning the backend's JSON or an error payload.
    async fn execute(&self, call: &ToolCallRequest) -> Value;
}

// ---------------------------------------------------------------------------
// HTTP client
// ---------------------------------------------------------------------------

/// HTTP client for the query-executor service.
pub struct QueryExecutorClient {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl QueryExecutorClient {
    /// Create a client with a per-call timeout and retry policy.
    pub fn new(base_url: &str, timeout: Duration, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build executor HTTP client")?;
        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry,
        })
    }

    /// One POST attempt. Transport failures surface as `Err` (the only
    /// thing the retry policy acts on); application errors from the
    /// backend and malformed bodies come back as `Ok` error payloads —
    /// they are answers for the model, not faults to retry.
    async fn post_once(&self, url: &str, arguments: &Value) -> Result<Value> {
        let response = self
            .client
            .post(url)
            .json(arguments)
            .send()
            .await
            .context("executor request failed")?;

        let status = response.status();
        let body = response.text().await.context("executor response read failed")?;

        if !status.is_success() {
            let detail = serde_json::from_str::<Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_string))
                .unwrap_or(body);
            return Ok(error_payload(format!(
                "backend error (HTTP {}): {}",
                status.as_u16(),
                detail
            )));
        }

        match serde_json::from_str::<Value>(&body) {
            Ok(value) => Ok(value),
            Err(e) => Ok(error_payload(format!(
                "malformed JSON from executor: {}",
                e
            ))),
        }
    }
}

#[async_trait]
impl ToolExecutor for QueryExecutorClient {
    async fn execute(&self, call: &ToolCallRequest) -> Value {
        let Some(path) = route_for(&call.name) else {
            warn!(tool = %call.name, "model requested an undeclared tool");
            return error_payload(format!("unsupported tool: {}", call.name));
        };
        let url = format!("{}{}", self.base_url, path);
        debug!(tool = %call.name, url = %url, "dispatching tool call");

        match with_retry(&self.retry, &call.name, || {
            self.post_once(&url, &call.arguments)
        })
        .await
        {
            Ok(value) => value,
            Err(e) => {
                warn!(tool = %call.name, err = %e, "tool call failed");
                error_payload(format!("{:#}", e))
            }
        }
    }
}
