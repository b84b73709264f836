//! The model capability the core drives.

use crate::content::{ContentBlock, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// JSON Schema description of a tool offered to the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's input.
    pub input_schema: serde_json::Value,
}

/// A request to the model.
///
/// The same shape serves both calls with a tool catalogue (exploration)
/// and calls without one (synthesis, flow generation): an empty `tools`
/// list means the model is not offered tools.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelRequest {
    /// Model to use (None = provider default).
    pub model: Option<String>,
    /// System prompt.
    pub system: Option<String>,
    /// Conversation messages.
    pub messages: Vec<Message>,
    /// Available tools; empty to disable tool use for this call.
    pub tools: Vec<ToolSchema>,
    /// Maximum output tokens.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
}

/// Why the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The model produced a final response.
    EndTurn,
    /// The model wants to use a tool.
    ToolUse,
    /// The response was cut off at the output-token limit.
    MaxTokens,
    /// Anything else the provider reports.
    Other,
}

/// Token usage counters from a single model call. Observability only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    /// Input tokens consumed.
    pub input_tokens: u64,
    /// Output tokens generated.
    pub output_tokens: u64,
}

impl TokenUsage {
    /// Fold another call's usage into this total.
    pub fn add(&mut self, other: TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
    }
}

/// A response from the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Ordered response content blocks.
    pub content: Vec<ContentBlock>,
    /// Why the model stopped.
    pub stop_reason: StopReason,
    /// Token usage for this call.
    pub usage: TokenUsage,
}

impl ModelResponse {
    /// Concatenated text of all text blocks in the response.
    pub fn joined_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Whether the response contains any tool_use block.
    pub fn has_tool_use(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
    }
}

/// Errors from the model capability.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ModelError {
    /// HTTP or network request failed.
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The provider rate-limited the request.
    #[error("rate limited")]
    RateLimited,

    /// Could not interpret the provider's response.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Catch-all for provider-specific errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl ModelError {
    /// Whether retrying this request might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ModelError::RateLimited | ModelError::RequestFailed(_)
        )
    }
}

/// A multimodal, tool-capable model.
///
/// Implementations wrap a concrete provider. The core refuses to run the
/// exploration loop against a model whose
/// [`supports_tool_use`](ToolUsingModel::supports_tool_use) is false.
#[async_trait]
pub trait ToolUsingModel: Send + Sync {
    /// Send a request and get the full response.
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;

    /// Whether the backing model can emit tool_use blocks.
    fn supports_tool_use(&self) -> bool {
        true
    }
}
