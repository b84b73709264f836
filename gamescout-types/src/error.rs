//! Session-level error types.

use crate::model::ModelError;
use thiserror::Error;

/// Errors that propagate out of a session.
///
/// Tool failures never appear here; they are recovered locally as
/// error tool results and the session continues. Budget exhaustion and
/// screenshot timeouts are not errors at all.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ExploreError {
    /// The session configuration is unusable (e.g. the model cannot
    /// emit tool_use blocks).
    #[error("configuration error: {0}")]
    Config(String),

    /// A model call failed after retries were exhausted.
    #[error("model error: {0}")]
    Model(#[from] ModelError),

    /// Synthesis produced no parseable structured result. Carries the
    /// raw response, truncated to 500 characters.
    #[error("synthesis failed: {raw}")]
    SynthesisFailed {
        /// Truncated raw response text.
        raw: String,
    },

    /// Flow generation failed after retries were exhausted.
    #[error("flow generation failed: {0}")]
    FlowGenerationFailed(String),

    /// The caller cancelled the session.
    #[error("cancelled")]
    Cancelled,

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

/// Truncate raw model output for embedding in an error.
pub(crate) fn truncate_raw(raw: &str, limit: usize) -> String {
    if raw.len() <= limit {
        return raw.to_string();
    }
    let mut end = limit;
    while !raw.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &raw[..end])
}

impl ExploreError {
    /// Build a [`ExploreError::SynthesisFailed`] from a raw response,
    /// truncating it to 500 characters.
    pub fn synthesis_failed(raw: &str) -> Self {
        ExploreError::SynthesisFailed {
            raw: truncate_raw(raw, 500),
        }
    }
}
