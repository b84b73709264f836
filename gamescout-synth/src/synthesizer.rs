//! Synthesis: transcript in, structured analysis out.

use crate::repair::repair_truncated_json;
use crate::retry::RetryPolicy;
use gamescout_types::{
    ExploreError, GameAnalysis, Message, ModelRequest, ModelResponse, ModuleConfig, StopReason,
    TokenUsage, ToolUsingModel,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Floor on output tokens for the synthesis call. Budget-constrained
/// sessions otherwise truncate the one response that must not truncate.
pub const MIN_SYNTHESIS_TOKENS: u32 = 8192;

/// Configuration for the synthesis call.
#[derive(Debug, Clone, Default)]
pub struct SynthesisConfig {
    /// Model override.
    pub model: Option<String>,
    /// Session max output tokens; raised to [`MIN_SYNTHESIS_TOKENS`].
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Which optional review modules to ask for.
    pub modules: ModuleConfig,
    /// Retry policy for the model call.
    pub retry: RetryPolicy,
}

impl SynthesisConfig {
    fn effective_max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(0).max(MIN_SYNTHESIS_TOKENS)
    }
}

/// Result of a successful synthesis.
#[derive(Debug)]
pub struct SynthesisOutput {
    /// The parsed structured analysis.
    pub analysis: GameAnalysis,
    /// Token usage across all attempts.
    pub usage: TokenUsage,
}

/// Run synthesis over an image-free conversation.
///
/// Appends the synthesis instruction as a user message, calls the model
/// without tools under the retry policy, and walks the parsing ladder:
/// strict parse, truncation repair (only when the response stopped at
/// `max_tokens`), then first-`{`-to-last-`}` substring. A result without
/// a single mechanic is a failure.
///
/// `deadline` bounds every attempt; `on_retry` fires before each retry
/// with the 1-based attempt that failed.
///
/// # Errors
///
/// [`ExploreError::Model`] when the call fails past its retries or the
/// deadline expires; [`ExploreError::SynthesisFailed`] (carrying the raw
/// response, truncated) when no attempt yields a usable analysis.
pub async fn synthesize(
    model: &dyn ToolUsingModel,
    mut conversation: Vec<Message>,
    config: &SynthesisConfig,
    deadline: Instant,
    mut on_retry: impl FnMut(u32),
) -> Result<SynthesisOutput, ExploreError> {
    conversation.push(Message::user_text(synthesis_instruction(&config.modules)));

    let mut usage = TokenUsage::default();
    let mut attempt = 0u32;

    let response: ModelResponse = loop {
        attempt += 1;
        let request = ModelRequest {
            model: config.model.clone(),
            system: None,
            messages: conversation.clone(),
            tools: vec![],
            max_tokens: Some(config.effective_max_tokens()),
            temperature: config.temperature,
        };

        match tokio::time::timeout_at(deadline, model.complete(request)).await {
            Err(_) => {
                warn!(attempt, "synthesis deadline expired");
                return Err(ExploreError::Model(
                    gamescout_types::ModelError::RequestFailed(
                        "synthesis deadline expired".into(),
                    ),
                ));
            }
            Ok(Err(err)) if err.is_retryable() && attempt < config.retry.maximum_attempts => {
                let delay = config.retry.delay_after(attempt);
                warn!(attempt, %err, delay_ms = delay.as_millis() as u64, "synthesis call failed; retrying");
                on_retry(attempt);
                tokio::time::sleep(delay).await;
            }
            Ok(Err(err)) => return Err(err.into()),
            Ok(Ok(response)) => {
                usage.add(response.usage);
                break response;
            }
        }
    };

    let raw = response.joined_text();
    debug!(chars = raw.len(), stop_reason = ?response.stop_reason, "synthesis response received");

    match parse_analysis(&raw, response.stop_reason) {
        Some(analysis) if !analysis.mechanics.is_empty() => {
            info!(
                mechanics = analysis.mechanics.len(),
                scenarios = analysis.scenarios.len(),
                "synthesis complete"
            );
            Ok(SynthesisOutput { analysis, usage })
        }
        _ => Err(ExploreError::synthesis_failed(&raw)),
    }
}

/// The parsing ladder.
fn parse_analysis(raw: &str, stop_reason: StopReason) -> Option<GameAnalysis> {
    if let Ok(analysis) = serde_json::from_str::<GameAnalysis>(raw) {
        return Some(analysis);
    }

    if stop_reason == StopReason::MaxTokens
        && let Some(repaired) = repair_truncated_json(raw)
        && let Ok(analysis) = serde_json::from_str::<GameAnalysis>(&repaired)
    {
        debug!("synthesis response repaired after max_tokens truncation");
        return Some(analysis);
    }

    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str::<GameAnalysis>(&raw[start..=end]).ok()
}

/// Build the synthesis instruction, listing only the sections this
/// session enabled.
pub fn synthesis_instruction(modules: &ModuleConfig) -> String {
    let mut sections = vec![
        ("gameInfo", "object: name, genre, technology, features[]"),
        ("mechanics", "array of {name, description}"),
        ("uiElements", "array of {name, location, purpose}"),
        ("userFlows", "array of {name, steps[]}"),
        ("edgeCases", "array of {description, expected}"),
        (
            "scenarios",
            "array of {name, type: happy-path|edge-case|failure, priority: high|medium|low, \
             steps: [{action: launch|click|input|wait|assert, target, value, expected}]}",
        ),
    ];
    if modules.ui_ux {
        sections.push(("uiUxFindings", "array of findings (see below)"));
    }
    if modules.wording {
        sections.push(("wordingFindings", "array of findings (see below)"));
    }
    if modules.game_design {
        sections.push(("gameDesignFindings", "array of findings (see below)"));
    }
    if modules.compliance {
        sections.push(("complianceFindings", "array of findings (see below)"));
    }

    let mut instruction = String::from(
        "The exploration is over. Produce the complete QA analysis of this game as a \
         single JSON object, with exactly these top-level fields:\n\n",
    );
    for (field, shape) in &sections {
        instruction.push_str(&format!("- {field}: {shape}\n"));
    }
    if modules.any_enabled() {
        instruction.push_str(
            "\nEach finding is {severity: critical|major|minor|suggestion|positive|informational, \
             title, description, recommendation}.\n",
        );
    }
    instruction.push_str(
        "\nBase everything on what you actually observed. Respond with the JSON object \
         only, no prose and no code fences.",
    );
    instruction
}
