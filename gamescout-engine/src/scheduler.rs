//! The step scheduler: the outer exploration loop.
//!
//! One iteration is one model turn: admit, drain hints, call the model,
//! emit reasoning, execute tool calls in emission order, append the
//! mirrored tool results as a single user message, prune stale images,
//! record the step. Tool calls run strictly sequentially; the browser
//! is a single serialized resource.

use crate::budget::{BudgetGovernor, StepAdmission};
use crate::context::{EXPLORATION_IMAGE_WINDOW, prune_images};
use crate::hints::{HINT_MARKER, HintSource};
use crate::progress::ProgressEmitter;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use gamescout_tools::{ToolDispatcher, names};
use gamescout_types::{
    ContentBlock, DurationMs, Message, ModelError, ModelRequest, ProgressEvent, ScreenshotHandle,
    StepDetail, StepRecord, TokenUsage, ToolSchema, ToolUsingModel,
};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Literal sentinel the model writes to end exploration.
pub const COMPLETION_SENTINEL: &str = "EXPLORATION_COMPLETE";

/// Character cap on result text inside `agent_step_detail` payloads.
const STEP_DETAIL_RESULT_CAP: usize = 300;

/// Screenshots kept aside for the flow-generation prompt.
const RECENT_SCREENSHOTS: usize = 5;

/// Why the exploration loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExplorationExit {
    /// The model wrote the completion sentinel.
    Completed,
    /// The model stopped without the sentinel.
    EndTurn,
    /// The step budget was spent.
    StepsExhausted,
    /// The exploration deadline passed.
    DeadlinePassed,
    /// The caller asked for a graceful stop.
    Stopped,
    /// The caller cancelled outright.
    Cancelled,
    /// A model call failed; the error is in the outcome.
    ModelFailed,
}

/// Everything the loop produced.
#[derive(Debug)]
pub struct ExplorationOutcome {
    /// Why the loop ended.
    pub exit: ExplorationExit,
    /// The full conversation, images pruned to the exploration window.
    pub conversation: Vec<Message>,
    /// The append-only step log.
    pub steps: Vec<StepRecord>,
    /// Token usage across all turns.
    pub usage: TokenUsage,
    /// The most recent screenshots, newest last.
    pub recent_screenshots: Vec<ScreenshotHandle>,
    /// The model error behind [`ExplorationExit::ModelFailed`].
    pub error: Option<ModelError>,
}

/// The exploration loop. Wired up by the session orchestrator; fields
/// are the collaborators one loop run borrows.
pub struct StepScheduler<'a> {
    /// The model capability.
    pub model: &'a dyn ToolUsingModel,
    /// The browser tool dispatcher.
    pub dispatcher: &'a mut ToolDispatcher,
    /// The budget governor.
    pub governor: &'a mut BudgetGovernor,
    /// Progress event fan-out.
    pub emitter: &'a ProgressEmitter,
    /// Operator hint ingress, drained each turn.
    pub hints: Option<&'a mut HintSource>,
    /// Hard cancellation: abort now.
    pub cancel: &'a CancellationToken,
    /// Soft stop: exit the loop cleanly, synthesis still runs.
    pub stop: &'a CancellationToken,
    /// System prompt for every turn.
    pub system_prompt: String,
    /// Tool catalogue offered to the model.
    pub tools: Vec<ToolSchema>,
    /// Model id override.
    pub model_id: Option<String>,
    /// Max output tokens per turn.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Where to persist screenshots, if anywhere.
    pub screenshot_dir: Option<PathBuf>,
}

impl StepScheduler<'_> {
    /// Drive the loop until a termination condition fires.
    pub async fn run(&mut self, mut conversation: Vec<Message>) -> ExplorationOutcome {
        let mut steps: Vec<StepRecord> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut recent_screenshots: Vec<ScreenshotHandle> = Vec::new();
        let mut step_index: u64 = 0;
        let mut error: Option<ModelError> = None;

        let exit = loop {
            // Cancellation wins over everything, including a pending
            // completion; the admission check comes after.
            if self.cancel.is_cancelled() {
                break ExplorationExit::Cancelled;
            }
            if self.stop.is_cancelled() {
                break ExplorationExit::Stopped;
            }
            match self.governor.admit_step() {
                StepAdmission::Admitted => {}
                StepAdmission::StepsExhausted => break ExplorationExit::StepsExhausted,
                StepAdmission::DeadlinePassed => break ExplorationExit::DeadlinePassed,
            }

            if let Some(hints) = self.hints.as_deref_mut() {
                for hint in hints.drain() {
                    info!(hint, "injecting operator hint");
                    conversation.push(Message::user_text(format!("{HINT_MARKER}{hint}")));
                }
            }

            self.emitter.emit(ProgressEvent::AgentStep {
                step: u64::from(self.governor.steps_used()) + 1,
            });

            let request = ModelRequest {
                model: self.model_id.clone(),
                system: Some(self.system_prompt.clone()),
                messages: conversation.clone(),
                tools: self.tools.clone(),
                max_tokens: Some(self.max_tokens),
                temperature: self.temperature,
            };
            let response = match self.model.complete(request).await {
                Ok(response) => response,
                Err(err) => {
                    warn!(%err, "model call failed during exploration");
                    error = Some(err);
                    break ExplorationExit::ModelFailed;
                }
            };
            usage.add(response.usage);

            // The assistant message goes in verbatim.
            conversation.push(Message::assistant(response.content.clone()));

            for block in &response.content {
                if let ContentBlock::Text { text } = block
                    && !text.trim().is_empty()
                {
                    self.emitter.emit(ProgressEvent::AgentReasoning { text: text.clone() });
                }
            }

            let sentinel_in_turn = response.content.iter().any(
                |block| matches!(block, ContentBlock::Text { text } if text.contains(COMPLETION_SENTINEL)),
            );

            // Collect tool calls with the text that immediately preceded them.
            let mut tool_uses: Vec<(String, String, Value, Option<String>)> = Vec::new();
            let mut last_text: Option<String> = None;
            for block in &response.content {
                match block {
                    ContentBlock::Text { text } => last_text = Some(text.clone()),
                    ContentBlock::ToolUse { id, name, input } => {
                        tool_uses.push((id.clone(), name.clone(), input.clone(), last_text.take()));
                    }
                    _ => {}
                }
            }

            if tool_uses.is_empty() {
                if sentinel_in_turn {
                    break ExplorationExit::Completed;
                }
                // end_turn, max_tokens, anything else: without tool calls
                // there is nothing to continue with.
                break ExplorationExit::EndTurn;
            }

            let mut result_blocks: Vec<ContentBlock> = Vec::new();
            for (call_id, tool_name, input, reasoning) in tool_uses {
                self.emitter.emit(ProgressEvent::AgentAction {
                    tool: tool_name.clone(),
                });

                let started = Instant::now();
                let (text, mut screenshot, tool_error) = if is_budget_tool(&tool_name) {
                    (
                        self.handle_budget_tool(&tool_name, &input, sentinel_in_turn),
                        None,
                        None,
                    )
                } else {
                    let outcome = self.dispatcher.dispatch(&tool_name, &input).await;
                    (outcome.text, outcome.screenshot, outcome.error)
                };
                let duration = DurationMs::from(started.elapsed());
                step_index += 1;

                let mut filename = None;
                if let (Some(shot), Some(dir)) =
                    (screenshot.as_mut(), self.screenshot_dir.as_deref())
                {
                    match persist_screenshot(shot, dir, step_index, &tool_name).await {
                        Ok(name) => filename = Some(name),
                        Err(message) => warn!(%message, "screenshot persistence failed"),
                    }
                }

                let detail = StepDetail {
                    step_number: step_index,
                    tool_name: tool_name.clone(),
                    input: input.clone(),
                    result: truncate_chars(&text, STEP_DETAIL_RESULT_CAP),
                    error: tool_error.clone(),
                    duration_ms: duration,
                };
                self.emitter.emit(ProgressEvent::AgentStepDetail {
                    detail: serde_json::to_string(&detail).unwrap_or_default(),
                });
                if let Some(name) = &filename {
                    self.emitter.emit(ProgressEvent::AgentScreenshot {
                        filename: name.clone(),
                    });
                }

                let block = match (&tool_error, &screenshot) {
                    (Some(message), _) => {
                        ContentBlock::tool_error(call_id, format!("Error: {message}"))
                    }
                    (None, Some(shot)) => {
                        ContentBlock::tool_result_with_image(call_id, text.as_str(), shot)
                    }
                    (None, None) => ContentBlock::tool_result(call_id, text.as_str()),
                };
                result_blocks.push(block);

                steps.push(StepRecord {
                    index: step_index,
                    tool: tool_name,
                    input,
                    result: text,
                    screenshot: filename,
                    duration_ms: duration,
                    error: tool_error,
                    reasoning,
                });

                if let Some(shot) = screenshot {
                    recent_screenshots.push(shot);
                    if recent_screenshots.len() > RECENT_SCREENSHOTS {
                        recent_screenshots.remove(0);
                    }
                }
            }

            // One user message mirrors the turn's tool calls, in order.
            conversation.push(Message::user(result_blocks));
            prune_images(&mut conversation, EXPLORATION_IMAGE_WINDOW);
            self.governor.record_step(1);
        };

        info!(?exit, steps = steps.len(), "exploration loop finished");
        ExplorationOutcome {
            exit,
            conversation,
            steps,
            usage,
            recent_screenshots,
            error,
        }
    }

    /// Budget tools are answered by the governor, not the browser. A
    /// turn that also carries the completion sentinel gets nothing; it
    /// does not get to grow the budget it is abandoning.
    fn handle_budget_tool(&mut self, name: &str, input: &Value, sentinel_in_turn: bool) -> String {
        if sentinel_in_turn {
            return "Exploration was signalled complete this turn; no budget extension granted."
                .into();
        }
        let reason = input
            .get("reason")
            .and_then(Value::as_str)
            .unwrap_or("(no reason given)");
        match name {
            names::REQUEST_MORE_STEPS => {
                let requested = input
                    .get("additional_steps")
                    .and_then(Value::as_u64)
                    .unwrap_or(0) as u32;
                let granted = self.governor.request_more_steps(requested);
                info!(requested, granted, reason, "step extension requested");
                if granted > 0 {
                    format!(
                        "Granted {granted} additional steps; the limit is now {}.",
                        self.governor.steps_max()
                    )
                } else {
                    "No additional steps granted; the step budget is at its hard cap.".into()
                }
            }
            _ => {
                let minutes = input
                    .get("additional_minutes")
                    .and_then(Value::as_u64)
                    .unwrap_or(0);
                let granted = self
                    .governor
                    .request_more_time(Duration::from_secs(minutes * 60));
                info!(minutes, granted_secs = granted.as_secs(), reason, "time extension requested");
                if granted > Duration::ZERO {
                    format!(
                        "Granted {} additional seconds of exploration time.",
                        granted.as_secs()
                    )
                } else {
                    "No additional time granted; the time budget is at its hard cap.".into()
                }
            }
        }
    }
}

fn is_budget_tool(name: &str) -> bool {
    name == names::REQUEST_MORE_STEPS || name == names::REQUEST_MORE_TIME
}

/// Write a screenshot to disk as `step-<N>-<tool>.<ext>` and remember
/// the path on the handle.
async fn persist_screenshot(
    shot: &mut ScreenshotHandle,
    dir: &Path,
    index: u64,
    tool: &str,
) -> Result<String, String> {
    let bytes = STANDARD
        .decode(&shot.data)
        .map_err(|e| format!("undecodable screenshot payload: {e}"))?;
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| e.to_string())?;
    let filename = format!("step-{index}-{tool}.{}", shot.extension());
    let path = dir.join(&filename);
    tokio::fs::write(&path, bytes)
        .await
        .map_err(|e| e.to_string())?;
    shot.path = Some(path);
    Ok(filename)
}

fn truncate_chars(s: &str, cap: usize) -> String {
    s.chars().take(cap).collect()
}
