//! Progress event vocabulary and the sink callers subscribe with.

use crate::step::DurationMs;
use serde::Serialize;

/// A typed progress event emitted during a session.
///
/// The wire form is a `(kind, payload)` string pair; [`ProgressEvent::kind`]
/// and [`ProgressEvent::payload`] produce it.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressEvent {
    /// Exploration started for a URL.
    AgentStart {
        /// Target URL.
        url: String,
    },
    /// A new exploration step (model turn) is starting.
    AgentStep {
        /// 1-based step number.
        step: u64,
    },
    /// The model requested a tool call.
    AgentAction {
        /// Tool name.
        tool: String,
    },
    /// Text the model produced alongside its tool calls.
    AgentReasoning {
        /// The reasoning text.
        text: String,
    },
    /// Structured detail for one executed tool call (JSON payload).
    AgentStepDetail {
        /// Pre-serialized [`StepDetail`] JSON.
        detail: String,
    },
    /// A screenshot was persisted.
    AgentScreenshot {
        /// Filename within the session's screenshot directory.
        filename: String,
    },
    /// Exploration finished.
    AgentDone {
        /// Steps used.
        steps: u64,
    },
    /// Synthesis started.
    AgentSynthesize,
    /// A synthesis attempt failed and will be retried.
    SynthesisRetry {
        /// 1-based attempt that failed.
        attempt: u32,
    },
    /// Flow generation started.
    Flows,
    /// A flow generation attempt failed and will be retried.
    FlowsRetry {
        /// 1-based attempt that failed.
        attempt: u32,
    },
    /// Flow generation finished.
    FlowsDone {
        /// Number of flows produced.
        count: usize,
    },
}

impl ProgressEvent {
    /// The event kind string.
    pub fn kind(&self) -> &'static str {
        match self {
            ProgressEvent::AgentStart { .. } => "agent_start",
            ProgressEvent::AgentStep { .. } => "agent_step",
            ProgressEvent::AgentAction { .. } => "agent_action",
            ProgressEvent::AgentReasoning { .. } => "agent_reasoning",
            ProgressEvent::AgentStepDetail { .. } => "agent_step_detail",
            ProgressEvent::AgentScreenshot { .. } => "agent_screenshot",
            ProgressEvent::AgentDone { .. } => "agent_done",
            ProgressEvent::AgentSynthesize => "agent_synthesize",
            ProgressEvent::SynthesisRetry { .. } => "synthesis_retry",
            ProgressEvent::Flows => "flows",
            ProgressEvent::FlowsRetry { .. } => "flows_retry",
            ProgressEvent::FlowsDone { .. } => "flows_done",
        }
    }

    /// The event payload string.
    pub fn payload(&self) -> String {
        match self {
            ProgressEvent::AgentStart { url } => url.clone(),
            ProgressEvent::AgentStep { step } => step.to_string(),
            ProgressEvent::AgentAction { tool } => tool.clone(),
            ProgressEvent::AgentReasoning { text } => text.clone(),
            ProgressEvent::AgentStepDetail { detail } => detail.clone(),
            ProgressEvent::AgentScreenshot { filename } => filename.clone(),
            ProgressEvent::AgentDone { steps } => steps.to_string(),
            ProgressEvent::AgentSynthesize | ProgressEvent::Flows => String::new(),
            ProgressEvent::SynthesisRetry { attempt } => attempt.to_string(),
            ProgressEvent::FlowsRetry { attempt } => attempt.to_string(),
            ProgressEvent::FlowsDone { count } => count.to_string(),
        }
    }
}

/// The payload of an `agent_step_detail` event.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StepDetail {
    /// 1-based step record index.
    pub step_number: u64,
    /// Tool name.
    pub tool_name: String,
    /// Raw tool input.
    pub input: serde_json::Value,
    /// Result text, truncated by the emitter.
    pub result: String,
    /// Error message, if the call failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Call duration.
    pub duration_ms: DurationMs,
}

/// Where progress events go.
///
/// Emission is synchronous on the scheduler's thread of control. Sink
/// failures never fail the session; the emitter swallows them.
pub trait ProgressSink: Send + Sync {
    /// Receive one event as a `(kind, payload)` pair.
    fn emit(&self, kind: &str, payload: &str)
    -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}
