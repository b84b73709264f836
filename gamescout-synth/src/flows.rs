//! Flow generation: structured analysis in, runnable test flows out.

use crate::retry::RetryPolicy;
use gamescout_types::{
    ContentBlock, ExploreError, FlowCommand, GameAnalysis, Message, ModelRequest, ScreenshotHandle,
    SETUP_FLOW_NAME, TestFlow, TokenUsage, ToolUsingModel,
};
use serde_json::Value;
use tracing::{debug, info, warn};

/// Most screenshots attached to the flow-generation prompt.
const MAX_PROMPT_SCREENSHOTS: usize = 5;

/// Configuration for the flow-generation call.
#[derive(Debug, Clone, Default)]
pub struct FlowGenConfig {
    /// Model override.
    pub model: Option<String>,
    /// Max output tokens.
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    pub temperature: Option<f64>,
    /// Retry policy; an empty flow list counts as a failed attempt.
    pub retry: RetryPolicy,
}

/// Result of successful flow generation.
#[derive(Debug)]
pub struct FlowGenOutput {
    /// Normalized flows; the first is the shared setup.
    pub flows: Vec<TestFlow>,
    /// Token usage across all attempts.
    pub usage: TokenUsage,
}

/// Generate runnable test flows from a structured analysis.
///
/// The prompt carries the full analysis JSON and up to five recent
/// screenshots. The response is parsed as a JSON array of flows, with a
/// multi-document YAML fallback for older response styles. An empty
/// result triggers a retry; `on_retry` fires with the 1-based attempt
/// that failed.
///
/// # Errors
///
/// [`ExploreError::Model`] when the call fails past its retries;
/// [`ExploreError::FlowGenerationFailed`] when no attempt produces a
/// non-empty flow list.
pub async fn generate_flows(
    model: &dyn ToolUsingModel,
    analysis: &GameAnalysis,
    url: &str,
    framework: Option<&str>,
    screenshots: &[ScreenshotHandle],
    config: &FlowGenConfig,
    mut on_retry: impl FnMut(u32),
) -> Result<FlowGenOutput, ExploreError> {
    let prompt = build_prompt(analysis, url, framework)?;
    let mut content = vec![ContentBlock::text(prompt)];
    content.extend(
        screenshots
            .iter()
            .take(MAX_PROMPT_SCREENSHOTS)
            .map(ScreenshotHandle::to_image_block),
    );
    let messages = vec![Message::user(content)];

    let mut usage = TokenUsage::default();
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        let request = ModelRequest {
            model: config.model.clone(),
            system: None,
            messages: messages.clone(),
            tools: vec![],
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        };

        match model.complete(request).await {
            Ok(response) => {
                usage.add(response.usage);
                let raw = response.joined_text();
                let flows = normalize_flows(parse_flows(&raw), url);
                if !flows.is_empty() {
                    info!(count = flows.len(), "flow generation complete");
                    return Ok(FlowGenOutput { flows, usage });
                }
                if attempt >= config.retry.maximum_attempts {
                    return Err(ExploreError::FlowGenerationFailed(format!(
                        "no usable flows after {attempt} attempts"
                    )));
                }
                warn!(attempt, "flow generation produced no flows; retrying");
            }
            Err(err) if err.is_retryable() && attempt < config.retry.maximum_attempts => {
                warn!(attempt, %err, "flow generation call failed; retrying");
            }
            Err(err) => return Err(err.into()),
        }

        on_retry(attempt);
        tokio::time::sleep(config.retry.delay_after(attempt)).await;
    }
}

fn build_prompt(
    analysis: &GameAnalysis,
    url: &str,
    framework: Option<&str>,
) -> Result<String, ExploreError> {
    let analysis_json = serde_json::to_string_pretty(analysis)
        .map_err(|e| ExploreError::FlowGenerationFailed(format!("analysis unserializable: {e}")))?;
    let framework_note = match framework {
        Some(hint) => format!("The game appears to be built with {hint}.\n"),
        None => String::new(),
    };
    Ok(format!(
        "Convert this QA analysis into executable browser test flows for the game at \
         {url}.\n{framework_note}\
         Respond with a JSON array of flows: {{\"name\", \"url\", \"tags\"?, \"commands\"}}. \
         Each command is a single-key object, e.g. {{\"tapOn\": {{\"point\": \"50%,60%\"}}}} or \
         {{\"assertVisible\": {{\"text\": \"Score\"}}}}. The first flow must be named \
         \"{SETUP_FLOW_NAME}\" and only open the game and wait for it to load; later flows \
         assume the setup already ran. Derive one flow per test scenario, using the attached \
         screenshots for coordinates.\n\nAnalysis:\n{analysis_json}"
    ))
}

/// Parse a model response into flows: JSON array first (raw, then the
/// bracketed substring), multi-document YAML as the fallback.
fn parse_flows(raw: &str) -> Vec<TestFlow> {
    if let Ok(flows) = serde_json::from_str::<Vec<TestFlow>>(raw) {
        return flows;
    }
    if let (Some(start), Some(end)) = (raw.find('['), raw.rfind(']'))
        && end > start
        && let Ok(flows) = serde_json::from_str::<Vec<TestFlow>>(&raw[start..=end])
    {
        return flows;
    }
    parse_yaml_documents(raw)
}

fn parse_yaml_documents(raw: &str) -> Vec<TestFlow> {
    let mut flows = Vec::new();
    for doc in split_documents(raw) {
        let trimmed = doc.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(value) = serde_yaml::from_str::<Value>(trimmed) else {
            debug!("skipping unparseable YAML document");
            continue;
        };
        match value {
            Value::Object(_) => {
                if let Ok(flow) = serde_json::from_value::<TestFlow>(value) {
                    flows.push(flow);
                }
            }
            // A bare command list is a flow without a header.
            Value::Array(_) => {
                if let Ok(commands) = serde_json::from_value::<Vec<FlowCommand>>(value) {
                    flows.push(TestFlow {
                        name: String::new(),
                        app_id: None,
                        url: None,
                        tags: None,
                        commands,
                    });
                }
            }
            _ => {}
        }
    }
    flows
}

/// Split on `---` separator lines, dropping any markdown code fences.
fn split_documents(raw: &str) -> Vec<String> {
    let mut docs = vec![String::new()];
    for line in raw.lines() {
        if line.trim_start().starts_with("```") {
            continue;
        }
        if line.trim() == "---" {
            docs.push(String::new());
            continue;
        }
        if let Some(last) = docs.last_mut() {
            last.push_str(line);
            last.push('\n');
        }
    }
    docs
}

/// Normalize parsed flows: drop empty ones, fill URLs and names, make
/// sure a setup flow exists and leads, and prefix every other flow with
/// the `runFlow` setup reference.
fn normalize_flows(mut flows: Vec<TestFlow>, url: &str) -> Vec<TestFlow> {
    flows.retain(|flow| !flow.commands.is_empty());
    if flows.is_empty() {
        return flows;
    }

    for (i, flow) in flows.iter_mut().enumerate() {
        if flow.name.trim().is_empty() {
            flow.name = format!("flow-{:02}", i + 1);
        }
        if flow.url.is_none() {
            flow.url = Some(url.to_string());
        }
    }

    match flows.iter().position(|flow| flow.name == SETUP_FLOW_NAME) {
        Some(0) => {}
        Some(pos) => {
            let setup = flows.remove(pos);
            flows.insert(0, setup);
        }
        None => flows[0].name = SETUP_FLOW_NAME.into(),
    }

    for flow in flows.iter_mut().skip(1) {
        if !flow.starts_with_setup_ref() {
            flow.commands.insert(0, FlowCommand::run_setup());
        }
    }

    flows
}
