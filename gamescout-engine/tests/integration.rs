//! End-to-end session tests over mock model and browser capabilities.

use async_trait::async_trait;
use gamescout_engine::{
    BudgetConfig, BudgetGovernor, CheckpointStore, ExplorationExit, Explorer, Phase,
    ProgressEmitter, SessionConfig, StepScheduler, count_images, hint_channel,
};
use gamescout_state::Checkpoint;
use gamescout_tools::{ToolDispatcher, tool_schemas};
use gamescout_types::{
    BrowserError, BrowserPage, ContentBlock, ExploreError, GameAnalysis, Mechanic, Message,
    ModelError, ModelRequest, ModelResponse, PageInfo, PageMeta, Priority, ProgressSink,
    ScenarioStep, ScenarioType, StepAction, StopReason, TestScenario, TokenUsage, ToolUsingModel,
};
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const URL: &str = "https://example.com/game";

// -- Mock model --

struct MockModel {
    responses: Mutex<VecDeque<Result<ModelResponse, ModelError>>>,
    requests: Mutex<Vec<ModelRequest>>,
    tool_capable: bool,
}

impl MockModel {
    fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            requests: Mutex::new(Vec::new()),
            tool_capable: true,
        }
    }

    fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl ToolUsingModel for MockModel {
    async fn complete(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.requests.lock().unwrap().push(request);
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .expect("MockModel: no more responses queued")
    }

    fn supports_tool_use(&self) -> bool {
        self.tool_capable
    }
}

// -- Mock page --

struct MockPage {
    stall_screenshots: bool,
}

impl MockPage {
    fn new() -> Self {
        Self {
            stall_screenshots: false,
        }
    }
}

#[async_trait]
impl BrowserPage for MockPage {
    async fn capture_screenshot(&self) -> Result<Vec<u8>, BrowserError> {
        if self.stall_screenshots {
            std::future::pending::<()>().await;
        }
        Ok(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }
    async fn click(&self, _x: i64, _y: i64) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn type_text(&self, _text: &str) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn scroll_by(&self, _dx: i64, _dy: i64) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn evaluate(&self, _expression: &str) -> Result<String, BrowserError> {
        Ok("3".into())
    }
    async fn wait_for_visible(
        &self,
        _selector: &str,
        _timeout: Duration,
    ) -> Result<(), BrowserError> {
        Ok(())
    }
    async fn page_info(&self) -> Result<PageInfo, BrowserError> {
        Ok(PageInfo {
            title: "Orbit Drop".into(),
            url: URL.into(),
            visible_text: "PLAY".into(),
        })
    }
    async fn console_lines(&self) -> Result<Vec<String>, BrowserError> {
        Ok(vec!["Phaser v3.60".into()])
    }
    async fn navigate(&self, _url: &str) -> Result<(), BrowserError> {
        Ok(())
    }
}

// -- Recording sink --

struct RecordingSink {
    events: Mutex<Vec<(String, String)>>,
}

impl RecordingSink {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            events: Mutex::new(Vec::new()),
        })
    }

    fn kinds(&self) -> Vec<String> {
        self.events.lock().unwrap().iter().map(|(k, _)| k.clone()).collect()
    }

    fn payloads_of(&self, kind: &str) -> Vec<String> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| k == kind)
            .map(|(_, p)| p.clone())
            .collect()
    }
}

impl ProgressSink for RecordingSink {
    fn emit(
        &self,
        kind: &str,
        payload: &str,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.events
            .lock()
            .unwrap()
            .push((kind.to_string(), payload.to_string()));
        Ok(())
    }
}

// -- Response helpers --

fn tool_use(id: &str, name: &str, input: serde_json::Value) -> ModelResponse {
    ModelResponse {
        content: vec![
            ContentBlock::text(format!("Using {name} next.")),
            ContentBlock::ToolUse {
                id: id.into(),
                name: name.into(),
                input,
            },
        ],
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        },
    }
}

fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        content: vec![ContentBlock::text(text)],
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage {
            input_tokens: 10,
            output_tokens: 5,
        },
    }
}

fn done_response() -> ModelResponse {
    text_response("I have seen enough of this game. EXPLORATION_COMPLETE")
}

fn analysis_json() -> String {
    json!({
        "gameInfo": {"name": "Orbit Drop", "genre": "arcade", "technology": "phaser", "features": ["score", "levels"]},
        "mechanics": [{"name": "gravity well", "description": "pulls the puck inward"}],
        "uiElements": [{"name": "Play button", "location": "center", "purpose": "starts a run"}],
        "userFlows": [{"name": "first run", "steps": ["open", "press play"]}],
        "edgeCases": [{"description": "rapid restart", "expected": "no crash"}],
        "scenarios": [
            {"name": "first run", "type": "happy-path", "priority": "high",
             "steps": [{"action": "launch", "target": URL, "expected": "menu visible"}]},
            {"name": "spam restart", "type": "edge-case", "priority": "medium",
             "steps": [{"action": "click", "target": "Restart", "expected": "game resets"}]}
        ]
    })
    .to_string()
}

fn synthesis_response() -> ModelResponse {
    text_response(&analysis_json())
}

fn flows_response() -> ModelResponse {
    let flows = json!([
        {"name": "setup", "commands": [{"launchApp": {"url": URL}}]},
        {"name": "score increments", "commands": [{"tapOn": {"text": "Play"}}]}
    ]);
    text_response(&flows.to_string())
}

fn small_budget() -> BudgetConfig {
    BudgetConfig {
        max_steps: 5,
        hard_cap_steps: 5,
        total_timeout: Duration::from_secs(300),
        timeout_hard_cap: Duration::from_secs(600),
        synthesis_reserve: Duration::from_secs(180),
        adaptive_steps: false,
        adaptive_time: false,
    }
}

fn base_config() -> SessionConfig {
    SessionConfig::builder(URL)
        .session_id("qa-test")
        .page_meta(PageMeta {
            title: "Orbit Drop".into(),
            url: URL.into(),
            framework: Some("phaser".into()),
        })
        .budget(small_budget())
        .build()
}

fn explorer(model: Arc<MockModel>, config: SessionConfig) -> Explorer {
    Explorer::new(model, Arc::new(MockPage::new()), config)
}

// -- Scenarios --

#[tokio::test(start_paused = true)]
async fn happy_path_produces_analysis_and_flows() {
    let model = Arc::new(MockModel::new(vec![
        tool_use("tu_1", "screenshot", json!({})),
        tool_use("tu_2", "click", json!({"x": 500, "y": 400})),
        tool_use("tu_3", "evaluate_js", json!({"expression": "window.game.scene.scenes.length"})),
        done_response(),
        synthesis_response(),
        flows_response(),
    ]));
    let sink = RecordingSink::new();
    let report = explorer(model.clone(), base_config())
        .with_progress(sink.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.exit, ExplorationExit::Completed);
    assert_eq!(report.steps.len(), 3);
    assert_eq!(report.steps[0].tool, "screenshot");
    assert_eq!(report.steps[1].tool, "click");
    assert_eq!(report.steps[2].tool, "evaluate_js");
    assert_eq!(report.steps[2].result, "3");

    let analysis = report.analysis.as_ref().unwrap();
    assert!(!analysis.mechanics.is_empty());
    assert_eq!(report.flows[0].name, "setup");
    assert!(report.flows.len() >= 2);
    assert!(report.flows[1].starts_with_setup_ref());

    // One agent_action and one agent_step_detail per tool call.
    assert_eq!(sink.payloads_of("agent_action").len(), 3);
    assert_eq!(sink.payloads_of("agent_step_detail").len(), 3);

    // Phase events in order.
    let kinds = sink.kinds();
    let pos = |k: &str| kinds.iter().position(|x| x == k).unwrap();
    assert_eq!(pos("agent_start"), 0);
    assert!(pos("agent_done") < pos("agent_synthesize"));
    assert!(pos("agent_synthesize") < pos("flows"));
    assert!(pos("flows") < pos("flows_done"));

    // Exploration calls carry the tool catalogue; synthesis and flow
    // generation run without tools.
    let requests = model.requests();
    assert_eq!(requests.len(), 6);
    assert!(!requests[0].tools.is_empty());
    assert!(requests[4].tools.is_empty());
    assert!(requests[5].tools.is_empty());

    // The synthesis conversation is image-free.
    let synthesis_request = &requests[4];
    let image_blocks: usize = synthesis_request
        .messages
        .iter()
        .flat_map(|m| &m.content)
        .filter(|b| matches!(b, ContentBlock::Image { .. }))
        .count();
    assert_eq!(image_blocks, 0);

    // Token usage accumulated across every call.
    assert_eq!(report.usage.input_tokens, 60);
}

#[tokio::test(start_paused = true)]
async fn repeated_clicks_get_a_warning() {
    let model = Arc::new(MockModel::new(vec![
        tool_use("tu_1", "click", json!({"x": 500, "y": 400})),
        tool_use("tu_2", "click", json!({"x": 510, "y": 395})),
        tool_use("tu_3", "click", json!({"x": 500, "y": 402})),
        done_response(),
        synthesis_response(),
        flows_response(),
    ]));
    let report = explorer(model, base_config()).run().await.unwrap();

    assert!(report.steps[2]
        .result
        .contains("clicked near these coordinates 3+ times"));
    assert!(report.steps[0].error.is_none());
    assert!(report.steps[2].error.is_none());
}

#[tokio::test(start_paused = true)]
async fn screenshot_timeout_is_absorbed() {
    let model = Arc::new(MockModel::new(vec![
        tool_use("tu_1", "screenshot", json!({})),
        done_response(),
        synthesis_response(),
        flows_response(),
    ]));
    let page = Arc::new(MockPage {
        stall_screenshots: true,
    });
    let report = Explorer::new(model, page, base_config()).run().await.unwrap();

    assert_eq!(report.steps[0].result, "Screenshot timed out");
    assert!(report.steps[0].error.is_none());
    assert!(report.steps[0].screenshot.is_none());
    // The session carried on to a full analysis.
    assert!(report.analysis.is_some());
}

#[tokio::test(start_paused = true)]
async fn truncated_synthesis_is_repaired() {
    let cut = r#"{"gameInfo":{"name":"X"},"mechanics":[{"name":"A"#;
    let mut truncated = text_response(cut);
    truncated.stop_reason = StopReason::MaxTokens;

    let model = Arc::new(MockModel::new(vec![
        done_response(),
        truncated,
        flows_response(),
    ]));
    let report = explorer(model, base_config()).run().await.unwrap();

    let analysis = report.analysis.unwrap();
    assert_eq!(analysis.mechanics.len(), 1);
    assert_eq!(analysis.mechanics[0].name, "A");
}

#[tokio::test(start_paused = true)]
async fn resume_from_analyzed_checkpoint_skips_synthesis() {
    let stored = GameAnalysis {
        mechanics: vec![
            Mechanic { name: "gravity well".into(), description: String::new() },
            Mechanic { name: "combo meter".into(), description: String::new() },
            Mechanic { name: "shield".into(), description: String::new() },
        ],
        scenarios: vec![
            TestScenario {
                name: "first run".into(),
                scenario_type: ScenarioType::HappyPath,
                priority: Priority::High,
                steps: vec![ScenarioStep {
                    action: StepAction::Launch,
                    target: URL.into(),
                    value: String::new(),
                    expected: "menu".into(),
                }],
            },
            TestScenario {
                name: "refresh mid-run".into(),
                scenario_type: ScenarioType::EdgeCase,
                priority: Priority::Medium,
                steps: vec![],
            },
        ],
        ..Default::default()
    };
    let checkpoint = Checkpoint {
        phase: Phase::Analyzed,
        step: 14,
        agent_mode: true,
        page_meta: PageMeta::default(),
        analysis: Some(stored.clone()),
        modules: Default::default(),
        timestamp: chrono::Utc::now(),
    };

    let model = Arc::new(MockModel::new(vec![flows_response()]));
    let config = SessionConfig::builder(URL)
        .budget(small_budget())
        .resume(checkpoint)
        .build();
    let report = explorer(model.clone(), config).run().await.unwrap();

    // Exactly one model call: the flow generator. No synthesizer call.
    assert_eq!(model.calls(), 1);
    assert_eq!(report.analysis.unwrap(), stored);
    assert_eq!(report.steps_used, 14);
    assert!(!report.flows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn adaptive_steps_extension_admits_later_steps() {
    let model = Arc::new(MockModel::new(vec![
        tool_use("tu_1", "click", json!({"x": 10, "y": 10})),
        tool_use("tu_2", "click", json!({"x": 600, "y": 10})),
        tool_use("tu_3", "click", json!({"x": 10, "y": 600})),
        tool_use(
            "tu_4",
            "request_more_steps",
            json!({"reason": "explore bonus round", "additional_steps": 3}),
        ),
        tool_use("tu_5", "click", json!({"x": 600, "y": 600})),
        tool_use("tu_6", "click", json!({"x": 300, "y": 300})),
        done_response(),
        synthesis_response(),
        flows_response(),
    ]));
    let config = SessionConfig::builder(URL)
        .budget(BudgetConfig {
            max_steps: 5,
            hard_cap_steps: 10,
            adaptive_steps: true,
            ..small_budget()
        })
        .build();
    let report = explorer(model, config).run().await.unwrap();

    // The grant raised the limit to 8, so step 6 was admitted.
    assert_eq!(report.steps.len(), 6);
    assert_eq!(report.steps_used, 6);
    assert!(report.steps[3].result.contains("Granted 3 additional steps"));
    assert!(report.steps[3].result.contains("8"));
    assert_eq!(report.exit, ExplorationExit::Completed);
}

// -- Boundary behavior --

#[tokio::test(start_paused = true)]
async fn zero_step_budget_still_synthesizes() {
    let model = Arc::new(MockModel::new(vec![synthesis_response(), flows_response()]));
    let config = SessionConfig::builder(URL)
        .budget(BudgetConfig {
            max_steps: 0,
            hard_cap_steps: 0,
            ..small_budget()
        })
        .build();
    let report = explorer(model.clone(), config).run().await.unwrap();

    assert_eq!(report.exit, ExplorationExit::StepsExhausted);
    assert!(report.steps.is_empty());
    assert!(report.analysis.is_some());
    // First call is already the tool-less synthesis call.
    assert!(model.requests()[0].tools.is_empty());
}

#[tokio::test(start_paused = true)]
async fn expired_deadline_at_entry_still_synthesizes() {
    let model = Arc::new(MockModel::new(vec![synthesis_response(), flows_response()]));
    let config = SessionConfig::builder(URL)
        .budget(BudgetConfig {
            // Smaller than the minimum reserve: exploration gets nothing.
            total_timeout: Duration::from_secs(30),
            ..small_budget()
        })
        .build();
    let report = explorer(model, config).run().await.unwrap();

    assert_eq!(report.exit, ExplorationExit::DeadlinePassed);
    assert!(report.analysis.is_some());
}

#[tokio::test(start_paused = true)]
async fn cancellation_fails_with_partial_report() {
    let model = Arc::new(MockModel::new(vec![]));
    let session = explorer(model, base_config());
    session.cancellation_token().cancel();

    let failure = session.run().await.unwrap_err();
    assert!(matches!(failure.error, ExploreError::Cancelled));
    assert_eq!(failure.partial.exit, ExplorationExit::Cancelled);
    assert!(failure.partial.steps.is_empty());
}

#[tokio::test(start_paused = true)]
async fn soft_stop_still_produces_a_report() {
    let model = Arc::new(MockModel::new(vec![synthesis_response(), flows_response()]));
    let session = explorer(model, base_config());
    session.stop_token().cancel();

    let report = session.run().await.unwrap();
    assert_eq!(report.exit, ExplorationExit::Stopped);
    assert!(report.analysis.is_some());
    assert!(!report.flows.is_empty());
}

#[tokio::test(start_paused = true)]
async fn non_tool_model_is_refused() {
    let model = Arc::new(MockModel {
        responses: Mutex::new(VecDeque::new()),
        requests: Mutex::new(Vec::new()),
        tool_capable: false,
    });
    let failure = explorer(model, base_config()).run().await.unwrap_err();
    assert!(matches!(failure.error, ExploreError::Config(_)));
}

#[tokio::test(start_paused = true)]
async fn flow_failure_still_returns_partial_analysis() {
    let model = Arc::new(MockModel::new(vec![
        done_response(),
        synthesis_response(),
        text_response("no flows, sorry"),
        text_response("[]"),
        text_response("still nothing"),
    ]));
    let failure = explorer(model, base_config()).run().await.unwrap_err();

    assert!(matches!(failure.error, ExploreError::FlowGenerationFailed(_)));
    assert!(failure.partial.analysis.is_some());
}

// -- Side artefacts --

#[tokio::test(start_paused = true)]
async fn checkpoints_are_written_after_each_phase() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(MockModel::new(vec![
        done_response(),
        synthesis_response(),
        flows_response(),
    ]));
    let config = SessionConfig::builder(URL)
        .budget(small_budget())
        .checkpoint_dir(dir.path())
        .build();
    explorer(model, config).run().await.unwrap();

    let store = CheckpointStore::new(dir.path());
    assert!(store.read(Phase::Scouted).await.unwrap().is_some());
    let synthesized = store.read(Phase::Synthesized).await.unwrap().unwrap();
    assert!(synthesized.analysis.is_some());
    assert!(synthesized.agent_mode);
}

#[tokio::test(start_paused = true)]
async fn screenshots_are_persisted_and_announced() {
    let dir = tempfile::tempdir().unwrap();
    let model = Arc::new(MockModel::new(vec![
        tool_use("tu_1", "click", json!({"x": 5, "y": 5})),
        done_response(),
        synthesis_response(),
        flows_response(),
    ]));
    let sink = RecordingSink::new();
    let config = SessionConfig::builder(URL)
        .budget(small_budget())
        .screenshot_dir(dir.path())
        .build();
    let report = explorer(model, config)
        .with_progress(sink.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.steps[0].screenshot.as_deref(), Some("step-1-click.jpg"));
    assert!(dir.path().join("step-1-click.jpg").exists());
    assert_eq!(sink.payloads_of("agent_screenshot"), vec!["step-1-click.jpg"]);
}

#[tokio::test(start_paused = true)]
async fn hints_enter_the_conversation_with_a_marker() {
    let (sender, source) = hint_channel();
    sender.post("try the shop button");

    let model = Arc::new(MockModel::new(vec![
        done_response(),
        synthesis_response(),
        flows_response(),
    ]));
    explorer(model.clone(), base_config())
        .with_hints(source)
        .run()
        .await
        .unwrap();

    let first_request = &model.requests()[0];
    let hint_present = first_request.messages.iter().any(|m| {
        m.joined_text()
            .contains("[Operator hint] try the shop button")
    });
    assert!(hint_present);
}

// -- Conversation invariants, driven through the scheduler directly --

#[tokio::test(start_paused = true)]
async fn tool_results_mirror_tool_uses_and_images_stay_bounded() {
    let turns: Vec<ModelResponse> = (0..8)
        .map(|i| tool_use(&format!("tu_{i}"), "click", json!({"x": i * 120, "y": 40})))
        .chain(std::iter::once(done_response()))
        .collect();
    let model = MockModel::new(turns);
    let page: Arc<dyn BrowserPage> = Arc::new(MockPage::new());
    let mut dispatcher = ToolDispatcher::new(page);
    let mut governor = BudgetGovernor::new(&BudgetConfig {
        max_steps: 20,
        hard_cap_steps: 20,
        ..small_budget()
    });
    let emitter = ProgressEmitter::new(None);
    let cancel = CancellationToken::new();
    let stop = CancellationToken::new();

    let mut scheduler = StepScheduler {
        model: &model,
        dispatcher: &mut dispatcher,
        governor: &mut governor,
        emitter: &emitter,
        hints: None,
        cancel: &cancel,
        stop: &stop,
        system_prompt: "explore".into(),
        tools: tool_schemas(false, false),
        model_id: None,
        max_tokens: 4096,
        temperature: None,
        screenshot_dir: None,
    };
    let outcome = scheduler
        .run(vec![Message::user_text("start")])
        .await;

    assert_eq!(outcome.exit, ExplorationExit::Completed);
    assert_eq!(outcome.steps.len(), 8);

    // Every assistant message with tool_use blocks is mirrored by the
    // next message: a user message with matching ids in the same order.
    let messages = &outcome.conversation;
    for (i, message) in messages.iter().enumerate() {
        let use_ids: Vec<&str> = message
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolUse { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect();
        if use_ids.is_empty() {
            continue;
        }
        let next = &messages[i + 1];
        let result_ids: Vec<&str> = next
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(use_ids, result_ids, "mismatch after message {i}");
    }

    // The sliding window kept at most 4 images alive.
    assert!(count_images(messages) <= 4);

    // The last five screenshots were kept aside for flow generation.
    assert_eq!(outcome.recent_screenshots.len(), 5);
}

#[tokio::test(start_paused = true)]
async fn extension_in_a_completing_turn_is_refused() {
    let completing_turn = ModelResponse {
        content: vec![
            ContentBlock::text("Wrapping up. EXPLORATION_COMPLETE"),
            ContentBlock::ToolUse {
                id: "tu_1".into(),
                name: "request_more_steps".into(),
                input: json!({"reason": "just in case", "additional_steps": 5}),
            },
        ],
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage::default(),
    };
    let model = Arc::new(MockModel::new(vec![
        completing_turn,
        done_response(),
        synthesis_response(),
        flows_response(),
    ]));
    let config = SessionConfig::builder(URL)
        .budget(BudgetConfig {
            max_steps: 5,
            hard_cap_steps: 10,
            adaptive_steps: true,
            ..small_budget()
        })
        .build();
    let report = explorer(model, config).run().await.unwrap();

    assert!(report.steps[0].result.contains("no budget extension granted"));
}
