//! The session orchestrator.
//!
//! Runs the phases in order (resume check, exploration, synthesis,
//! flow generation), writing a checkpoint after each phase that
//! completes. Errors carry whatever partial artefacts exist; the caller
//! decides whether to persist them.

use crate::budget::BudgetGovernor;
use crate::context::prune_images;
use crate::progress::ProgressEmitter;
use crate::prompts;
use crate::scheduler::{ExplorationExit, StepScheduler};
use crate::session::SessionConfig;
use crate::hints::HintSource;
use chrono::Utc;
use gamescout_state::{Checkpoint, CheckpointStore, Phase};
use gamescout_synth::flows::FlowGenConfig;
use gamescout_synth::synthesizer::SynthesisConfig;
use gamescout_synth::{generate_flows, synthesize};
use gamescout_tools::{ToolDispatcher, tool_schemas};
use gamescout_types::{
    BrowserPage, DurationMs, ExploreError, GameAnalysis, Message, ProgressEvent, ProgressSink,
    ScreenshotHandle, SessionId, StepRecord, TestFlow, TokenUsage, ToolUsingModel,
};
use std::fmt;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Everything a finished (or failed) session produced.
#[derive(Debug)]
pub struct ExplorationReport {
    /// Session identity.
    pub session_id: SessionId,
    /// Why exploration ended.
    pub exit: ExplorationExit,
    /// The structured analysis, once synthesis succeeded (or was
    /// restored from a checkpoint).
    pub analysis: Option<GameAnalysis>,
    /// Generated test flows; the first is the shared setup.
    pub flows: Vec<TestFlow>,
    /// The step log.
    pub steps: Vec<StepRecord>,
    /// Token usage across every model call in the session.
    pub usage: TokenUsage,
    /// Exploration steps used.
    pub steps_used: u32,
    /// Session wall-clock.
    pub duration_ms: DurationMs,
}

/// A failed session: the error plus the partial report gathered before
/// the failure.
#[derive(Debug)]
pub struct SessionFailure {
    /// What went wrong.
    pub error: ExploreError,
    /// Partial artefacts, for the caller to persist or discard.
    pub partial: Box<ExplorationReport>,
}

impl fmt::Display for SessionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)
    }
}

impl std::error::Error for SessionFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

/// One exploration session, from browser to report.
pub struct Explorer {
    model: Arc<dyn ToolUsingModel>,
    page: Arc<dyn BrowserPage>,
    config: SessionConfig,
    sink: Option<Arc<dyn ProgressSink>>,
    hints: Option<HintSource>,
    cancel: CancellationToken,
    stop: CancellationToken,
}

impl Explorer {
    /// Create a session over the given capabilities.
    pub fn new(
        model: Arc<dyn ToolUsingModel>,
        page: Arc<dyn BrowserPage>,
        config: SessionConfig,
    ) -> Self {
        Self {
            model,
            page,
            config,
            sink: None,
            hints: None,
            cancel: CancellationToken::new(),
            stop: CancellationToken::new(),
        }
    }

    /// Attach a progress sink.
    #[must_use]
    pub fn with_progress(mut self, sink: Arc<dyn ProgressSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Attach an operator hint source.
    #[must_use]
    pub fn with_hints(mut self, hints: HintSource) -> Self {
        self.hints = Some(hints);
        self
    }

    /// Token that aborts the session outright. The session fails with
    /// [`ExploreError::Cancelled`], returning partial artefacts.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Token that stops admitting exploration steps. Synthesis and flow
    /// generation still run over whatever was gathered.
    pub fn stop_token(&self) -> CancellationToken {
        self.stop.clone()
    }

    /// Run the session to completion.
    ///
    /// # Errors
    ///
    /// Every failure carries the partial report; see [`SessionFailure`].
    pub async fn run(mut self) -> Result<ExplorationReport, SessionFailure> {
        let emitter = ProgressEmitter::new(self.sink.clone());
        let mut governor = BudgetGovernor::new(&self.config.budget);

        let mut report = ExplorationReport {
            session_id: self.config.session_id.clone(),
            exit: ExplorationExit::Completed,
            analysis: None,
            flows: Vec::new(),
            steps: Vec::new(),
            usage: TokenUsage::default(),
            steps_used: 0,
            duration_ms: DurationMs::default(),
        };

        if !self.model.supports_tool_use() {
            return Err(fail(
                report,
                ExploreError::Config(
                    "the configured model cannot emit tool_use blocks; agent exploration \
                     requires a tool-using model"
                        .into(),
                ),
                &governor,
            ));
        }

        let store = self.config.checkpoint_dir.clone().map(CheckpointStore::new);

        // Resume: a checkpoint at analyzed or later carries the finished
        // analysis, so exploration and synthesis are skipped entirely.
        let resumed = self
            .config
            .resume
            .as_ref()
            .filter(|cp| cp.phase.has_analysis())
            .and_then(|cp| cp.analysis.clone().map(|a| (a, cp.step)));

        let (analysis, recent_screenshots) = match resumed {
            Some((analysis, step)) => {
                info!(step, "resuming past synthesis from checkpoint");
                report.steps_used = step as u32;
                (analysis, Vec::new())
            }
            None => {
                let (analysis, screenshots) =
                    match self.explore_and_synthesize(&emitter, &mut governor, &store, &mut report).await {
                        Ok(result) => result,
                        Err(error) => return Err(fail(report, error, &governor)),
                    };
                (analysis, screenshots)
            }
        };
        report.analysis = Some(analysis.clone());

        emitter.emit(ProgressEvent::Flows);
        let flow_config = FlowGenConfig {
            model: self.config.model.model.clone(),
            max_tokens: Some(self.config.model.max_tokens),
            temperature: self.config.model.temperature,
            retry: Default::default(),
        };
        let flow_result = tokio::select! {
            _ = self.cancel.cancelled() => Err(ExploreError::Cancelled),
            result = generate_flows(
                self.model.as_ref(),
                &analysis,
                &self.config.url,
                self.config.page_meta.framework.as_deref(),
                &recent_screenshots,
                &flow_config,
                |attempt| emitter.emit(ProgressEvent::FlowsRetry { attempt }),
            ) => result,
        };
        match flow_result {
            Ok(output) => {
                report.usage.add(output.usage);
                emitter.emit(ProgressEvent::FlowsDone {
                    count: output.flows.len(),
                });
                report.flows = output.flows;
            }
            Err(error) => return Err(fail(report, error, &governor)),
        }

        report.duration_ms = DurationMs::from(governor.elapsed());
        Ok(report)
    }

    /// The non-resumed path: run the loop, then synthesis, writing the
    /// `scouted` and `synthesized` checkpoints along the way.
    async fn explore_and_synthesize(
        &mut self,
        emitter: &ProgressEmitter,
        governor: &mut BudgetGovernor,
        store: &Option<CheckpointStore>,
        report: &mut ExplorationReport,
    ) -> Result<(GameAnalysis, Vec<ScreenshotHandle>), ExploreError> {
        emitter.emit(ProgressEvent::AgentStart {
            url: self.config.url.clone(),
        });

        let mut dispatcher = ToolDispatcher::new(self.page.clone());
        let mut scheduler = StepScheduler {
            model: self.model.as_ref(),
            dispatcher: &mut dispatcher,
            governor: &mut *governor,
            emitter,
            hints: self.hints.as_mut(),
            cancel: &self.cancel,
            stop: &self.stop,
            system_prompt: prompts::exploration_system_prompt(self.config.budget.max_steps),
            tools: tool_schemas(
                self.config.budget.adaptive_steps,
                self.config.budget.adaptive_time,
            ),
            model_id: self.config.model.model.clone(),
            max_tokens: self.config.model.max_tokens,
            temperature: self.config.model.temperature,
            screenshot_dir: self.config.screenshot_dir.clone(),
        };
        let initial = vec![Message::user_text(prompts::initial_user_message(
            &self.config.url,
            &self.config.page_meta,
        ))];
        let outcome = scheduler.run(initial).await;

        report.exit = outcome.exit;
        report.steps = outcome.steps;
        report.usage.add(outcome.usage);
        report.steps_used = governor.steps_used();
        emitter.emit(ProgressEvent::AgentDone {
            steps: u64::from(governor.steps_used()),
        });

        if outcome.exit == ExplorationExit::Cancelled {
            return Err(ExploreError::Cancelled);
        }
        if let Some(err) = outcome.error {
            return Err(err.into());
        }

        if let Some(store) = store {
            self.write_checkpoint(store, Phase::Scouted, governor.steps_used(), None)
                .await;
        }

        let mut conversation = outcome.conversation;
        // Synthesis must not carry image weight; the model already saw them.
        prune_images(&mut conversation, 0);
        emitter.emit(ProgressEvent::AgentSynthesize);

        let synthesis_config = SynthesisConfig {
            model: self.config.model.model.clone(),
            max_tokens: Some(self.config.model.max_tokens),
            temperature: self.config.model.temperature,
            modules: self.config.modules,
            retry: Default::default(),
        };
        let deadline = governor.synthesis_deadline();
        let synthesis_result = tokio::select! {
            _ = self.cancel.cancelled() => Err(ExploreError::Cancelled),
            result = synthesize(
                self.model.as_ref(),
                conversation,
                &synthesis_config,
                deadline,
                |attempt| emitter.emit(ProgressEvent::SynthesisRetry { attempt }),
            ) => result,
        };
        let output = synthesis_result?;
        report.usage.add(output.usage);

        if let Some(store) = store {
            self.write_checkpoint(
                store,
                Phase::Synthesized,
                governor.steps_used(),
                Some(&output.analysis),
            )
            .await;
        }

        Ok((output.analysis, outcome.recent_screenshots))
    }

    /// Checkpoint writes are best-effort: a failure costs resumability,
    /// not the session.
    async fn write_checkpoint(
        &self,
        store: &CheckpointStore,
        phase: Phase,
        step: u32,
        analysis: Option<&GameAnalysis>,
    ) {
        let checkpoint = Checkpoint {
            phase,
            step: u64::from(step),
            agent_mode: true,
            page_meta: self.config.page_meta.clone(),
            analysis: analysis.cloned(),
            modules: self.config.modules,
            timestamp: Utc::now(),
        };
        match store.write(&checkpoint).await {
            Ok(path) => info!(phase = phase.as_str(), path = %path.display(), "checkpoint written"),
            Err(error) => warn!(phase = phase.as_str(), %error, "checkpoint write failed"),
        }
    }
}

fn fail(
    mut report: ExplorationReport,
    error: ExploreError,
    governor: &BudgetGovernor,
) -> SessionFailure {
    report.duration_ms = DurationMs::from(governor.elapsed());
    SessionFailure {
        error,
        partial: Box::new(report),
    }
}
