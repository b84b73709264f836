//! Session configuration.

use crate::budget::BudgetConfig;
use gamescout_state::Checkpoint;
use gamescout_types::{ModuleConfig, PageMeta, SessionId};
use std::path::PathBuf;

/// Model parameters for a session.
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Model id (None = provider default).
    pub model: Option<String>,
    /// Max output tokens per call. Synthesis raises this to its floor.
    pub max_tokens: u32,
    /// Sampling temperature.
    pub temperature: Option<f64>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: None,
            max_tokens: 4096,
            temperature: None,
        }
    }
}

/// Everything a session needs, fixed at creation.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Identity token for this session.
    pub session_id: SessionId,
    /// Target URL.
    pub url: String,
    /// Page metadata captured by the caller.
    pub page_meta: PageMeta,
    /// Model parameters.
    pub model: ModelConfig,
    /// Budget parameters.
    pub budget: BudgetConfig,
    /// Optional review modules.
    pub modules: ModuleConfig,
    /// Where screenshots are persisted; None keeps them in memory only.
    pub screenshot_dir: Option<PathBuf>,
    /// Where checkpoints are written; None disables checkpointing.
    pub checkpoint_dir: Option<PathBuf>,
    /// A snapshot to resume from; completed phases are skipped.
    pub resume: Option<Checkpoint>,
}

impl SessionConfig {
    /// Start building a config for a target URL.
    #[must_use]
    pub fn builder(url: impl Into<String>) -> SessionConfigBuilder {
        SessionConfigBuilder {
            config: SessionConfig {
                session_id: SessionId::new("session"),
                url: url.into(),
                page_meta: PageMeta::default(),
                model: ModelConfig::default(),
                budget: BudgetConfig::default(),
                modules: ModuleConfig::default(),
                screenshot_dir: None,
                checkpoint_dir: None,
                resume: None,
            },
        }
    }
}

/// Builder for [`SessionConfig`]. Only the URL is required.
pub struct SessionConfigBuilder {
    config: SessionConfig,
}

impl SessionConfigBuilder {
    /// Set the session id.
    #[must_use]
    pub fn session_id(mut self, id: impl Into<SessionId>) -> Self {
        self.config.session_id = id.into();
        self
    }

    /// Set the page metadata.
    #[must_use]
    pub fn page_meta(mut self, meta: PageMeta) -> Self {
        self.config.page_meta = meta;
        self
    }

    /// Set the model parameters.
    #[must_use]
    pub fn model(mut self, model: ModelConfig) -> Self {
        self.config.model = model;
        self
    }

    /// Set the budget parameters.
    #[must_use]
    pub fn budget(mut self, budget: BudgetConfig) -> Self {
        self.config.budget = budget;
        self
    }

    /// Enable optional review modules.
    #[must_use]
    pub fn modules(mut self, modules: ModuleConfig) -> Self {
        self.config.modules = modules;
        self
    }

    /// Persist screenshots into this directory.
    #[must_use]
    pub fn screenshot_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.screenshot_dir = Some(dir.into());
        self
    }

    /// Write phase checkpoints into this directory.
    #[must_use]
    pub fn checkpoint_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.checkpoint_dir = Some(dir.into());
        self
    }

    /// Resume from a checkpoint; phases it covers are skipped.
    #[must_use]
    pub fn resume(mut self, checkpoint: Checkpoint) -> Self {
        self.config.resume = Some(checkpoint);
        self
    }

    /// Finish building.
    #[must_use]
    pub fn build(self) -> SessionConfig {
        self.config
    }
}
