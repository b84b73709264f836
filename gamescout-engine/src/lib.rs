#![deny(missing_docs)]
//! The gamescout exploration engine.
//!
//! A long-running, resource-sensitive state machine that drives a real
//! browser with a tool-using model: model call, tool dispatch,
//! screenshot capture, progress streaming, hint injection, adaptive
//! budget extension, checkpointing, all under strict timeout
//! discipline so synthesis always gets to run.
//!
//! [`Explorer`] is the entry point; everything else is the machinery it
//! wires together.

pub mod budget;
pub mod context;
pub mod explorer;
pub mod hints;
pub mod progress;
pub mod prompts;
pub mod scheduler;
pub mod session;

pub use budget::{BudgetConfig, BudgetGovernor, StepAdmission};
pub use context::{EXPLORATION_IMAGE_WINDOW, IMAGE_PRUNED_PLACEHOLDER, count_images, prune_images};
pub use explorer::{ExplorationReport, Explorer, SessionFailure};
pub use hints::{HintSender, HintSource, hint_channel};
pub use progress::ProgressEmitter;
pub use scheduler::{COMPLETION_SENTINEL, ExplorationExit, ExplorationOutcome, StepScheduler};
pub use session::{ModelConfig, SessionConfig, SessionConfigBuilder};

pub use gamescout_state::{Checkpoint, CheckpointStore, Phase};
pub use gamescout_synth::RetryPolicy;
