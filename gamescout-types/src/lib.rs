#![deny(missing_docs)]
//! Protocol types for gamescout.
//!
//! The vocabulary every other crate speaks: conversation content blocks
//! with their exact wire tags, the capability traits the core consumes
//! ([`BrowserPage`], [`ToolUsingModel`], [`ProgressSink`]), the progress
//! event vocabulary, the step log, and the structured analysis and test
//! flow output shapes.

pub mod browser;
pub mod content;
pub mod error;
pub mod events;
pub mod flow;
pub mod id;
pub mod model;
pub mod report;
pub mod step;

pub use browser::{BrowserError, BrowserPage, PageInfo};
pub use content::{
    ContentBlock, ImageSource, Message, ResultItem, Role, ScreenshotHandle, ToolResultContent,
};
pub use error::ExploreError;
pub use events::{ProgressEvent, ProgressSink, StepDetail};
pub use flow::{FlowCommand, TestFlow, SETUP_FLOW_FILE, SETUP_FLOW_NAME};
pub use id::SessionId;
pub use model::{
    ModelError, ModelRequest, ModelResponse, StopReason, TokenUsage, ToolSchema, ToolUsingModel,
};
pub use report::{
    EdgeCase, Finding, GameAnalysis, GameInfo, Mechanic, ModuleConfig, PageMeta, Priority,
    ScenarioStep, ScenarioType, Severity, StepAction, TestScenario, UiElement, UserFlow,
};
pub use step::{DurationMs, StepRecord};
