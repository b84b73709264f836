#![deny(missing_docs)]
//! Browser tool catalogue and dispatcher for gamescout.
//!
//! The dispatcher validates each tool call against its schema and
//! executes it against a [`BrowserPage`](gamescout_types::BrowserPage).
//! Invalid input and failed actions become error tool outcomes; the
//! dispatcher itself never fails, so one bad call never ends a session.

pub mod capture;
pub mod catalogue;
pub mod dispatch;
pub mod repetition;

pub use capture::{AUTO_CAPTURE_TIMEOUT, Capture, TOOL_CAPTURE_TIMEOUT, capture_screenshot};
pub use catalogue::{names, tool_schemas};
pub use dispatch::{ToolDispatcher, ToolOutcome};
pub use repetition::ClickTracker;
