//! The browser capability the core drives.
//!
//! The concrete automation driver lives outside the core. Everything the
//! exploration loop needs from it is behind [`BrowserPage`]: blocking
//! operations with caller-imposed deadlines, no session lifecycle.

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors from browser operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum BrowserError {
    /// An input or navigation action failed.
    #[error("{action} failed: {message}")]
    ActionFailed {
        /// The action that failed (`click`, `navigate`, ...).
        action: String,
        /// Driver-reported detail.
        message: String,
    },

    /// Script evaluation failed in the page.
    #[error("evaluation failed: {0}")]
    Evaluation(String),

    /// A wait condition was not met within its deadline.
    #[error("wait timed out: {0}")]
    WaitTimeout(String),

    /// The page or browser session is gone.
    #[error("page unavailable: {0}")]
    PageGone(String),

    /// Catch-all for driver-specific errors.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl BrowserError {
    /// Shorthand for an [`BrowserError::ActionFailed`].
    pub fn action(action: impl Into<String>, message: impl Into<String>) -> Self {
        BrowserError::ActionFailed {
            action: action.into(),
            message: message.into(),
        }
    }
}

/// A snapshot of basic page state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageInfo {
    /// Document title.
    pub title: String,
    /// Current URL.
    pub url: String,
    /// Visible text content, as extracted by the driver.
    pub visible_text: String,
}

/// The browser page capability.
///
/// Implementations wrap a real automation driver. All operations target
/// the one shared page; callers serialize access. A screenshot call may
/// be abandoned mid-flight by the capture race, so implementations must
/// tolerate a capture that keeps running after its result is discarded.
#[async_trait]
pub trait BrowserPage: Send + Sync {
    /// Capture the current frame as encoded image bytes (JPEG unless
    /// the driver says otherwise).
    async fn capture_screenshot(&self) -> Result<Vec<u8>, BrowserError>;

    /// Click at viewport coordinates.
    async fn click(&self, x: i64, y: i64) -> Result<(), BrowserError>;

    /// Type text into the focused element.
    async fn type_text(&self, text: &str) -> Result<(), BrowserError>;

    /// Scroll by pixel deltas.
    async fn scroll_by(&self, dx: i64, dy: i64) -> Result<(), BrowserError>;

    /// Evaluate a JavaScript expression; returns the stringified result.
    async fn evaluate(&self, expression: &str) -> Result<String, BrowserError>;

    /// Wait until the selector is visible, up to `timeout`.
    async fn wait_for_visible(&self, selector: &str, timeout: Duration)
    -> Result<(), BrowserError>;

    /// Read title, URL, and visible text.
    async fn page_info(&self) -> Result<PageInfo, BrowserError>;

    /// Read recent console output lines.
    async fn console_lines(&self) -> Result<Vec<String>, BrowserError>;

    /// Navigate the page to a URL.
    async fn navigate(&self, url: &str) -> Result<(), BrowserError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn browser_error_display() {
        assert_eq!(
            BrowserError::action("click", "no hit target").to_string(),
            "click failed: no hit target"
        );
        assert_eq!(
            BrowserError::WaitTimeout("#start".into()).to_string(),
            "wait timed out: #start"
        );
    }

    #[test]
    fn browser_page_is_object_safe() {
        fn _assert<T: Send + Sync + ?Sized>() {}
        _assert::<dyn BrowserPage>();
    }
}
