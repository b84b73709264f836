//! Tool dispatch: validate, execute, normalize.

use crate::capture::{AUTO_CAPTURE_TIMEOUT, TOOL_CAPTURE_TIMEOUT, capture_screenshot};
use crate::catalogue::names;
use crate::repetition::ClickTracker;
use gamescout_types::{BrowserPage, ScreenshotHandle};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Settle delay after a click before anything else happens.
const CLICK_SETTLE: Duration = Duration::from_millis(150);

/// Longest sleep the `wait` tool accepts.
const MAX_WAIT: Duration = Duration::from_millis(10_000);

/// How long the `wait` tool polls for selector visibility.
const SELECTOR_WAIT: Duration = Duration::from_secs(5);

/// Character cap on stringified `evaluate_js` results.
const EVAL_RESULT_CAP: usize = 2000;

/// Character cap on visible text returned by `get_page_info`.
const PAGE_TEXT_CAP: usize = 2000;

/// Console lines returned by `console_logs`.
const CONSOLE_TAIL: usize = 50;

/// Normalized result of one tool call.
#[derive(Debug)]
pub struct ToolOutcome {
    /// Textual result summary.
    pub text: String,
    /// Screenshot captured alongside the result, if any.
    pub screenshot: Option<ScreenshotHandle>,
    /// Failure message; `Some` marks the tool result as an error.
    pub error: Option<String>,
}

impl ToolOutcome {
    fn ok(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            screenshot: None,
            error: None,
        }
    }

    fn with_screenshot(text: impl Into<String>, screenshot: Option<ScreenshotHandle>) -> Self {
        Self {
            text: text.into(),
            screenshot,
            error: None,
        }
    }

    fn err(message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            text: message.clone(),
            screenshot: None,
            error: Some(message),
        }
    }

    /// Whether this outcome represents a failed call.
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// Validates and executes browser tool calls.
///
/// Every failure mode becomes an error [`ToolOutcome`]; dispatch itself
/// is infallible. The browser is a single serialized resource, so the
/// dispatcher takes `&mut self` and calls never overlap.
pub struct ToolDispatcher {
    page: Arc<dyn BrowserPage>,
    clicks: ClickTracker,
    auto_timeout: Duration,
    tool_timeout: Duration,
}

impl ToolDispatcher {
    /// Create a dispatcher over a browser page.
    pub fn new(page: Arc<dyn BrowserPage>) -> Self {
        Self {
            page,
            clicks: ClickTracker::new(),
            auto_timeout: AUTO_CAPTURE_TIMEOUT,
            tool_timeout: TOOL_CAPTURE_TIMEOUT,
        }
    }

    /// Override the capture timeouts. Test hook.
    pub fn with_capture_timeouts(mut self, auto: Duration, tool: Duration) -> Self {
        self.auto_timeout = auto;
        self.tool_timeout = tool;
        self
    }

    /// Execute one tool call.
    pub async fn dispatch(&mut self, name: &str, input: &Value) -> ToolOutcome {
        debug!(tool = name, "dispatching tool call");
        match name {
            names::SCREENSHOT => self.screenshot().await,
            names::CLICK => self.click(input).await,
            names::TYPE_TEXT => self.type_text(input).await,
            names::SCROLL => self.scroll(input).await,
            names::EVALUATE_JS => self.evaluate_js(input).await,
            names::WAIT => self.wait(input).await,
            names::GET_PAGE_INFO => self.get_page_info().await,
            names::CONSOLE_LOGS => self.console_logs().await,
            names::NAVIGATE => self.navigate(input).await,
            other => ToolOutcome::err(format!("unknown tool: {other}")),
        }
    }

    async fn screenshot(&self) -> ToolOutcome {
        let capture = capture_screenshot(&self.page, self.tool_timeout).await;
        if capture.timed_out {
            // Not an error: the model simply continues without an image.
            return ToolOutcome::ok("Screenshot timed out");
        }
        if let Some(message) = capture.error {
            return ToolOutcome::err(format!("screenshot failed: {message}"));
        }
        ToolOutcome::with_screenshot("Screenshot captured", capture.handle)
    }

    async fn click(&mut self, input: &Value) -> ToolOutcome {
        let x = match require_i64(input, "x") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::err(e),
        };
        let y = match require_i64(input, "y") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::err(e),
        };

        if let Err(err) = self.page.click(x, y).await {
            return ToolOutcome::err(err.to_string());
        }
        tokio::time::sleep(CLICK_SETTLE).await;

        let mut text = format!("Clicked at ({x}, {y})");
        if let Some(warning) = self.clicks.record(x, y) {
            text.push_str("\n\n");
            text.push_str(&warning);
        }

        let screenshot = self.auto_capture().await;
        ToolOutcome::with_screenshot(text, screenshot)
    }

    async fn type_text(&mut self, input: &Value) -> ToolOutcome {
        let text = match require_str(input, "text") {
            Ok(v) => v.to_string(),
            Err(e) => return ToolOutcome::err(e),
        };

        let at = match (optional_i64(input, "x"), optional_i64(input, "y")) {
            (Ok(Some(x)), Ok(Some(y))) => Some((x, y)),
            (Ok(None), Ok(None)) => None,
            (Ok(_), Ok(_)) => {
                return ToolOutcome::err("type_text needs both x and y, or neither");
            }
            (Err(e), _) | (_, Err(e)) => return ToolOutcome::err(e),
        };

        if let Some((x, y)) = at {
            if let Err(err) = self.page.click(x, y).await {
                return ToolOutcome::err(err.to_string());
            }
            tokio::time::sleep(CLICK_SETTLE).await;
        }
        if let Err(err) = self.page.type_text(&text).await {
            return ToolOutcome::err(err.to_string());
        }

        let summary = match at {
            Some((x, y)) => format!("Typed {text:?} at ({x}, {y})"),
            None => format!("Typed {text:?}"),
        };
        let screenshot = self.auto_capture().await;
        ToolOutcome::with_screenshot(summary, screenshot)
    }

    async fn scroll(&self, input: &Value) -> ToolOutcome {
        let direction = match require_str(input, "direction") {
            Ok(v) => v.to_string(),
            Err(e) => return ToolOutcome::err(e),
        };
        let amount = match optional_i64(input, "amount") {
            Ok(v) => v.unwrap_or(300),
            Err(e) => return ToolOutcome::err(e),
        };
        if amount <= 0 {
            return ToolOutcome::err("scroll amount must be positive");
        }

        let (dx, dy) = match direction.as_str() {
            "up" => (0, -amount),
            "down" => (0, amount),
            "left" => (-amount, 0),
            "right" => (amount, 0),
            other => {
                return ToolOutcome::err(format!(
                    "invalid direction {other:?}: expected up, down, left, or right"
                ));
            }
        };

        if let Err(err) = self.page.scroll_by(dx, dy).await {
            return ToolOutcome::err(err.to_string());
        }
        let screenshot = self.auto_capture().await;
        ToolOutcome::with_screenshot(format!("Scrolled {direction} by {amount}"), screenshot)
    }

    async fn evaluate_js(&self, input: &Value) -> ToolOutcome {
        let expression = match require_str(input, "expression") {
            Ok(v) => v,
            Err(e) => return ToolOutcome::err(e),
        };
        match self.page.evaluate(expression).await {
            Ok(result) => ToolOutcome::ok(truncate(&result, EVAL_RESULT_CAP)),
            Err(err) => ToolOutcome::err(err.to_string()),
        }
    }

    async fn wait(&self, input: &Value) -> ToolOutcome {
        if let Ok(Some(ms)) = optional_i64(input, "milliseconds") {
            if ms < 0 {
                return ToolOutcome::err("milliseconds must be non-negative");
            }
            let wait = Duration::from_millis(ms as u64).min(MAX_WAIT);
            tokio::time::sleep(wait).await;
            return ToolOutcome::ok(format!("Waited {} ms", wait.as_millis()));
        }

        if let Some(selector) = input.get("selector").and_then(Value::as_str) {
            return match self.page.wait_for_visible(selector, SELECTOR_WAIT).await {
                Ok(()) => ToolOutcome::ok(format!("Element {selector:?} is visible")),
                Err(gamescout_types::BrowserError::WaitTimeout(_)) => ToolOutcome::ok(format!(
                    "Timed out waiting for {selector:?} to become visible"
                )),
                Err(err) => ToolOutcome::err(err.to_string()),
            };
        }

        ToolOutcome::err("wait needs either milliseconds or selector")
    }

    async fn get_page_info(&self) -> ToolOutcome {
        match self.page.page_info().await {
            Ok(info) => ToolOutcome::ok(format!(
                "Title: {}\nURL: {}\n\n{}",
                info.title,
                info.url,
                truncate(&info.visible_text, PAGE_TEXT_CAP)
            )),
            Err(err) => ToolOutcome::err(err.to_string()),
        }
    }

    async fn console_logs(&self) -> ToolOutcome {
        match self.page.console_lines().await {
            Ok(lines) if lines.is_empty() => ToolOutcome::ok("(no console output)"),
            Ok(lines) => {
                let start = lines.len().saturating_sub(CONSOLE_TAIL);
                ToolOutcome::ok(lines[start..].join("\n"))
            }
            Err(err) => ToolOutcome::err(err.to_string()),
        }
    }

    async fn navigate(&self, input: &Value) -> ToolOutcome {
        let url = match require_str(input, "url") {
            Ok(v) => v.to_string(),
            Err(e) => return ToolOutcome::err(e),
        };
        if let Err(err) = self.page.navigate(&url).await {
            return ToolOutcome::err(err.to_string());
        }
        let screenshot = self.auto_capture().await;
        ToolOutcome::with_screenshot(format!("Navigated to {url}"), screenshot)
    }

    /// Post-action capture. Timeouts and driver errors are absorbed:
    /// the result simply carries no image.
    async fn auto_capture(&self) -> Option<ScreenshotHandle> {
        let capture = capture_screenshot(&self.page, self.auto_timeout).await;
        if let Some(message) = &capture.error {
            warn!(%message, "post-action screenshot failed");
        }
        capture.handle
    }
}

fn require_i64(input: &Value, key: &str) -> Result<i64, String> {
    match input.get(key) {
        Some(value) => value
            .as_i64()
            .ok_or_else(|| format!("{key} must be an integer, got: {value}")),
        None => Err(format!("missing required parameter: {key}")),
    }
}

fn optional_i64(input: &Value, key: &str) -> Result<Option<i64>, String> {
    match input.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| format!("{key} must be an integer, got: {value}")),
    }
}

fn require_str<'a>(input: &'a Value, key: &str) -> Result<&'a str, String> {
    match input.get(key) {
        Some(value) => value
            .as_str()
            .ok_or_else(|| format!("{key} must be a string, got: {value}")),
        None => Err(format!("missing required parameter: {key}")),
    }
}

fn truncate(s: &str, cap: usize) -> String {
    if s.len() <= cap {
        return s.to_string();
    }
    let mut end = cap;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}... (truncated)", &s[..end])
}
