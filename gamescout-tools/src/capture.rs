//! Screenshot capture with a bounded race and a single retry.
//!
//! Complex WebGL pages can stall a capture arbitrarily long. Each
//! attempt races the driver against a deadline; a timed-out attempt is
//! abandoned (the driver-side work may keep running) and retried once.
//! Two timeouts apply: automatic post-action captures get the short one,
//! the explicit screenshot tool gets the long one.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use gamescout_types::{BrowserPage, ScreenshotHandle};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// Timeout for automatic post-action captures.
pub const AUTO_CAPTURE_TIMEOUT: Duration = Duration::from_secs(20);

/// Timeout for the explicit `screenshot` tool.
pub const TOOL_CAPTURE_TIMEOUT: Duration = Duration::from_secs(30);

/// Outcome of a capture attempt pair.
///
/// `timed_out` without a handle is not an error: the step simply
/// proceeds without an image.
#[derive(Debug)]
pub struct Capture {
    /// The captured screenshot, if any.
    pub handle: Option<ScreenshotHandle>,
    /// Whether both attempts hit the deadline.
    pub timed_out: bool,
    /// Driver-reported failure, if the capture errored outright.
    pub error: Option<String>,
}

/// Capture the current frame, racing the driver against `timeout`.
///
/// On timeout the in-flight attempt is abandoned and exactly one retry
/// runs under the same deadline. A driver error is returned immediately
/// without retrying; retries only absorb stalls.
pub async fn capture_screenshot(page: &Arc<dyn BrowserPage>, timeout: Duration) -> Capture {
    for attempt in 1u32..=2 {
        let worker = tokio::spawn({
            let page = Arc::clone(page);
            async move { page.capture_screenshot().await }
        });

        match tokio::time::timeout(timeout, worker).await {
            Ok(Ok(Ok(bytes))) => {
                return Capture {
                    handle: Some(ScreenshotHandle::new("image/jpeg", STANDARD.encode(bytes))),
                    timed_out: false,
                    error: None,
                };
            }
            Ok(Ok(Err(err))) => {
                return Capture {
                    handle: None,
                    timed_out: false,
                    error: Some(err.to_string()),
                };
            }
            Ok(Err(join_err)) => {
                return Capture {
                    handle: None,
                    timed_out: false,
                    error: Some(format!("capture worker failed: {join_err}")),
                };
            }
            // Deadline fired first. Dropping the join handle detaches the
            // worker; the driver must tolerate the abandoned capture.
            Err(_) => {
                warn!(attempt, timeout_ms = timeout.as_millis() as u64, "screenshot capture timed out");
            }
        }
    }

    Capture {
        handle: None,
        timed_out: true,
        error: None,
    }
}
