//! Operator hint ingestion.
//!
//! A bounded queue with drop-on-full writes and non-blocking reads. The
//! scheduler drains it between turns; if it ever blocked here, hints
//! could silently consume the exploration deadline.

use tokio::sync::mpsc;
use tracing::debug;

/// Queue capacity. Hints past this are dropped, not queued.
const HINT_CAPACITY: usize = 10;

/// Marker prefixed to every hint before it enters the conversation.
pub const HINT_MARKER: &str = "[Operator hint] ";

/// Producer half: hand this to whatever ingests operator input.
#[derive(Debug, Clone)]
pub struct HintSender {
    tx: mpsc::Sender<String>,
}

impl HintSender {
    /// Post a hint. Returns false when the queue is full or the session
    /// is gone; the hint is dropped either way.
    pub fn post(&self, hint: impl Into<String>) -> bool {
        let accepted = self.tx.try_send(hint.into()).is_ok();
        if !accepted {
            debug!("hint dropped (queue full or session gone)");
        }
        accepted
    }
}

/// Consumer half: owned by the session, drained between turns.
#[derive(Debug)]
pub struct HintSource {
    rx: mpsc::Receiver<String>,
}

impl HintSource {
    /// Take every pending hint without blocking.
    pub fn drain(&mut self) -> Vec<String> {
        let mut hints = Vec::new();
        while let Ok(hint) = self.rx.try_recv() {
            hints.push(hint);
        }
        hints
    }
}

/// Create a connected hint channel.
pub fn hint_channel() -> (HintSender, HintSource) {
    let (tx, rx) = mpsc::channel(HINT_CAPACITY);
    (HintSender { tx }, HintSource { rx })
}
