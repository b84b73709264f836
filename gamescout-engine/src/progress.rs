//! Progress event fan-out.

use gamescout_types::{ProgressEvent, ProgressSink};
use std::sync::Arc;
use tracing::warn;

/// Emits typed progress events to an optional sink.
///
/// Emission is synchronous on the calling thread of control; the core
/// never spawns for it. A failing sink is logged and otherwise ignored;
/// observers never get to fail the session.
#[derive(Clone)]
pub struct ProgressEmitter {
    sink: Option<Arc<dyn ProgressSink>>,
}

impl ProgressEmitter {
    /// Create an emitter. `None` makes every emit a no-op.
    pub fn new(sink: Option<Arc<dyn ProgressSink>>) -> Self {
        Self { sink }
    }

    /// Emit one event.
    pub fn emit(&self, event: ProgressEvent) {
        let Some(sink) = &self.sink else {
            return;
        };
        if let Err(error) = sink.emit(event.kind(), &event.payload()) {
            warn!(kind = event.kind(), %error, "progress sink failed; event dropped");
        }
    }
}
