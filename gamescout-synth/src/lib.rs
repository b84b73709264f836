#![deny(missing_docs)]
//! Post-exploration synthesis for gamescout.
//!
//! Turns an exploration transcript into a structured analysis, and the
//! analysis into runnable test flows. Both phases call the model without
//! tools under an exponential back-off retry, and both survive the
//! model's favorite failure mode: JSON cut off at the token limit.

pub mod flows;
pub mod repair;
pub mod retry;
pub mod synthesizer;

pub use flows::{FlowGenOutput, generate_flows};
pub use repair::repair_truncated_json;
pub use retry::RetryPolicy;
pub use synthesizer::{SynthesisConfig, SynthesisOutput, synthesize};
