#![deny(missing_docs)]
//! Phase checkpoints for gamescout sessions.
//!
//! A checkpoint is a post-phase snapshot written as
//! `checkpoint_<phase>.json` inside a caller-supplied directory. Writes
//! go through a temp file and rename so a crash never leaves a partial
//! checkpoint behind; resume depends on these files parsing.

use chrono::{DateTime, Utc};
use gamescout_types::{GameAnalysis, ModuleConfig, PageMeta};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from checkpoint IO.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum CheckpointError {
    /// A write (or the rename finishing it) failed.
    #[error("checkpoint write failed: {0}")]
    WriteFailed(String),

    /// A read failed for a reason other than the file not existing.
    #[error("checkpoint read failed: {0}")]
    ReadFailed(String),

    /// Serialization or deserialization error.
    #[error("checkpoint serialization error: {0}")]
    Serialization(String),
}

/// Session phases, in completion order.
///
/// `Scouted` means exploration finished; `Analyzed` and `Synthesized`
/// mean a structured analysis exists (the latter on the agent path).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Exploration finished; no structured analysis yet.
    Scouted,
    /// A structured analysis exists.
    Analyzed,
    /// A structured analysis exists, produced by agent-mode synthesis.
    Synthesized,
}

impl Phase {
    /// Wire name of this phase.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Scouted => "scouted",
            Phase::Analyzed => "analyzed",
            Phase::Synthesized => "synthesized",
        }
    }

    /// Whether this phase carries a finished structured analysis.
    pub fn has_analysis(&self) -> bool {
        *self >= Phase::Analyzed
    }

    /// Checkpoint filename for this phase.
    pub fn file_name(&self) -> String {
        format!("checkpoint_{}.json", self.as_str())
    }
}

/// A post-phase snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Which phase completed.
    pub phase: Phase,
    /// Exploration steps used when the snapshot was taken.
    pub step: u64,
    /// Whether the session ran in agent mode.
    pub agent_mode: bool,
    /// Page metadata, passed through opaquely.
    #[serde(default)]
    pub page_meta: PageMeta,
    /// The structured analysis, once one exists.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<GameAnalysis>,
    /// Module configuration the session ran with.
    #[serde(default)]
    pub modules: ModuleConfig,
    /// When the snapshot was written.
    pub timestamp: DateTime<Utc>,
}

/// Reads and writes checkpoints in one directory.
///
/// The store never touches files outside its directory, and never
/// deletes anything.
pub struct CheckpointStore {
    dir: PathBuf,
}

impl CheckpointStore {
    /// Create a store rooted at `dir`. The directory is created lazily
    /// on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory this store writes into.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write a checkpoint atomically. Returns the final path.
    pub async fn write(&self, checkpoint: &Checkpoint) -> Result<PathBuf, CheckpointError> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| CheckpointError::WriteFailed(e.to_string()))?;

        let contents = serde_json::to_string_pretty(checkpoint)
            .map_err(|e| CheckpointError::Serialization(e.to_string()))?;

        let final_path = self.dir.join(checkpoint.phase.file_name());
        let tmp_path = self
            .dir
            .join(format!(".{}.tmp", checkpoint.phase.file_name()));

        tokio::fs::write(&tmp_path, contents)
            .await
            .map_err(|e| CheckpointError::WriteFailed(e.to_string()))?;
        tokio::fs::rename(&tmp_path, &final_path)
            .await
            .map_err(|e| CheckpointError::WriteFailed(e.to_string()))?;

        Ok(final_path)
    }

    /// Read the checkpoint for a phase, if one exists.
    pub async fn read(&self, phase: Phase) -> Result<Option<Checkpoint>, CheckpointError> {
        let path = self.dir.join(phase.file_name());
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let checkpoint: Checkpoint = serde_json::from_str(&contents)
                    .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
                Ok(Some(checkpoint))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CheckpointError::ReadFailed(e.to_string())),
        }
    }

    /// Read the most advanced checkpoint present, if any.
    pub async fn latest(&self) -> Result<Option<Checkpoint>, CheckpointError> {
        for phase in [Phase::Synthesized, Phase::Analyzed, Phase::Scouted] {
            if let Some(checkpoint) = self.read(phase).await? {
                return Ok(Some(checkpoint));
            }
        }
        Ok(None)
    }
}
