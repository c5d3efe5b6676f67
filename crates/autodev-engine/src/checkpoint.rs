//! Checkpoint save/restore for session resumability.
//!
//! After each node completion the engine persists a [`Checkpoint`] keyed by
//! session id. Writes are atomic (write to a temporary sibling, then rename)
//! so a crash can never leave a torn record behind. Records carry an explicit
//! version tag; a mismatch refuses to resume rather than guessing.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use autodev_types::{AutodevError, Result, SessionState, Stage};

use crate::node::NodeId;

pub const CHECKPOINT_VERSION: u32 = 1;

// ---------------------------------------------------------------------------
// Checkpoint record
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckpointStatus {
    Running,
    Interrupted,
    Failed,
    Completed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub version: u32,
    pub session_id: String,
    pub status: CheckpointStatus,
    /// The node about to run (or that was running when the run stopped).
    /// `None` once the session completed.
    pub next_node: Option<NodeId>,
    pub state: SessionState,
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    pub fn new(status: CheckpointStatus, next_node: Option<NodeId>, state: SessionState) -> Self {
        Self {
            version: CHECKPOINT_VERSION,
            session_id: state.session_id.clone(),
            status,
            next_node,
            state,
            saved_at: Utc::now(),
        }
    }
}

/// One row of `list-sessions` output.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    pub session_id: String,
    pub stage: Stage,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// CheckpointStore
// ---------------------------------------------------------------------------

pub struct CheckpointStore {
    root: PathBuf,
}

impl CheckpointStore {
    /// A store rooted at `<DATA_ROOT>/checkpoints`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, session_id: &str) -> PathBuf {
        self.root.join(format!("{session_id}.json"))
    }

    /// Atomically persist a checkpoint, creating the store directory if needed.
    pub async fn save(&self, checkpoint: &Checkpoint) -> Result<PathBuf> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(&checkpoint.session_id);
        let tmp = self.root.join(format!(".{}.json.tmp", checkpoint.session_id));
        let json = serde_json::to_string_pretty(checkpoint)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        tracing::debug!(path = %path.display(), status = ?checkpoint.status, "Checkpoint saved");
        Ok(path)
    }

    /// Load a session's checkpoint. Missing sessions and incompatible or
    /// corrupt records refuse to resume.
    pub async fn load(&self, session_id: &str) -> Result<Checkpoint> {
        let path = self.path_for(session_id);
        if !tokio::fs::try_exists(&path).await? {
            return Err(AutodevError::UnknownSession(session_id.to_string()));
        }
        let json = tokio::fs::read_to_string(&path).await?;
        let checkpoint: Checkpoint = serde_json::from_str(&json).map_err(|e| {
            AutodevError::State(format!("Checkpoint for '{session_id}' is unreadable: {e}"))
        })?;
        if checkpoint.version != CHECKPOINT_VERSION {
            return Err(AutodevError::State(format!(
                "Checkpoint for '{session_id}' has schema version {} (expected {})",
                checkpoint.version, CHECKPOINT_VERSION
            )));
        }
        Ok(checkpoint)
    }

    /// Summaries of every stored session, sorted by session id.
    pub async fn list(&self) -> Result<Vec<SessionSummary>> {
        if !tokio::fs::try_exists(&self.root).await? {
            return Ok(Vec::new());
        }
        let mut summaries = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.root).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let json = tokio::fs::read_to_string(&path).await?;
            match serde_json::from_str::<Checkpoint>(&json) {
                Ok(cp) => summaries.push(SessionSummary {
                    session_id: cp.session_id,
                    stage: cp.state.stage,
                    created_at: cp.state.created_at,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable checkpoint");
                }
            }
        }
        summaries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        Ok(summaries)
    }

    pub async fn delete(&self, session_id: &str) -> Result<()> {
        let path = self.path_for(session_id);
        if tokio::fs::try_exists(&path).await? {
            tokio::fs::remove_file(&path).await?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
