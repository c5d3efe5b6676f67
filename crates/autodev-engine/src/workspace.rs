//! Per-session filesystem artifact store.
//!
//! All artifact paths are confined to the session root; parent directories
//! are created on demand; text is UTF-8; JSON artifacts are written atomically
//! (temporary sibling + rename) because `tasks.json` is the source of truth
//! for coding progress across process restarts.

use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

use autodev_types::{confine, AutodevError, Result};

/// Well-known artifact names under a session workspace.
pub mod artifacts {
    pub const PRD: &str = "PRD.md";
    pub const PRD_REVIEWS: &str = "PRD_Reviews.md";
    pub const DESIGN: &str = "Design.md";
    pub const TASKS: &str = "tasks.json";
    pub const CODE_DIR: &str = "code";
}

pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create (or reuse) the workspace directory for a session.
    pub async fn create(workspace_root: &Path, session_id: &str) -> Result<Self> {
        let root = workspace_root.join(session_id);
        tokio::fs::create_dir_all(&root).await?;
        Ok(Self { root })
    }

    /// Open an existing workspace at its absolute root (from session state).
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The default generated-code directory, created on demand.
    pub async fn code_dir(&self) -> Result<PathBuf> {
        let dir = self.root.join(artifacts::CODE_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        Ok(dir)
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        confine(&self.root, Path::new(relative))
    }

    pub async fn exists(&self, relative: &str) -> Result<bool> {
        let path = self.resolve(relative)?;
        Ok(tokio::fs::try_exists(&path).await?)
    }

    pub async fn write_text(&self, relative: &str, content: &str) -> Result<PathBuf> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;
        tracing::debug!(path = %path.display(), bytes = content.len(), "Artifact written");
        Ok(path)
    }

    pub async fn read_text(&self, relative: &str) -> Result<String> {
        let path = self.resolve(relative)?;
        Ok(tokio::fs::read_to_string(&path).await?)
    }

    /// Atomic JSON write: serialize, write a temporary sibling, rename.
    pub async fn write_json<T: Serialize>(&self, relative: &str, value: &T) -> Result<PathBuf> {
        let path = self.resolve(relative)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let file_name = path
            .file_name()
            .ok_or_else(|| AutodevError::Confinement(path.clone()))?
            .to_string_lossy()
            .into_owned();
        let tmp = path.with_file_name(format!(".{file_name}.tmp"));
        let json = serde_json::to_string_pretty(value)?;
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(path)
    }

    pub async fn read_json<T: DeserializeOwned>(&self, relative: &str) -> Result<T> {
        let json = self.read_text(relative).await?;
        Ok(serde_json::from_str(&json)?)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
