//! Environment-driven configuration.
//!
//! Every knob has a default so `from_env` never fails; `validate` enforces the
//! settings that must be present before any node runs.

use std::path::PathBuf;
use std::time::Duration;

use autodev_types::{AutodevError, Result};
use autodev_worker::ValidationMode;

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_MAX_CODING_ITERATIONS: u32 = 50;
pub const DEFAULT_WORKER_TIMEOUT_SECS: u64 = 300;

#[derive(Debug, Clone)]
pub struct Settings {
    pub anthropic_api_key: String,
    pub anthropic_base_url: Option<String>,
    pub default_model: String,
    pub pm_model: String,
    pub architect_model: String,
    pub coder_model: String,
    pub workspace_root: PathBuf,
    pub data_root: PathBuf,
    pub max_coding_iterations: u32,
    pub human_in_loop: bool,
    pub worker_timeout: Duration,
    pub validation_mode: ValidationMode,
    pub log_level: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            anthropic_api_key: String::new(),
            anthropic_base_url: None,
            default_model: DEFAULT_MODEL.to_string(),
            pm_model: DEFAULT_MODEL.to_string(),
            architect_model: DEFAULT_MODEL.to_string(),
            coder_model: DEFAULT_MODEL.to_string(),
            workspace_root: PathBuf::from("workspace"),
            data_root: PathBuf::from("data"),
            max_coding_iterations: DEFAULT_MAX_CODING_ITERATIONS,
            human_in_loop: false,
            worker_timeout: Duration::from_secs(DEFAULT_WORKER_TIMEOUT_SECS),
            validation_mode: ValidationMode::Lenient,
            log_level: "info".to_string(),
        }
    }
}

impl Settings {
    /// Read settings from the environment, falling back to defaults and
    /// logging a warning for values that fail to parse.
    pub fn from_env() -> Self {
        let mut settings = Self::default();

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            settings.anthropic_api_key = key;
        }
        if let Ok(url) = std::env::var("ANTHROPIC_BASE_URL") {
            settings.anthropic_base_url = Some(url);
        }
        if let Ok(model) = std::env::var("DEFAULT_MODEL") {
            settings.default_model = model.clone();
            settings.pm_model = model.clone();
            settings.architect_model = model.clone();
            settings.coder_model = model;
        }
        if let Ok(model) = std::env::var("PM_MODEL") {
            settings.pm_model = model;
        }
        if let Ok(model) = std::env::var("ARCHITECT_MODEL") {
            settings.architect_model = model;
        }
        if let Ok(model) = std::env::var("CODER_MODEL") {
            settings.coder_model = model;
        }
        if let Ok(root) = std::env::var("WORKSPACE_ROOT") {
            settings.workspace_root = PathBuf::from(root);
        }
        if let Ok(root) = std::env::var("DATA_ROOT") {
            settings.data_root = PathBuf::from(root);
        }
        if let Ok(raw) = std::env::var("MAX_CODING_ITERATIONS") {
            match raw.parse::<u32>() {
                Ok(n) if n > 0 => settings.max_coding_iterations = n,
                _ => tracing::warn!(value = %raw, "Invalid MAX_CODING_ITERATIONS, using default"),
            }
        }
        if let Ok(raw) = std::env::var("HUMAN_IN_LOOP") {
            settings.human_in_loop = matches!(raw.to_lowercase().as_str(), "true" | "1" | "yes");
        }
        if let Ok(raw) = std::env::var("CLAUDE_CLI_TIMEOUT") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => settings.worker_timeout = Duration::from_secs(secs),
                _ => tracing::warn!(value = %raw, "Invalid CLAUDE_CLI_TIMEOUT, using default"),
            }
        }
        if let Ok(raw) = std::env::var("CLAUDE_CLI_VALIDATION_MODE") {
            match raw.parse::<ValidationMode>() {
                Ok(mode) => settings.validation_mode = mode,
                Err(_) => {
                    tracing::warn!(value = %raw, "Invalid CLAUDE_CLI_VALIDATION_MODE, using 'lenient'")
                }
            }
        }
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            settings.log_level = level;
        }

        settings
    }

    /// Enforce settings required before any node runs.
    pub fn validate(&self) -> Result<()> {
        if self.anthropic_api_key.is_empty() {
            return Err(AutodevError::Config(
                "ANTHROPIC_API_KEY is required. Set it in the environment.".into(),
            ));
        }
        Ok(())
    }

    /// Per-session artifact root under the workspace.
    pub fn session_workspace(&self, session_id: &str) -> PathBuf {
        self.workspace_root.join(session_id)
    }

    /// Directory holding the per-session checkpoint files.
    pub fn checkpoints_dir(&self) -> PathBuf {
        self.data_root.join("checkpoints")
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_contract() {
        let s = Settings::default();
        assert_eq!(s.max_coding_iterations, 50);
        assert_eq!(s.worker_timeout, Duration::from_secs(300));
        assert_eq!(s.validation_mode, ValidationMode::Lenient);
        assert!(!s.human_in_loop);
        assert_eq!(s.workspace_root, PathBuf::from("workspace"));
        assert_eq!(s.data_root, PathBuf::from("data"));
    }

    #[test]
    fn validate_requires_api_key() {
        let s = Settings::default();
        let err = s.validate().unwrap_err();
        assert!(matches!(err, AutodevError::Config(_)));
        assert_eq!(err.exit_code(), 1);

        let s = Settings {
            anthropic_api_key: "sk-test".into(),
            ..Settings::default()
        };
        assert!(s.validate().is_ok());
    }

    #[test]
    fn session_paths_derive_from_roots() {
        let s = Settings {
            workspace_root: PathBuf::from("/srv/ws"),
            data_root: PathBuf::from("/srv/data"),
            ..Settings::default()
        };
        assert_eq!(s.session_workspace("s1"), PathBuf::from("/srv/ws/s1"));
        assert_eq!(s.checkpoints_dir(), PathBuf::from("/srv/data/checkpoints"));
    }
}
