//! Substring classification of worker CLI output.
//!
//! The coding CLI emits free-form text; the engine never parses structure out
//! of it. Success is decided by exit code, timeout, and case-insensitive
//! marker scanning with two strictness modes.

use serde::{Deserialize, Serialize};

/// Classification strictness for exit-code-zero runs.
///
/// `Lenient` assumes success unless an explicit failure marker appears;
/// `Strict` requires an explicit completion marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationMode {
    Lenient,
    Strict,
}

impl std::str::FromStr for ValidationMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lenient" => Ok(ValidationMode::Lenient),
            "strict" => Ok(ValidationMode::Strict),
            other => Err(format!(
                "Invalid validation mode '{other}', expected 'lenient' or 'strict'"
            )),
        }
    }
}

impl std::fmt::Display for ValidationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationMode::Lenient => f.write_str("lenient"),
            ValidationMode::Strict => f.write_str("strict"),
        }
    }
}

/// Markers that indicate the CLI finished its task (strict-mode success).
pub const SUCCESS_MARKERS: &[&str] = &["done", "completed", "created file", "wrote", "implemented"];

/// Markers that indicate the CLI ran into trouble (lenient-mode failure).
pub const FAILURE_MARKERS: &[&str] = &["error", "failed", "cannot", "unable to"];

#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub success: bool,
    pub reason: Option<String>,
}

impl Classification {
    fn success(reason: Option<&str>) -> Self {
        Self {
            success: true,
            reason: reason.map(String::from),
        }
    }

    fn failure(reason: &str) -> Self {
        Self {
            success: false,
            reason: Some(reason.to_string()),
        }
    }
}

/// Classify a worker run with the default marker lists.
pub fn classify_output(
    exit_code: i32,
    timed_out: bool,
    stdout: &str,
    mode: ValidationMode,
) -> Classification {
    classify_with_markers(
        exit_code,
        timed_out,
        stdout,
        mode,
        SUCCESS_MARKERS,
        FAILURE_MARKERS,
    )
}

/// Classify a worker run with caller-supplied marker lists (case-insensitive).
pub fn classify_with_markers<S: AsRef<str>, F: AsRef<str>>(
    exit_code: i32,
    timed_out: bool,
    stdout: &str,
    mode: ValidationMode,
    success_markers: &[S],
    failure_markers: &[F],
) -> Classification {
    if timed_out {
        return Classification::failure("timeout");
    }
    if exit_code != 0 {
        return Classification::failure("nonzero_exit");
    }

    let lower = stdout.to_lowercase();
    match mode {
        ValidationMode::Strict => {
            match success_markers
                .iter()
                .find(|m| lower.contains(&m.as_ref().to_lowercase()))
            {
                Some(marker) => Classification::success(Some(marker.as_ref())),
                None => Classification::failure("ambiguous_output"),
            }
        }
        ValidationMode::Lenient => {
            match failure_markers
                .iter()
                .find(|m| lower.contains(&m.as_ref().to_lowercase()))
            {
                Some(marker) => Classification {
                    success: false,
                    reason: Some(format!("failure_marker:{}", marker.as_ref())),
                },
                None => Classification::success(None),
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_beats_everything() {
        let c = classify_output(0, true, "done", ValidationMode::Lenient);
        assert!(!c.success);
        assert_eq!(c.reason.as_deref(), Some("timeout"));
    }

    #[test]
    fn nonzero_exit_is_failure_in_both_modes() {
        for mode in [ValidationMode::Lenient, ValidationMode::Strict] {
            let c = classify_output(2, false, "task completed", mode);
            assert!(!c.success);
            assert_eq!(c.reason.as_deref(), Some("nonzero_exit"));
        }
    }

    #[test]
    fn strict_requires_completion_marker() {
        let c = classify_output(0, false, "I made some changes", ValidationMode::Strict);
        assert!(!c.success);
        assert_eq!(c.reason.as_deref(), Some("ambiguous_output"));

        let c = classify_output(0, false, "Task completed successfully", ValidationMode::Strict);
        assert!(c.success);
        assert_eq!(c.reason.as_deref(), Some("completed"));
    }

    #[test]
    fn strict_empty_stdout_is_ambiguous() {
        let c = classify_output(0, false, "", ValidationMode::Strict);
        assert!(!c.success);
        assert_eq!(c.reason.as_deref(), Some("ambiguous_output"));
    }

    #[test]
    fn lenient_ambiguous_output_is_success() {
        let c = classify_output(0, false, "I made some changes", ValidationMode::Lenient);
        assert!(c.success);
        assert!(c.reason.is_none());
    }

    #[test]
    fn lenient_failure_marker_is_failure() {
        let c = classify_output(
            0,
            false,
            "Cannot write to the target directory",
            ValidationMode::Lenient,
        );
        assert!(!c.success);
        assert_eq!(c.reason.as_deref(), Some("failure_marker:cannot"));
    }

    #[test]
    fn markers_are_case_insensitive() {
        let c = classify_output(0, false, "DONE. All files written.", ValidationMode::Strict);
        assert!(c.success);

        let c = classify_output(0, false, "ERROR: out of disk", ValidationMode::Lenient);
        assert!(!c.success);
    }

    #[test]
    fn custom_marker_lists_override_defaults() {
        let c = classify_with_markers(
            0,
            false,
            "ship it",
            ValidationMode::Strict,
            &["ship it"],
            &[] as &[&str],
        );
        assert!(c.success);
        assert_eq!(c.reason.as_deref(), Some("ship it"));

        let c = classify_with_markers(
            0,
            false,
            "done",
            ValidationMode::Strict,
            &["ship it"],
            &[] as &[&str],
        );
        assert!(!c.success);
    }

    #[test]
    fn validation_mode_parses_from_env_strings() {
        assert_eq!(
            "strict".parse::<ValidationMode>().unwrap(),
            ValidationMode::Strict
        );
        assert_eq!(
            "LENIENT".parse::<ValidationMode>().unwrap(),
            ValidationMode::Lenient
        );
        assert!("chaotic".parse::<ValidationMode>().is_err());
    }

    #[test]
    fn validation_mode_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ValidationMode::Strict).unwrap(),
            "\"strict\""
        );
    }
}
