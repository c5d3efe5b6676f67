//! Shared types, errors, and session state for the AutoDev workflow engine.
//!
//! This crate provides the foundational types used across all other AutoDev crates:
//! - `AutodevError` — unified error taxonomy
//! - `SessionState` — the record carried through the workflow graph
//! - `StatePatch` — typed partial-state update returned by nodes
//! - `Task` — one entry of `tasks.json` with status transitions

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unified error type for all AutoDev subsystems.
#[derive(Debug, thiserror::Error)]
pub enum AutodevError {
    // === Configuration ===
    #[error("Configuration error: {0}")]
    Config(String),

    // === LLM Provider Errors ===
    #[error("LLM provider returned HTTP {status}: {message}")]
    Provider {
        status: u16,
        message: String,
        retryable: bool,
    },

    #[error("Authentication failed for the LLM provider")]
    Auth,

    #[error("LLM request timed out after {timeout_ms}ms")]
    RequestTimeout { timeout_ms: u64 },

    #[error("Agent '{agent}' produced empty output")]
    EmptyOutput { agent: String },

    // === Worker Errors ===
    #[error("Worker invocation failed: {0}")]
    Worker(String),

    // === Validation / State ===
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("State error: {0}")]
    State(String),

    #[error("Unknown session '{0}'")]
    UnknownSession(String),

    #[error("Artifact '{artifact}' not found for session '{session}'")]
    MissingArtifact { session: String, artifact: String },

    #[error("Path '{}' escapes the session workspace", .0.display())]
    Confinement(PathBuf),

    // === Engine ===
    #[error("Node '{node}' failed: {message}")]
    Node { node: String, message: String },

    // === Generic ===
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl AutodevError {
    /// Returns `true` if the error is transient and the operation may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AutodevError::RequestTimeout { .. }
                | AutodevError::Provider {
                    retryable: true,
                    ..
                }
        )
    }

    /// Coarse classification used for `last_error` records and status display.
    pub fn kind(&self) -> ErrorKind {
        match self {
            AutodevError::Config(_) => ErrorKind::Config,
            AutodevError::Provider { .. }
            | AutodevError::Auth
            | AutodevError::RequestTimeout { .. }
            | AutodevError::EmptyOutput { .. } => ErrorKind::Llm,
            AutodevError::Worker(_) => ErrorKind::Worker,
            AutodevError::Validation(_) => ErrorKind::Validation,
            AutodevError::State(_)
            | AutodevError::UnknownSession(_)
            | AutodevError::Confinement(_) => ErrorKind::State,
            _ => ErrorKind::Other,
        }
    }

    /// Maps the error to the process exit code for the command surface.
    pub fn exit_code(&self) -> i32 {
        match self {
            AutodevError::State(_)
            | AutodevError::UnknownSession(_)
            | AutodevError::Confinement(_) => 3,
            AutodevError::MissingArtifact { .. } => 4,
            _ => 1,
        }
    }
}

/// A convenience alias for `Result<T, AutodevError>`.
pub type Result<T> = std::result::Result<T, AutodevError>;

// ---------------------------------------------------------------------------
// ErrorKind / ErrorInfo — serializable failure records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Llm,
    Worker,
    Validation,
    State,
    IterationCap,
    Other,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorKind::Config => "config",
            ErrorKind::Llm => "llm",
            ErrorKind::Worker => "worker",
            ErrorKind::Validation => "validation",
            ErrorKind::State => "state",
            ErrorKind::IterationCap => "iteration_cap",
            ErrorKind::Other => "other",
        };
        f.write_str(s)
    }
}

/// Structured error carried in `SessionState::last_error` and checkpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorInfo {
    pub kind: ErrorKind,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// Record for the forced termination when the coding loop hits its cap.
    pub fn iteration_cap(max: u32) -> Self {
        Self {
            kind: ErrorKind::IterationCap,
            message: format!("Coding loop reached the maximum of {max} iterations"),
        }
    }
}

impl From<&AutodevError> for ErrorInfo {
    fn from(err: &AutodevError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Stage — coarse workflow phase
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    PmDraft,
    PmReview,
    PmRevise,
    Architect,
    Coding,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::PmDraft => "pm_draft",
            Stage::PmReview => "pm_review",
            Stage::PmRevise => "pm_revise",
            Stage::Architect => "architect",
            Stage::Coding => "coding",
            Stage::Done => "done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ReviewRole — the three PRD reviewer perspectives
// ---------------------------------------------------------------------------

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum ReviewRole {
    Pm,
    Dev,
    Qa,
}

impl ReviewRole {
    pub const ALL: [ReviewRole; 3] = [ReviewRole::Pm, ReviewRole::Dev, ReviewRole::Qa];

    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewRole::Pm => "pm",
            ReviewRole::Dev => "dev",
            ReviewRole::Qa => "qa",
        }
    }

    /// Heading used in the `PRD_Reviews.md` audit file.
    pub fn heading(&self) -> &'static str {
        match self {
            ReviewRole::Pm => "Product Manager Review",
            ReviewRole::Dev => "Developer Review",
            ReviewRole::Qa => "QA Engineer Review",
        }
    }
}

impl std::fmt::Display for ReviewRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Task — one entry of tasks.json
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Completed,
    Blocked,
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub status: TaskStatus,
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

impl Task {
    pub fn new(
        id: impl Into<String>,
        title: impl Into<String>,
        description: impl Into<String>,
        dependencies: Vec<String>,
        priority: i64,
    ) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            description: description.into(),
            dependencies,
            status: TaskStatus::Pending,
            priority,
            started_at: None,
            completed_at: None,
            blocked_at: None,
            duration: None,
        }
    }

    pub fn is_settled(&self) -> bool {
        self.status != TaskStatus::Pending
    }
}

/// Seconds between two instants, rounded to two decimals for task records.
pub fn duration_secs(start: DateTime<Utc>, end: DateTime<Utc>) -> f64 {
    let millis = (end - start).num_milliseconds().max(0) as f64;
    (millis / 10.0).round() / 100.0
}

/// Index of the next eligible task: the highest-priority `pending` task whose
/// dependencies are all `completed`. Ties break by array order.
pub fn next_eligible(tasks: &[Task]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, task) in tasks.iter().enumerate() {
        if task.status != TaskStatus::Pending {
            continue;
        }
        let ready = task.dependencies.iter().all(|dep| {
            tasks
                .iter()
                .any(|t| t.id == *dep && t.status == TaskStatus::Completed)
        });
        if !ready {
            continue;
        }
        match best {
            Some(b) if tasks[b].priority >= task.priority => {}
            _ => best = Some(i),
        }
    }
    best
}

pub fn has_pending(tasks: &[Task]) -> bool {
    tasks.iter().any(|t| t.status == TaskStatus::Pending)
}

// ---------------------------------------------------------------------------
// SessionState — the record carried through the graph
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionState {
    pub session_id: String,
    pub requirement: String,
    pub workspace_path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_dir: Option<PathBuf>,
    pub human_in_loop: bool,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks_path: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviews_path: Option<PathBuf>,
    #[serde(default)]
    pub reviews: BTreeMap<ReviewRole, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub current_task_index: usize,
    #[serde(default)]
    pub iterations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<ErrorInfo>,
    pub created_at: DateTime<Utc>,
}

impl SessionState {
    pub fn new(
        session_id: impl Into<String>,
        requirement: impl Into<String>,
        workspace_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            requirement: requirement.into(),
            workspace_path: workspace_path.into(),
            project_dir: None,
            human_in_loop: false,
            stage: Stage::PmDraft,
            prd_path: None,
            design_path: None,
            tasks_path: None,
            reviews_path: None,
            reviews: BTreeMap::new(),
            feedback: None,
            tasks: Vec::new(),
            current_task_index: 0,
            iterations: 0,
            last_error: None,
            created_at: Utc::now(),
        }
    }

    /// Directory generated code is written to: `project_dir` when configured,
    /// `<workspace>/code` otherwise.
    pub fn code_dir(&self) -> PathBuf {
        match &self.project_dir {
            Some(dir) => dir.clone(),
            None => self.workspace_path.join("code"),
        }
    }

    pub fn count_by_status(&self, status: TaskStatus) -> usize {
        self.tasks.iter().filter(|t| t.status == status).count()
    }

    /// Merge a node's partial update into the state.
    pub fn apply(&mut self, patch: StatePatch) {
        if let Some(stage) = patch.stage {
            self.stage = stage;
        }
        if let Some(p) = patch.prd_path {
            self.prd_path = Some(p);
        }
        if let Some(p) = patch.design_path {
            self.design_path = Some(p);
        }
        if let Some(p) = patch.tasks_path {
            self.tasks_path = Some(p);
        }
        if let Some(p) = patch.reviews_path {
            self.reviews_path = Some(p);
        }
        // Reviews merge by distinct key; completion order does not matter.
        for (role, review) in patch.reviews {
            self.reviews.insert(role, review);
        }
        if let Some(tasks) = patch.tasks {
            self.tasks = tasks;
        }
        if let Some(idx) = patch.current_task_index {
            self.current_task_index = idx;
        }
        if let Some(iters) = patch.iterations {
            self.iterations = iters;
        }
        if let Some(err) = patch.last_error {
            self.last_error = Some(err);
        }
        if patch.clear_feedback {
            self.feedback = None;
        }
    }
}

// ---------------------------------------------------------------------------
// StatePatch — typed partial-state update returned by nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatePatch {
    pub stage: Option<Stage>,
    pub prd_path: Option<PathBuf>,
    pub design_path: Option<PathBuf>,
    pub tasks_path: Option<PathBuf>,
    pub reviews_path: Option<PathBuf>,
    #[serde(default)]
    pub reviews: BTreeMap<ReviewRole, String>,
    pub tasks: Option<Vec<Task>>,
    pub current_task_index: Option<usize>,
    pub iterations: Option<u32>,
    pub last_error: Option<ErrorInfo>,
    #[serde(default)]
    pub clear_feedback: bool,
}

impl StatePatch {
    pub fn stage(stage: Stage) -> Self {
        Self {
            stage: Some(stage),
            ..Default::default()
        }
    }

    pub fn review(role: ReviewRole, text: impl Into<String>) -> Self {
        let mut patch = Self::default();
        patch.reviews.insert(role, text.into());
        patch
    }
}

/// Confine a relative artifact path to a workspace root. Absolute paths and
/// `..` traversal are rejected.
pub fn confine(root: &Path, relative: &Path) -> Result<PathBuf> {
    if relative.is_absolute() {
        return Err(AutodevError::Confinement(relative.to_path_buf()));
    }
    for component in relative.components() {
        match component {
            std::path::Component::Normal(_) | std::path::Component::CurDir => {}
            _ => return Err(AutodevError::Confinement(relative.to_path_buf())),
        }
    }
    Ok(root.join(relative))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_config() {
        let err = AutodevError::Config("ANTHROPIC_API_KEY is required".into());
        assert_eq!(
            err.to_string(),
            "Configuration error: ANTHROPIC_API_KEY is required"
        );
    }

    #[test]
    fn error_display_provider() {
        let err = AutodevError::Provider {
            status: 500,
            message: "internal server error".into(),
            retryable: true,
        };
        assert_eq!(
            err.to_string(),
            "LLM provider returned HTTP 500: internal server error"
        );
    }

    #[test]
    fn error_display_empty_output() {
        let err = AutodevError::EmptyOutput {
            agent: "pm_draft".into(),
        };
        assert_eq!(err.to_string(), "Agent 'pm_draft' produced empty output");
    }

    #[test]
    fn error_display_missing_artifact() {
        let err = AutodevError::MissingArtifact {
            session: "s1".into(),
            artifact: "prd".into(),
        };
        assert_eq!(err.to_string(), "Artifact 'prd' not found for session 's1'");
    }

    // --- kind / exit_code ---

    #[test]
    fn kind_maps_llm_errors() {
        assert_eq!(AutodevError::Auth.kind(), ErrorKind::Llm);
        assert_eq!(
            AutodevError::EmptyOutput { agent: "x".into() }.kind(),
            ErrorKind::Llm
        );
        assert_eq!(
            AutodevError::RequestTimeout { timeout_ms: 100 }.kind(),
            ErrorKind::Llm
        );
    }

    #[test]
    fn kind_maps_state_errors() {
        assert_eq!(
            AutodevError::State("bad checkpoint".into()).kind(),
            ErrorKind::State
        );
        assert_eq!(
            AutodevError::UnknownSession("s".into()).kind(),
            ErrorKind::State
        );
    }

    #[test]
    fn exit_code_mapping() {
        assert_eq!(AutodevError::Config("x".into()).exit_code(), 1);
        assert_eq!(AutodevError::UnknownSession("s".into()).exit_code(), 3);
        assert_eq!(AutodevError::State("s".into()).exit_code(), 3);
        assert_eq!(
            AutodevError::MissingArtifact {
                session: "s".into(),
                artifact: "prd".into()
            }
            .exit_code(),
            4
        );
        assert_eq!(AutodevError::Validation("v".into()).exit_code(), 1);
    }

    #[test]
    fn retryable_provider_error_when_flagged() {
        let err = AutodevError::Provider {
            status: 503,
            message: "unavailable".into(),
            retryable: true,
        };
        assert!(err.is_retryable());

        let err = AutodevError::Provider {
            status: 400,
            message: "bad request".into(),
            retryable: false,
        };
        assert!(!err.is_retryable());
    }

    // --- ErrorKind / ErrorInfo ---

    #[test]
    fn error_kind_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&ErrorKind::IterationCap).unwrap(),
            "\"iteration_cap\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorKind::Validation).unwrap(),
            "\"validation\""
        );
    }

    #[test]
    fn error_info_from_error() {
        let err = AutodevError::Validation("cycle detected".into());
        let info = ErrorInfo::from(&err);
        assert_eq!(info.kind, ErrorKind::Validation);
        assert!(info.message.contains("cycle detected"));
    }

    #[test]
    fn iteration_cap_record() {
        let info = ErrorInfo::iteration_cap(2);
        assert_eq!(info.kind, ErrorKind::IterationCap);
        assert!(info.message.contains("2"));
    }

    // --- Stage / ReviewRole / TaskStatus wire forms ---

    #[test]
    fn stage_serializes_snake_case() {
        assert_eq!(serde_json::to_string(&Stage::PmDraft).unwrap(), "\"pm_draft\"");
        assert_eq!(serde_json::to_string(&Stage::Done).unwrap(), "\"done\"");
        let stage: Stage = serde_json::from_str("\"pm_revise\"").unwrap();
        assert_eq!(stage, Stage::PmRevise);
    }

    #[test]
    fn review_role_round_trip() {
        for role in ReviewRole::ALL {
            let json = serde_json::to_string(&role).unwrap();
            let back: ReviewRole = serde_json::from_str(&json).unwrap();
            assert_eq!(back, role);
        }
    }

    #[test]
    fn task_status_wire_form() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Pending).unwrap(),
            "\"pending\""
        );
        assert_eq!(
            serde_json::to_string(&TaskStatus::Blocked).unwrap(),
            "\"blocked\""
        );
    }

    // --- Task helpers ---

    fn task(id: &str, deps: &[&str], priority: i64, status: TaskStatus) -> Task {
        let mut t = Task::new(
            id,
            format!("Task {id}"),
            "",
            deps.iter().map(|s| s.to_string()).collect(),
            priority,
        );
        t.status = status;
        t
    }

    #[test]
    fn task_serializes_without_empty_timestamps() {
        let t = Task::new("task_001", "Setup", "Create project layout", vec![], 5);
        let json = serde_json::to_value(&t).unwrap();
        assert!(json.get("started_at").is_none());
        assert!(json.get("duration").is_none());
        assert_eq!(json["status"], "pending");
        assert_eq!(json["priority"], 5);
    }

    #[test]
    fn duration_rounds_to_two_decimals() {
        let start = Utc::now();
        let end = start + chrono::Duration::milliseconds(1234);
        assert_eq!(duration_secs(start, end), 1.23);

        let end = start + chrono::Duration::milliseconds(1236);
        assert_eq!(duration_secs(start, end), 1.24);
    }

    #[test]
    fn next_eligible_picks_highest_priority() {
        let tasks = vec![
            task("a", &[], 1, TaskStatus::Pending),
            task("b", &[], 10, TaskStatus::Pending),
            task("c", &[], 5, TaskStatus::Pending),
        ];
        assert_eq!(next_eligible(&tasks), Some(1));
    }

    #[test]
    fn next_eligible_ties_break_by_array_order() {
        let tasks = vec![
            task("a", &[], 5, TaskStatus::Pending),
            task("b", &[], 5, TaskStatus::Pending),
        ];
        assert_eq!(next_eligible(&tasks), Some(0));
    }

    #[test]
    fn next_eligible_respects_dependencies() {
        let tasks = vec![
            task("a", &[], 1, TaskStatus::Pending),
            task("b", &["a"], 10, TaskStatus::Pending),
        ];
        // b has the higher priority but depends on pending a.
        assert_eq!(next_eligible(&tasks), Some(0));
    }

    #[test]
    fn next_eligible_skips_blocked_dependency_chains() {
        let tasks = vec![
            task("a", &[], 1, TaskStatus::Blocked),
            task("b", &["a"], 10, TaskStatus::Pending),
            task("c", &[], 5, TaskStatus::Pending),
        ];
        assert_eq!(next_eligible(&tasks), Some(2));
    }

    #[test]
    fn next_eligible_none_when_all_settled_or_unreachable() {
        let tasks = vec![
            task("a", &[], 1, TaskStatus::Blocked),
            task("b", &["a"], 10, TaskStatus::Pending),
        ];
        assert_eq!(next_eligible(&tasks), None);
        assert!(has_pending(&tasks));
    }

    // --- SessionState / StatePatch ---

    #[test]
    fn state_round_trips_through_json() {
        let mut state = SessionState::new("s1", "Build a todo CLI", "/tmp/ws/s1");
        state.stage = Stage::Coding;
        state.tasks = vec![task("a", &[], 1, TaskStatus::Completed)];
        state.current_task_index = 1;
        state.reviews.insert(ReviewRole::Dev, "looks fine".into());
        state.last_error = Some(ErrorInfo::new(ErrorKind::Worker, "timeout"));

        let json = serde_json::to_string_pretty(&state).unwrap();
        let back: SessionState = serde_json::from_str(&json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn apply_merges_reviews_by_key() {
        let mut state = SessionState::new("s1", "req", "/tmp/ws/s1");
        state.apply(StatePatch::review(ReviewRole::Qa, "needs tests"));
        state.apply(StatePatch::review(ReviewRole::Pm, "solid"));
        assert_eq!(state.reviews.len(), 2);
        assert_eq!(state.reviews[&ReviewRole::Qa], "needs tests");
        assert_eq!(state.reviews[&ReviewRole::Pm], "solid");
    }

    #[test]
    fn apply_clears_feedback_when_flagged() {
        let mut state = SessionState::new("s1", "req", "/tmp/ws/s1");
        state.feedback = Some("use sqlite".into());
        let patch = StatePatch {
            clear_feedback: true,
            ..Default::default()
        };
        state.apply(patch);
        assert!(state.feedback.is_none());
    }

    #[test]
    fn apply_preserves_unpatched_fields() {
        let mut state = SessionState::new("s1", "req", "/tmp/ws/s1");
        state.prd_path = Some("/tmp/ws/s1/PRD.md".into());
        state.apply(StatePatch::stage(Stage::Architect));
        assert_eq!(state.stage, Stage::Architect);
        assert_eq!(state.prd_path.as_deref(), Some(Path::new("/tmp/ws/s1/PRD.md")));
    }

    #[test]
    fn code_dir_prefers_project_dir() {
        let mut state = SessionState::new("s1", "req", "/tmp/ws/s1");
        assert_eq!(state.code_dir(), PathBuf::from("/tmp/ws/s1/code"));
        state.project_dir = Some("/srv/app".into());
        assert_eq!(state.code_dir(), PathBuf::from("/srv/app"));
    }

    // --- confine ---

    #[test]
    fn confine_joins_relative_paths() {
        let root = Path::new("/tmp/ws/s1");
        let joined = confine(root, Path::new("PRD.md")).unwrap();
        assert_eq!(joined, PathBuf::from("/tmp/ws/s1/PRD.md"));
    }

    #[test]
    fn confine_rejects_absolute_paths() {
        let root = Path::new("/tmp/ws/s1");
        assert!(confine(root, Path::new("/etc/passwd")).is_err());
    }

    #[test]
    fn confine_rejects_parent_traversal() {
        let root = Path::new("/tmp/ws/s1");
        let err = confine(root, Path::new("../other/PRD.md")).unwrap_err();
        assert!(matches!(err, AutodevError::Confinement(_)));
    }
}
