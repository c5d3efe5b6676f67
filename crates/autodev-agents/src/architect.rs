//! Architect node: turns the PRD into `Design.md` plus a validated
//! `tasks.json` breakdown.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use autodev_engine::{artifacts, NodeId, Workspace, WorkflowNode};
use autodev_types::{AutodevError, Result, SessionState, StatePatch, Task, TaskStatus};

use crate::planner::complete_text;
use crate::prompts;
use crate::AgentContext;

pub struct ArchitectNode {
    ctx: Arc<AgentContext>,
}

impl ArchitectNode {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl WorkflowNode for ArchitectNode {
    fn id(&self) -> NodeId {
        NodeId::Architect
    }

    async fn run(&self, state: &SessionState) -> Result<StatePatch> {
        let workspace = Workspace::open(&state.workspace_path);
        let prd = workspace.read_text(artifacts::PRD).await?;

        let prompt = prompts::architect_prompt(&prd, state.feedback.as_deref());
        let response = complete_text(
            &self.ctx,
            "architect",
            &self.ctx.settings.architect_model,
            prompts::ARCHITECT_SYSTEM,
            prompt,
        )
        .await?;

        let (design, tasks_json) = split_design_and_tasks(&response);
        let tasks_json = tasks_json.ok_or_else(|| {
            AutodevError::Validation("Architect response contains no tasks JSON block".into())
        })?;

        let tasks: Vec<Task> = serde_json::from_str(&tasks_json)
            .map_err(|e| AutodevError::Validation(format!("tasks.json is malformed: {e}")))?;
        validate_tasks(&tasks)?;

        let design_path = workspace.write_text(artifacts::DESIGN, &design).await?;
        let tasks_path = workspace.write_json(artifacts::TASKS, &tasks).await?;
        tracing::info!(
            session = %state.session_id,
            tasks = tasks.len(),
            path = %design_path.display(),
            "Design and task breakdown produced"
        );

        Ok(StatePatch {
            design_path: Some(design_path),
            tasks_path: Some(tasks_path),
            tasks: Some(tasks),
            current_task_index: Some(0),
            clear_feedback: true,
            ..Default::default()
        })
    }
}

/// Split the architect response into design text and the fenced JSON task
/// block. Returns the response unchanged when no block is present.
pub fn split_design_and_tasks(response: &str) -> (String, Option<String>) {
    let re = regex::Regex::new(r"(?s)```json\s*\n(.*?)```").expect("static regex");
    match re.captures(response) {
        Some(caps) => {
            let json = caps.get(1).map(|m| m.as_str().trim().to_string());
            let design = re.replace(response, "").trim().to_string();
            (design, json)
        }
        None => (response.trim().to_string(), None),
    }
}

/// Task-list validation: ids unique, dependencies declared, no cycles,
/// statuses uniformly pending. An empty list is allowed and terminates the
/// session without any coder invocation.
pub fn validate_tasks(tasks: &[Task]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    for task in tasks {
        if task.id.is_empty() {
            return Err(AutodevError::Validation("Task with empty id".into()));
        }
        if !seen.insert(&task.id) {
            return Err(AutodevError::Validation(format!(
                "Duplicate task id '{}'",
                task.id
            )));
        }
        if task.status != TaskStatus::Pending {
            return Err(AutodevError::Validation(format!(
                "Task '{}' created with status '{}', expected 'pending'",
                task.id, task.status
            )));
        }
    }

    for task in tasks {
        for dep in &task.dependencies {
            if !seen.contains(dep.as_str()) {
                return Err(AutodevError::Validation(format!(
                    "Task '{}' depends on undeclared task '{dep}'",
                    task.id
                )));
            }
            if dep == &task.id {
                return Err(AutodevError::Validation(format!(
                    "Task '{}' depends on itself",
                    task.id
                )));
            }
        }
    }

    // Kahn's algorithm: every task must be orderable.
    let mut indegree: HashMap<&str, usize> = tasks
        .iter()
        .map(|t| (t.id.as_str(), t.dependencies.len()))
        .collect();
    let mut dependents: HashMap<&str, Vec<&str>> = HashMap::new();
    for task in tasks {
        for dep in &task.dependencies {
            dependents.entry(dep.as_str()).or_default().push(&task.id);
        }
    }
    let mut queue: VecDeque<&str> = indegree
        .iter()
        .filter(|(_, deg)| **deg == 0)
        .map(|(id, _)| *id)
        .collect();
    let mut ordered = 0usize;
    while let Some(id) = queue.pop_front() {
        ordered += 1;
        for &dependent in dependents.get(id).into_iter().flatten() {
            let deg = indegree.get_mut(dependent).expect("declared id");
            *deg -= 1;
            if *deg == 0 {
                queue.push_back(dependent);
            }
        }
    }
    if ordered != tasks.len() {
        return Err(AutodevError::Validation(
            "Task dependencies contain a cycle".into(),
        ));
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{scripted_context, NullWorker};
    use tempfile::TempDir;

    fn task(id: &str, deps: &[&str]) -> Task {
        Task::new(
            id,
            format!("Task {id}"),
            "",
            deps.iter().map(|s| s.to_string()).collect(),
            1,
        )
    }

    #[test]
    fn split_extracts_json_block() {
        let response = "# Design\n\nSome architecture.\n\n```json\n[{\"id\": \"task_001\"}]\n```\n";
        let (design, json) = split_design_and_tasks(response);
        assert!(design.contains("Some architecture."));
        assert!(!design.contains("task_001"));
        assert_eq!(json.as_deref(), Some("[{\"id\": \"task_001\"}]"));
    }

    #[test]
    fn split_without_block_returns_none() {
        let (design, json) = split_design_and_tasks("# Design only");
        assert_eq!(design, "# Design only");
        assert!(json.is_none());
    }

    #[test]
    fn validate_accepts_well_formed_list() {
        let tasks = vec![task("a", &[]), task("b", &["a"]), task("c", &["a", "b"])];
        assert!(validate_tasks(&tasks).is_ok());
    }

    #[test]
    fn validate_accepts_empty_list() {
        assert!(validate_tasks(&[]).is_ok());
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let tasks = vec![task("a", &[]), task("a", &[])];
        let err = validate_tasks(&tasks).unwrap_err();
        assert!(err.to_string().contains("Duplicate task id"));
    }

    #[test]
    fn validate_rejects_unknown_dependency() {
        let tasks = vec![task("a", &["ghost"])];
        let err = validate_tasks(&tasks).unwrap_err();
        assert!(err.to_string().contains("undeclared task 'ghost'"));
    }

    #[test]
    fn validate_rejects_cycles() {
        let tasks = vec![task("a", &["b"]), task("b", &["a"])];
        let err = validate_tasks(&tasks).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn validate_rejects_self_dependency() {
        let tasks = vec![task("a", &["a"])];
        assert!(validate_tasks(&tasks).is_err());
    }

    #[test]
    fn validate_rejects_non_pending_status() {
        let mut t = task("a", &[]);
        t.status = TaskStatus::Completed;
        let err = validate_tasks(&[t]).unwrap_err();
        assert!(err.to_string().contains("expected 'pending'"));
    }

    const ARCHITECT_RESPONSE: &str = r#"# Design

## Architecture Overview

Single binary.

```json
[
  {"id": "task_001", "title": "Scaffold", "description": "Create layout", "dependencies": [], "status": "pending", "priority": 10},
  {"id": "task_002", "title": "Core", "description": "Implement", "dependencies": ["task_001"], "status": "pending", "priority": 5}
]
```
"#;

    async fn state_with_prd(dir: &TempDir) -> SessionState {
        let workspace = Workspace::create(dir.path(), "s1").await.unwrap();
        workspace.write_text(artifacts::PRD, "# PRD").await.unwrap();
        SessionState::new("s1", "Build it", workspace.root())
    }

    #[tokio::test]
    async fn architect_writes_design_and_tasks() {
        let dir = TempDir::new().unwrap();
        let state = state_with_prd(&dir).await;
        let ctx = scripted_context(vec![ARCHITECT_RESPONSE], Arc::new(NullWorker));

        let patch = ArchitectNode::new(ctx).run(&state).await.unwrap();

        let tasks = patch.tasks.expect("tasks patched");
        assert_eq!(tasks.len(), 2);
        assert_eq!(tasks[0].id, "task_001");
        assert_eq!(patch.current_task_index, Some(0));
        assert!(patch.clear_feedback);

        let workspace = Workspace::open(&state.workspace_path);
        let design = workspace.read_text(artifacts::DESIGN).await.unwrap();
        assert!(design.contains("Architecture Overview"));
        assert!(!design.contains("task_001"));

        let on_disk: Vec<Task> = workspace.read_json(artifacts::TASKS).await.unwrap();
        assert_eq!(on_disk, tasks);
    }

    #[tokio::test]
    async fn architect_without_tasks_block_fails_validation() {
        let dir = TempDir::new().unwrap();
        let state = state_with_prd(&dir).await;
        let ctx = scripted_context(vec!["# Design without tasks"], Arc::new(NullWorker));

        let err = ArchitectNode::new(ctx).run(&state).await.unwrap_err();
        assert!(matches!(err, AutodevError::Validation(_)));
    }

    #[tokio::test]
    async fn architect_with_cyclic_tasks_fails_validation() {
        let response = r#"Design.
```json
[
  {"id": "a", "title": "A", "description": "", "dependencies": ["b"], "status": "pending", "priority": 1},
  {"id": "b", "title": "B", "description": "", "dependencies": ["a"], "status": "pending", "priority": 1}
]
```"#;
        let dir = TempDir::new().unwrap();
        let state = state_with_prd(&dir).await;
        let ctx = scripted_context(vec![response], Arc::new(NullWorker));

        let err = ArchitectNode::new(ctx).run(&state).await.unwrap_err();
        assert!(matches!(err, AutodevError::Validation(_)));
        assert!(err.to_string().contains("cycle"));
    }
}
