//! The iterative coder node: advances the task list by invoking the worker
//! CLI, one task per engine pass (or all remaining tasks in batch mode).
//!
//! `tasks.json` on disk is the source of truth. The start stamp is persisted
//! before the worker runs and the status transition is persisted after, so a
//! crash mid-task leaves the task `pending` on disk and it is retried on
//! resume.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;

use autodev_engine::{artifacts, NodeId, Workspace, WorkflowNode};
use autodev_types::{
    duration_secs, has_pending, next_eligible, ErrorInfo, ErrorKind, Result, SessionState, Stage,
    StatePatch, Task, TaskStatus,
};
use autodev_worker::WorkerRequest;

use crate::prompts;
use crate::AgentContext;

pub struct CoderNode {
    ctx: Arc<AgentContext>,
    batch: bool,
}

impl CoderNode {
    /// One task per node invocation; the engine loops.
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx, batch: false }
    }

    /// Settle every remaining task inside a single node invocation.
    pub fn batch(ctx: Arc<AgentContext>) -> Self {
        Self { ctx, batch: true }
    }
}

#[async_trait]
impl WorkflowNode for CoderNode {
    fn id(&self) -> NodeId {
        NodeId::Coder
    }

    async fn run(&self, state: &SessionState) -> Result<StatePatch> {
        let workspace = Workspace::open(&state.workspace_path);

        // Disk is authoritative across process restarts.
        let mut tasks: Vec<Task> = if workspace.exists(artifacts::TASKS).await? {
            workspace.read_json(artifacts::TASKS).await?
        } else {
            state.tasks.clone()
        };

        let max = self.ctx.settings.max_coding_iterations;
        let mut iterations = state.iterations;
        let mut last_error: Option<ErrorInfo> = None;
        let mut executed_any = false;
        let mut done = false;

        loop {
            if tasks.is_empty() {
                tracing::warn!(session = %state.session_id, "No tasks to execute");
                done = true;
                break;
            }
            match next_eligible(&tasks) {
                Some(idx) => {
                    let failure = self.execute_task(state, &workspace, &mut tasks, idx).await?;
                    iterations += 1;
                    executed_any = true;
                    if let Some(err) = failure {
                        last_error = Some(err);
                    }
                    if !self.batch || iterations >= max {
                        break;
                    }
                }
                None if !has_pending(&tasks) => {
                    tracing::info!(session = %state.session_id, "All tasks settled");
                    done = true;
                    break;
                }
                None => {
                    // Pending tasks remain but their dependency chains are
                    // blocked; settle them so the session can finish.
                    let unreachable = block_unreachable(&mut tasks);
                    workspace.write_json(artifacts::TASKS, &tasks).await?;
                    tracing::warn!(
                        session = %state.session_id,
                        unreachable,
                        "No eligible tasks remain; blocking unreachable tasks"
                    );
                    done = true;
                    break;
                }
            }
        }

        let settled = tasks.iter().filter(|t| t.is_settled()).count();
        Ok(StatePatch {
            stage: done.then_some(Stage::Done),
            tasks: Some(tasks),
            current_task_index: Some(settled),
            iterations: executed_any.then_some(iterations),
            last_error,
            ..Default::default()
        })
    }
}

impl CoderNode {
    /// Run one task through the worker. Returns the failure record when the
    /// task ended up blocked.
    async fn execute_task(
        &self,
        state: &SessionState,
        workspace: &Workspace,
        tasks: &mut Vec<Task>,
        idx: usize,
    ) -> Result<Option<ErrorInfo>> {
        let started = Utc::now();
        tasks[idx].started_at = Some(started);
        // The completion write below is the commit point; persisting only the
        // start stamp keeps a crashed task retryable.
        workspace.write_json(artifacts::TASKS, tasks).await?;

        let prd = read_or_default(workspace, artifacts::PRD).await;
        let design = read_or_default(workspace, artifacts::DESIGN).await;
        let code_dir = match &state.project_dir {
            Some(dir) => dir.clone(),
            None => workspace.code_dir().await?,
        };

        let prompt = prompts::coder_prompt(
            &prd,
            &design,
            &tasks[idx],
            &code_dir.display().to_string(),
        );

        tracing::info!(
            session = %state.session_id,
            task = %tasks[idx].id,
            title = %tasks[idx].title,
            "Executing coding task"
        );

        let request = WorkerRequest::new(prompt, code_dir);
        let (success, failure_reason) = match self.ctx.worker.run(&request).await {
            Ok(outcome) => (outcome.success, outcome.reason),
            Err(e) => (false, Some(e.to_string())),
        };

        let finished = Utc::now();
        let task = &mut tasks[idx];
        task.duration = Some(duration_secs(started, finished));

        let failure = if success {
            task.status = TaskStatus::Completed;
            task.completed_at = Some(finished);
            tracing::info!(task = %task.id, duration = ?task.duration, "Task completed");
            None
        } else {
            task.status = TaskStatus::Blocked;
            task.blocked_at = Some(finished);
            let reason = failure_reason.unwrap_or_else(|| "unknown".into());
            tracing::warn!(task = %task.id, reason = %reason, "Task blocked");
            Some(ErrorInfo::new(
                ErrorKind::Worker,
                format!("Task '{}' blocked: {reason}", task.id),
            ))
        };

        workspace.write_json(artifacts::TASKS, tasks).await?;
        Ok(failure)
    }
}

async fn read_or_default(workspace: &Workspace, relative: &str) -> String {
    workspace.read_text(relative).await.unwrap_or_default()
}

/// Block every still-pending task; their dependency chains can never complete.
fn block_unreachable(tasks: &mut [Task]) -> usize {
    let now = Utc::now();
    let mut count = 0;
    for task in tasks.iter_mut() {
        if task.status == TaskStatus::Pending {
            task.status = TaskStatus::Blocked;
            task.blocked_at = Some(now);
            count += 1;
        }
    }
    count
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
