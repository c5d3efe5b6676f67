//! Workflow execution engine — the core traversal loop.
//!
//! Drives a session from a starting node to completion, an interrupt, or a
//! failure, checkpointing after every node transition so that any stop is
//! resumable in a new process.

use autodev_types::{has_pending, AutodevError, ErrorInfo, Result, SessionState, Stage};

use crate::checkpoint::{Checkpoint, CheckpointStatus, CheckpointStore};
use crate::graph::{producer_of, Workflow};
use crate::node::{NodeId, NodeRegistry};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum RunStatus {
    Completed,
    Interrupted { next: NodeId },
    Failed { error: ErrorInfo },
}

#[derive(Debug)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub state: SessionState,
}

// ---------------------------------------------------------------------------
// WorkflowEngine
// ---------------------------------------------------------------------------

pub struct WorkflowEngine {
    registry: NodeRegistry,
    workflow: Workflow,
    store: CheckpointStore,
}

impl WorkflowEngine {
    pub fn new(registry: NodeRegistry, workflow: Workflow, store: CheckpointStore) -> Self {
        Self {
            registry,
            workflow,
            store,
        }
    }

    pub fn store(&self) -> &CheckpointStore {
        &self.store
    }

    /// Run a fresh session from the entry node.
    pub async fn start(&self, state: SessionState) -> Result<RunOutcome> {
        tracing::info!(session = %state.session_id, "Starting workflow");
        self.drive(state, self.workflow.entry(), false).await
    }

    /// Resume a session from its checkpoint.
    ///
    /// Feedback routing: non-empty feedback re-enters the *producer* of the
    /// artifact the pending node consumes, and the interrupt fires again
    /// before the consumer. Empty feedback advances past the interrupt point
    /// with no other state change. A failed session re-executes the failed
    /// node.
    pub async fn resume(&self, session_id: &str, feedback: Option<String>) -> Result<RunOutcome> {
        let checkpoint = self.store.load(session_id).await?;
        let mut state = checkpoint.state;
        let feedback = feedback.filter(|f| !f.trim().is_empty());

        match checkpoint.status {
            CheckpointStatus::Completed => {
                tracing::info!(session = %session_id, "Session already completed");
                Ok(RunOutcome {
                    status: RunStatus::Completed,
                    state,
                })
            }
            CheckpointStatus::Running => {
                // Crash recovery: the recorded node never finished; run it again.
                let next = checkpoint.next_node.ok_or_else(|| {
                    AutodevError::State(format!("Checkpoint for '{session_id}' has no next node"))
                })?;
                tracing::info!(session = %session_id, node = %next, "Recovering interrupted process");
                self.drive(state, next, false).await
            }
            CheckpointStatus::Interrupted => {
                let next = checkpoint.next_node.ok_or_else(|| {
                    AutodevError::State(format!("Checkpoint for '{session_id}' has no next node"))
                })?;
                match feedback {
                    Some(fb) => {
                        state.feedback = Some(fb);
                        let start = producer_of(next).unwrap_or(next);
                        tracing::info!(
                            session = %session_id,
                            interrupt = %next,
                            reenter = %start,
                            "Resuming with feedback; re-running producer"
                        );
                        // The producer itself runs unconditionally; the
                        // interrupt fires again before the consumer.
                        self.drive(state, start, true).await
                    }
                    None => {
                        tracing::info!(session = %session_id, node = %next, "Resuming past interrupt");
                        self.drive(state, next, true).await
                    }
                }
            }
            CheckpointStatus::Failed => {
                let next = checkpoint.next_node.ok_or_else(|| {
                    AutodevError::State(format!("Checkpoint for '{session_id}' has no next node"))
                })?;
                if let Some(fb) = feedback {
                    state.feedback = Some(fb);
                }
                tracing::info!(session = %session_id, node = %next, "Retrying failed node");
                self.drive(state, next, true).await
            }
        }
    }

    async fn drive(
        &self,
        mut state: SessionState,
        mut current: NodeId,
        mut skip_interrupt: bool,
    ) -> Result<RunOutcome> {
        // A self-transition (the coder loop) does not re-trigger its own
        // interrupt point; interrupts fire on entry from another node.
        let mut previous: Option<NodeId> = None;
        loop {
            state.stage = current.stage();

            if !skip_interrupt
                && state.human_in_loop
                && previous != Some(current)
                && self.workflow.interrupts_before(current)
            {
                let checkpoint =
                    Checkpoint::new(CheckpointStatus::Interrupted, Some(current), state.clone());
                self.store.save(&checkpoint).await?;
                tracing::info!(
                    session = %state.session_id,
                    node = %current,
                    stage = %state.stage,
                    "Interrupted for human review"
                );
                return Ok(RunOutcome {
                    status: RunStatus::Interrupted { next: current },
                    state,
                });
            }
            skip_interrupt = false;

            // The cap also guards re-entry: resuming a capped session fails
            // again instead of running one more task past the limit.
            if current == NodeId::Coder && self.cap_reached(&state) {
                return self.fail_with_cap(state).await;
            }

            let node = self.registry.get(current).ok_or_else(|| {
                AutodevError::State(format!("No node registered for '{current}'"))
            })?;

            state.last_error = None;
            tracing::info!(session = %state.session_id, node = %current, "Executing node");

            match node.run(&state).await {
                Ok(patch) => state.apply(patch),
                Err(err) => {
                    tracing::error!(
                        session = %state.session_id,
                        node = %current,
                        error = %err,
                        "Node failed"
                    );
                    let info = ErrorInfo::from(&err);
                    state.last_error = Some(info.clone());
                    let checkpoint =
                        Checkpoint::new(CheckpointStatus::Failed, Some(current), state.clone());
                    self.store.save(&checkpoint).await?;
                    return Ok(RunOutcome {
                        status: RunStatus::Failed { error: info },
                        state,
                    });
                }
            }

            if current == NodeId::Coder && self.cap_reached(&state) {
                return self.fail_with_cap(state).await;
            }

            previous = Some(current);
            match self.workflow.select_next(current, &state)? {
                Some(next) => {
                    let checkpoint =
                        Checkpoint::new(CheckpointStatus::Running, Some(next), state.clone());
                    self.store.save(&checkpoint).await?;
                    current = next;
                }
                None => {
                    state.stage = Stage::Done;
                    let checkpoint =
                        Checkpoint::new(CheckpointStatus::Completed, None, state.clone());
                    self.store.save(&checkpoint).await?;
                    tracing::info!(session = %state.session_id, "Workflow completed");
                    return Ok(RunOutcome {
                        status: RunStatus::Completed,
                        state,
                    });
                }
            }
        }
    }

    fn cap_reached(&self, state: &SessionState) -> bool {
        state.iterations >= self.workflow.max_coding_iterations() && has_pending(&state.tasks)
    }

    async fn fail_with_cap(&self, mut state: SessionState) -> Result<RunOutcome> {
        let info = ErrorInfo::iteration_cap(self.workflow.max_coding_iterations());
        tracing::warn!(
            session = %state.session_id,
            iterations = state.iterations,
            "Forcing termination at iteration cap with pending tasks"
        );
        state.last_error = Some(info.clone());
        let checkpoint = Checkpoint::new(CheckpointStatus::Failed, Some(NodeId::Coder), state.clone());
        self.store.save(&checkpoint).await?;
        Ok(RunOutcome {
            status: RunStatus::Failed { error: info },
            state,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
