//! The fixed AutoDev workflow graph: an edge table with predicate-bearing
//! edges, interrupt-before markers, and the producer map used for feedback
//! routing.

use autodev_types::{next_eligible, AutodevError, Result, ReviewRole, SessionState};

use crate::node::NodeId;

// ---------------------------------------------------------------------------
// Edges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    End,
}

/// Routing predicates; evaluated against the post-node state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutePredicate {
    Always,
    /// Fan-in guard: all three reviewer entries are present.
    AllReviewsPresent,
    /// Coding loop continues: an eligible pending task exists and the
    /// iteration cap has not been reached.
    TasksRemaining,
}

impl RoutePredicate {
    pub fn evaluate(&self, state: &SessionState, max_coding_iterations: u32) -> bool {
        match self {
            RoutePredicate::Always => true,
            RoutePredicate::AllReviewsPresent => ReviewRole::ALL
                .iter()
                .all(|role| state.reviews.contains_key(role)),
            RoutePredicate::TasksRemaining => {
                next_eligible(&state.tasks).is_some() && state.iterations < max_coding_iterations
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Edge {
    pub from: NodeId,
    pub to: Target,
    pub when: RoutePredicate,
}

// ---------------------------------------------------------------------------
// Workflow
// ---------------------------------------------------------------------------

pub struct Workflow {
    entry: NodeId,
    edges: Vec<Edge>,
    interrupt_before: Vec<NodeId>,
    max_coding_iterations: u32,
}

impl Workflow {
    /// The fixed AutoDev graph. Reviewer fan-out is serialized (the three
    /// reviewers patch disjoint keys, so ordering is immaterial) and joins at
    /// `pm_revise` behind the all-reviews-present guard.
    pub fn standard(human_in_loop: bool, max_coding_iterations: u32) -> Self {
        let edges = vec![
            Edge {
                from: NodeId::PmDraft,
                to: Target::Node(NodeId::ReviewPm),
                when: RoutePredicate::Always,
            },
            Edge {
                from: NodeId::ReviewPm,
                to: Target::Node(NodeId::ReviewDev),
                when: RoutePredicate::Always,
            },
            Edge {
                from: NodeId::ReviewDev,
                to: Target::Node(NodeId::ReviewQa),
                when: RoutePredicate::Always,
            },
            Edge {
                from: NodeId::ReviewQa,
                to: Target::Node(NodeId::PmRevise),
                when: RoutePredicate::AllReviewsPresent,
            },
            Edge {
                from: NodeId::PmRevise,
                to: Target::Node(NodeId::Architect),
                when: RoutePredicate::Always,
            },
            Edge {
                from: NodeId::Architect,
                to: Target::Node(NodeId::Coder),
                when: RoutePredicate::Always,
            },
            Edge {
                from: NodeId::Coder,
                to: Target::Node(NodeId::Coder),
                when: RoutePredicate::TasksRemaining,
            },
            Edge {
                from: NodeId::Coder,
                to: Target::End,
                when: RoutePredicate::Always,
            },
        ];

        let interrupt_before = if human_in_loop {
            vec![NodeId::Architect, NodeId::Coder]
        } else {
            Vec::new()
        };

        Self {
            entry: NodeId::PmDraft,
            edges,
            interrupt_before,
            max_coding_iterations,
        }
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn max_coding_iterations(&self) -> u32 {
        self.max_coding_iterations
    }

    pub fn interrupts_before(&self, node: NodeId) -> bool {
        self.interrupt_before.contains(&node)
    }

    /// Select the next node after `from`: edges are evaluated in declaration
    /// order and the first predicate match wins. `Ok(None)` means the run is
    /// terminal.
    pub fn select_next(&self, from: NodeId, state: &SessionState) -> Result<Option<NodeId>> {
        let mut saw_edge = false;
        for edge in self.edges.iter().filter(|e| e.from == from) {
            saw_edge = true;
            if edge.when.evaluate(state, self.max_coding_iterations) {
                return Ok(match edge.to {
                    Target::Node(id) => Some(id),
                    Target::End => None,
                });
            }
        }
        if saw_edge {
            Err(AutodevError::State(format!(
                "No edge out of '{from}' matched the current state"
            )))
        } else {
            Ok(None)
        }
    }
}

/// Producer of the artifact a node consumes. Human feedback on resume always
/// re-enters the producer, not the consumer that was about to run.
pub fn producer_of(node: NodeId) -> Option<NodeId> {
    match node {
        NodeId::Architect => Some(NodeId::PmRevise),
        NodeId::Coder => Some(NodeId::Architect),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use autodev_types::{Task, TaskStatus};

    fn state_with_tasks(tasks: Vec<Task>, iterations: u32) -> SessionState {
        let mut state = SessionState::new("s1", "req", "/tmp/ws/s1");
        state.tasks = tasks;
        state.iterations = iterations;
        state
    }

    fn pending_task(id: &str) -> Task {
        Task::new(id, format!("Task {id}"), "", vec![], 1)
    }

    #[test]
    fn linear_edges_route_forward() {
        let wf = Workflow::standard(false, 50);
        let state = SessionState::new("s1", "req", "/tmp/ws");
        assert_eq!(
            wf.select_next(NodeId::PmDraft, &state).unwrap(),
            Some(NodeId::ReviewPm)
        );
        assert_eq!(
            wf.select_next(NodeId::PmRevise, &state).unwrap(),
            Some(NodeId::Architect)
        );
        assert_eq!(
            wf.select_next(NodeId::Architect, &state).unwrap(),
            Some(NodeId::Coder)
        );
    }

    #[test]
    fn fan_in_requires_all_reviews() {
        let wf = Workflow::standard(false, 50);
        let mut state = SessionState::new("s1", "req", "/tmp/ws");
        state.reviews.insert(ReviewRole::Pm, "ok".into());
        state.reviews.insert(ReviewRole::Dev, "ok".into());

        let err = wf.select_next(NodeId::ReviewQa, &state).unwrap_err();
        assert!(matches!(err, AutodevError::State(_)));

        state.reviews.insert(ReviewRole::Qa, "ok".into());
        assert_eq!(
            wf.select_next(NodeId::ReviewQa, &state).unwrap(),
            Some(NodeId::PmRevise)
        );
    }

    #[test]
    fn coder_loops_while_tasks_remain() {
        let wf = Workflow::standard(false, 50);
        let state = state_with_tasks(vec![pending_task("a")], 1);
        assert_eq!(
            wf.select_next(NodeId::Coder, &state).unwrap(),
            Some(NodeId::Coder)
        );
    }

    #[test]
    fn coder_terminates_when_all_settled() {
        let wf = Workflow::standard(false, 50);
        let mut task = pending_task("a");
        task.status = TaskStatus::Completed;
        let state = state_with_tasks(vec![task], 1);
        assert_eq!(wf.select_next(NodeId::Coder, &state).unwrap(), None);
    }

    #[test]
    fn coder_terminates_at_iteration_cap() {
        let wf = Workflow::standard(false, 2);
        let state = state_with_tasks(vec![pending_task("a"), pending_task("b")], 2);
        // Pending work remains but the cap stops the loop edge.
        assert_eq!(wf.select_next(NodeId::Coder, &state).unwrap(), None);
    }

    #[test]
    fn coder_terminates_when_pending_unreachable() {
        let wf = Workflow::standard(false, 50);
        let mut blocked = pending_task("a");
        blocked.status = TaskStatus::Blocked;
        let dependent = Task::new("b", "Task b", "", vec!["a".into()], 5);
        let state = state_with_tasks(vec![blocked, dependent], 1);
        assert_eq!(wf.select_next(NodeId::Coder, &state).unwrap(), None);
    }

    #[test]
    fn interrupt_markers_follow_human_in_loop() {
        let wf = Workflow::standard(true, 50);
        assert!(wf.interrupts_before(NodeId::Architect));
        assert!(wf.interrupts_before(NodeId::Coder));
        assert!(!wf.interrupts_before(NodeId::PmDraft));

        let wf = Workflow::standard(false, 50);
        assert!(!wf.interrupts_before(NodeId::Architect));
        assert!(!wf.interrupts_before(NodeId::Coder));
    }

    #[test]
    fn producer_map_targets_artifact_producers() {
        assert_eq!(producer_of(NodeId::Architect), Some(NodeId::PmRevise));
        assert_eq!(producer_of(NodeId::Coder), Some(NodeId::Architect));
        assert_eq!(producer_of(NodeId::PmDraft), None);
        assert_eq!(producer_of(NodeId::ReviewDev), None);
    }
}
