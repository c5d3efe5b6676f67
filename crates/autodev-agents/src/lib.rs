//! Agent nodes for the AutoDev workflow — the PM, the three PRD reviewers,
//! the architect, and the coder — plus the factory that wires them into a
//! ready-to-run engine.

pub mod architect;
pub mod coder;
pub mod planner;
pub mod prompts;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;

use autodev_engine::{CheckpointStore, NodeRegistry, Settings, Workflow, WorkflowEngine};
use autodev_llm::LlmClient;
use autodev_types::ReviewRole;
use autodev_worker::CodeWorker;

pub use architect::ArchitectNode;
pub use coder::CoderNode;
pub use planner::{PmDraftNode, PmReviseNode, ReviewerNode};

/// Shared handles the agent nodes need: the LLM client for planners, the
/// worker for the coder, and the resolved settings.
pub struct AgentContext {
    pub llm: LlmClient,
    pub worker: Arc<dyn CodeWorker>,
    pub settings: Settings,
}

/// Register every workflow node against a shared context.
pub fn build_registry(ctx: Arc<AgentContext>, batch_coding: bool) -> NodeRegistry {
    let mut registry = NodeRegistry::new();
    registry.register(PmDraftNode::new(ctx.clone()));
    registry.register(ReviewerNode::new(ctx.clone(), ReviewRole::Pm));
    registry.register(ReviewerNode::new(ctx.clone(), ReviewRole::Dev));
    registry.register(ReviewerNode::new(ctx.clone(), ReviewRole::Qa));
    registry.register(PmReviseNode::new(ctx.clone()));
    registry.register(ArchitectNode::new(ctx.clone()));
    if batch_coding {
        registry.register(CoderNode::batch(ctx));
    } else {
        registry.register(CoderNode::new(ctx));
    }
    registry
}

/// Assemble the engine for the standard AutoDev workflow. Interrupt markers
/// are always wired; whether they fire is decided per session by
/// `SessionState::human_in_loop`.
pub fn build_engine(ctx: Arc<AgentContext>, batch_coding: bool) -> WorkflowEngine {
    let workflow = Workflow::standard(true, ctx.settings.max_coding_iterations);
    let store = CheckpointStore::new(ctx.settings.checkpoints_dir());
    WorkflowEngine::new(build_registry(ctx, batch_coding), workflow, store)
}

// ---------------------------------------------------------------------------
// End-to-end tests (scripted LLM + scripted worker)
// ---------------------------------------------------------------------------
