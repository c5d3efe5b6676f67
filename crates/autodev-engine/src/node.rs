//! Node trait, node identifiers, and the registry the engine dispatches through.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use autodev_types::{Result, SessionState, Stage, StatePatch};

// ---------------------------------------------------------------------------
// NodeId
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeId {
    PmDraft,
    ReviewPm,
    ReviewDev,
    ReviewQa,
    PmRevise,
    Architect,
    Coder,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeId::PmDraft => "pm_draft",
            NodeId::ReviewPm => "review_pm",
            NodeId::ReviewDev => "review_dev",
            NodeId::ReviewQa => "review_qa",
            NodeId::PmRevise => "pm_revise",
            NodeId::Architect => "architect",
            NodeId::Coder => "coder",
        }
    }

    /// The workflow stage a session is in while this node is about to run.
    pub fn stage(&self) -> Stage {
        match self {
            NodeId::PmDraft => Stage::PmDraft,
            NodeId::ReviewPm | NodeId::ReviewDev | NodeId::ReviewQa => Stage::PmReview,
            NodeId::PmRevise => Stage::PmRevise,
            NodeId::Architect => Stage::Architect,
            NodeId::Coder => Stage::Coding,
        }
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// WorkflowNode trait
// ---------------------------------------------------------------------------

#[async_trait]
pub trait WorkflowNode: Send + Sync {
    fn id(&self) -> NodeId;

    /// Execute this node against the current state, returning a partial
    /// update. Artifact writes happen inside the node, before it returns.
    async fn run(&self, state: &SessionState) -> Result<StatePatch>;
}

// ---------------------------------------------------------------------------
// NodeRegistry
// ---------------------------------------------------------------------------

pub struct NodeRegistry {
    nodes: HashMap<NodeId, Box<dyn WorkflowNode>>,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
        }
    }

    pub fn register(&mut self, node: impl WorkflowNode + 'static) {
        self.nodes.insert(node.id(), Box::new(node));
    }

    pub fn get(&self, id: NodeId) -> Option<&dyn WorkflowNode> {
        self.nodes.get(&id).map(|n| n.as_ref())
    }

    pub fn has(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }
}

impl Default for NodeRegistry {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
