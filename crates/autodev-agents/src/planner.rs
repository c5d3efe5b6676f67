//! Planner nodes backed by the LLM: PM draft, the three PRD reviewers, and PM
//! revision.
//!
//! Each node is a stateless function of the session state: build a prompt from
//! its declared inputs, call the model, write the artifact, return a patch.

use async_trait::async_trait;
use std::sync::Arc;

use autodev_engine::{artifacts, NodeId, Workspace, WorkflowNode};
use autodev_llm::{Message, Request};
use autodev_types::{AutodevError, Result, ReviewRole, SessionState, StatePatch};

use crate::prompts;
use crate::AgentContext;

/// Call the LLM and insist on non-empty output.
pub(crate) async fn complete_text(
    ctx: &AgentContext,
    agent: &str,
    model: &str,
    system: &str,
    prompt: String,
) -> Result<String> {
    let request = Request::new(model, vec![Message::system(system), Message::user(prompt)]);
    let response = ctx.llm.complete(&request).await?;
    let text = response.text.trim().to_string();
    if text.is_empty() {
        return Err(AutodevError::EmptyOutput {
            agent: agent.to_string(),
        });
    }
    Ok(text)
}

// ---------------------------------------------------------------------------
// PmDraftNode
// ---------------------------------------------------------------------------

pub struct PmDraftNode {
    ctx: Arc<AgentContext>,
}

impl PmDraftNode {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl WorkflowNode for PmDraftNode {
    fn id(&self) -> NodeId {
        NodeId::PmDraft
    }

    async fn run(&self, state: &SessionState) -> Result<StatePatch> {
        let prompt = prompts::pm_draft_prompt(&state.requirement, state.feedback.as_deref());
        let text = complete_text(
            &self.ctx,
            "pm_draft",
            &self.ctx.settings.pm_model,
            prompts::PM_SYSTEM,
            prompt,
        )
        .await?;

        let workspace = Workspace::open(&state.workspace_path);
        let prd_path = workspace.write_text(artifacts::PRD, &text).await?;
        tracing::info!(session = %state.session_id, path = %prd_path.display(), "PRD drafted");

        Ok(StatePatch {
            prd_path: Some(prd_path),
            clear_feedback: state.feedback.is_some(),
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// ReviewerNode
// ---------------------------------------------------------------------------

pub struct ReviewerNode {
    ctx: Arc<AgentContext>,
    role: ReviewRole,
}

impl ReviewerNode {
    pub fn new(ctx: Arc<AgentContext>, role: ReviewRole) -> Self {
        Self { ctx, role }
    }
}

#[async_trait]
impl WorkflowNode for ReviewerNode {
    fn id(&self) -> NodeId {
        match self.role {
            ReviewRole::Pm => NodeId::ReviewPm,
            ReviewRole::Dev => NodeId::ReviewDev,
            ReviewRole::Qa => NodeId::ReviewQa,
        }
    }

    async fn run(&self, state: &SessionState) -> Result<StatePatch> {
        let workspace = Workspace::open(&state.workspace_path);
        let prd = workspace.read_text(artifacts::PRD).await?;

        let agent = format!("review_{}", self.role);
        let text = complete_text(
            &self.ctx,
            &agent,
            &self.ctx.settings.pm_model,
            prompts::reviewer_system(self.role),
            prompts::reviewer_prompt(self.role, &prd),
        )
        .await?;

        tracing::info!(session = %state.session_id, role = %self.role, "PRD review produced");
        Ok(StatePatch::review(self.role, text))
    }
}

// ---------------------------------------------------------------------------
// PmReviseNode
// ---------------------------------------------------------------------------

pub struct PmReviseNode {
    ctx: Arc<AgentContext>,
}

impl PmReviseNode {
    pub fn new(ctx: Arc<AgentContext>) -> Self {
        Self { ctx }
    }
}

#[async_trait]
impl WorkflowNode for PmReviseNode {
    fn id(&self) -> NodeId {
        NodeId::PmRevise
    }

    async fn run(&self, state: &SessionState) -> Result<StatePatch> {
        let workspace = Workspace::open(&state.workspace_path);
        let prd = workspace.read_text(artifacts::PRD).await?;

        let prompt = prompts::pm_revision_prompt(
            &state.requirement,
            &prd,
            &state.reviews,
            state.feedback.as_deref(),
        );
        let text = complete_text(
            &self.ctx,
            "pm_revise",
            &self.ctx.settings.pm_model,
            prompts::PM_SYSTEM,
            prompt,
        )
        .await?;

        // Rewrite the PRD in place and keep the reviews as an audit record.
        let prd_path = workspace.write_text(artifacts::PRD, &text).await?;
        let reviews_path = workspace
            .write_text(
                artifacts::PRD_REVIEWS,
                &prompts::format_reviews_file(&state.reviews),
            )
            .await?;
        tracing::info!(session = %state.session_id, path = %prd_path.display(), "PRD revised");

        Ok(StatePatch {
            prd_path: Some(prd_path),
            reviews_path: Some(reviews_path),
            clear_feedback: true,
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
