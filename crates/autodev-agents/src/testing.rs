//! Shared test doubles: a scripted LLM provider and scripted/null workers.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use autodev_engine::Settings;
use autodev_llm::{FinishReason, LlmClient, ProviderAdapter, Request, Response, Usage};
use autodev_types::{AutodevError, Result};
use autodev_worker::{CodeWorker, WorkerOutcome, WorkerRequest};

use crate::AgentContext;

// ---------------------------------------------------------------------------
// ScriptedProvider
// ---------------------------------------------------------------------------

pub(crate) struct ScriptedProvider {
    responses: Mutex<VecDeque<String>>,
}

impl ScriptedProvider {
    pub(crate) fn new(responses: Vec<&str>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().map(String::from).collect()),
        }
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedProvider {
    async fn complete(&self, request: &Request) -> Result<Response> {
        let text = self
            .responses
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| AutodevError::Provider {
                status: 0,
                message: "scripted provider exhausted".into(),
                retryable: false,
            })?;
        Ok(Response {
            id: "scripted".into(),
            text,
            usage: Usage::default(),
            model: request.model.clone(),
            finish_reason: FinishReason::EndTurn,
        })
    }

    fn name(&self) -> &str {
        "scripted"
    }

    fn default_model(&self) -> &str {
        "scripted-model"
    }

    fn context_window_size(&self) -> usize {
        200_000
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

/// For planner tests: any worker invocation is a bug.
pub(crate) struct NullWorker;

#[async_trait]
impl CodeWorker for NullWorker {
    async fn run(&self, _request: &WorkerRequest) -> Result<WorkerOutcome> {
        Err(AutodevError::Worker("unexpected worker invocation".into()))
    }
}

/// Plays back a fixed sequence of outcomes, recording every request.
pub(crate) struct ScriptedWorker {
    outcomes: Mutex<VecDeque<WorkerOutcome>>,
    requests: Mutex<Vec<WorkerRequest>>,
}

impl ScriptedWorker {
    pub(crate) fn with(outcomes: Vec<WorkerOutcome>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn requests(&self) -> Vec<WorkerRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CodeWorker for ScriptedWorker {
    async fn run(&self, request: &WorkerRequest) -> Result<WorkerOutcome> {
        self.requests.lock().unwrap().push(request.clone());
        Ok(self
            .outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(ok_outcome))
    }
}

pub(crate) fn ok_outcome() -> WorkerOutcome {
    WorkerOutcome {
        success: true,
        stdout: "Task completed. Wrote the requested files.".into(),
        stderr: String::new(),
        exit_code: 0,
        elapsed: 0.05,
        reason: None,
    }
}

pub(crate) fn fail_outcome(reason: &str) -> WorkerOutcome {
    WorkerOutcome {
        success: false,
        stdout: String::new(),
        stderr: String::new(),
        exit_code: 1,
        elapsed: 0.05,
        reason: Some(reason.to_string()),
    }
}

// ---------------------------------------------------------------------------
// Context builders
// ---------------------------------------------------------------------------

pub(crate) fn scripted_context(
    responses: Vec<&str>,
    worker: Arc<dyn CodeWorker>,
) -> Arc<AgentContext> {
    scripted_context_with(Settings::default(), responses, worker)
}

pub(crate) fn scripted_context_with(
    settings: Settings,
    responses: Vec<&str>,
    worker: Arc<dyn CodeWorker>,
) -> Arc<AgentContext> {
    let llm = LlmClient::new().with_provider(ScriptedProvider::new(responses));
    Arc::new(AgentContext {
        llm,
        worker,
        settings,
    })
}
