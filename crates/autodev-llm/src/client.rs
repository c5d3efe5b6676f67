use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use autodev_types::{AutodevError, Result};

use crate::{DynProvider, ProviderAdapter, Request, Response};

// ---------------------------------------------------------------------------
// Middleware
// ---------------------------------------------------------------------------

pub trait Middleware: Send + Sync {
    fn before(&self, _request: &mut Request) {}
    fn after(&self, _request: &Request, _response: &mut Response) {}
}

// ---------------------------------------------------------------------------
// Built-in middleware: LoggingMiddleware
// ---------------------------------------------------------------------------

pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn before(&self, request: &mut Request) {
        tracing::info!(
            model = %request.model,
            messages = request.messages.len(),
            "LLM request"
        );
    }

    fn after(&self, _request: &Request, response: &mut Response) {
        tracing::info!(
            model = %response.model,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            finish = ?response.finish_reason,
            "LLM response"
        );
    }
}

// ---------------------------------------------------------------------------
// Built-in middleware: TokenAccounting
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct TokenAccounting {
    total_input: Arc<AtomicU64>,
    total_output: Arc<AtomicU64>,
}

impl TokenAccounting {
    pub fn new() -> Self {
        Self {
            total_input: Arc::new(AtomicU64::new(0)),
            total_output: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn total_input_tokens(&self) -> u64 {
        self.total_input.load(Ordering::Relaxed)
    }

    pub fn total_output_tokens(&self) -> u64 {
        self.total_output.load(Ordering::Relaxed)
    }
}

impl Default for TokenAccounting {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for TokenAccounting {
    fn after(&self, _request: &Request, response: &mut Response) {
        self.total_input
            .fetch_add(response.usage.input_tokens, Ordering::Relaxed);
        self.total_output
            .fetch_add(response.usage.output_tokens, Ordering::Relaxed);
    }
}

// ---------------------------------------------------------------------------
// LlmClient
// ---------------------------------------------------------------------------

pub struct LlmClient {
    provider: Option<DynProvider>,
    middleware: Vec<Box<dyn Middleware>>,
}

impl LlmClient {
    pub fn new() -> Self {
        Self {
            provider: None,
            middleware: Vec::new(),
        }
    }

    pub fn with_provider(mut self, provider: impl ProviderAdapter + 'static) -> Self {
        self.provider = Some(DynProvider::new(provider));
        self
    }

    pub fn with_middleware(mut self, m: impl Middleware + 'static) -> Self {
        self.middleware.push(Box::new(m));
        self
    }

    /// Create from environment variables (`ANTHROPIC_API_KEY`, optional
    /// `ANTHROPIC_BASE_URL`), with request/response logging attached.
    pub fn from_env() -> Result<Self> {
        let adapter = crate::AnthropicAdapter::from_env()?;
        Ok(Self::new()
            .with_provider(adapter)
            .with_middleware(LoggingMiddleware))
    }

    pub async fn complete(&self, request: &Request) -> Result<Response> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| AutodevError::Config("No LLM provider configured".into()))?;

        let mut req = request.clone();
        for m in &self.middleware {
            m.before(&mut req);
        }

        let mut resp = provider.complete(&req).await?;

        for m in &self.middleware {
            m.after(&req, &mut resp);
        }

        Ok(resp)
    }
}

impl Default for LlmClient {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
