//! Unified LLM client for the AutoDev planner agents.
//!
//! One provider adapter (Anthropic Messages API) behind a trait seam so the
//! planner nodes can be exercised against a mock in tests.

pub mod anthropic;
pub mod client;
pub mod provider;
pub mod types;

pub use anthropic::AnthropicAdapter;
pub use client::{LlmClient, LoggingMiddleware, Middleware, TokenAccounting};
pub use provider::{DynProvider, ProviderAdapter};
pub use types::{FinishReason, Message, Request, Response, Role, Usage};
