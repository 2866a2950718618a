//! LLM integration module.
//!
//! Provides an OpenAI-compatible chat client used by the answer check.

mod client;

pub use client::{LlmClient, LlmResponse, Message, Role, TokenUsage};

use crate::error::Result;
use async_trait::async_trait;

/// Source of text completions.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Complete a single user message with an optional system prompt.
    async fn complete(&self, system: Option<&str>, user: &str) -> Result<String>;
}
