//! Structured results an oracle call can hand back to the engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use world_model::{AgentId, TokenUsageSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionDecision {
    pub action: String,
    pub arguments: serde_json::Value,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseDecision {
    pub should_respond: bool,
    pub response: Option<String>,
    pub reasoning: String,
    /// Oracle-suggested deltas the manager merges into the peer relationship.
    #[serde(default)]
    pub sentiment_delta: i32,
    #[serde(default)]
    pub trust_delta: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub model: String,
    pub provider: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost: f64,
    pub source: TokenUsageSource,
    pub agent_id: Option<AgentId>,
    pub source_event_id: Option<String>,
}

/// Returned alongside a decision so the core can forward it to the
/// token-usage log without the oracle needing to know about persistence.
#[derive(Debug, Clone)]
pub struct OracleResult<T> {
    pub value: T,
    pub usage: Option<TokenUsage>,
}

impl<T> OracleResult<T> {
    pub fn new(value: T, usage: Option<TokenUsage>) -> Self {
        Self { value, usage }
    }
}

/// Non-fatal by contract: every caller treats this as "agent is a no-op
/// this cycle" and emits `ai:error`, never aborts the tick.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("oracle call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("oracle returned a malformed tool call: {0}")]
    MalformedToolCall(String),

    #[error("oracle transport error: {0}")]
    Transport(String),
}
