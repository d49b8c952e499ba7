//! The abstract LLM Oracle boundary.
//!
//! The simulation core never reasons about a specific vendor, HTTP client,
//! or prompt template — it calls this trait and reacts to structured
//! results. Concrete providers (OpenAI-compatible or otherwise) live
//! outside this workspace's scope; only [`NoopOracle`] ships here as a
//! deterministic test double.

use async_trait::async_trait;

use crate::context::{ConversationContext, DecisionContext};
use crate::outcome::{ActionDecision, OracleError, OracleResult, ResponseDecision};

#[async_trait]
pub trait LlmOracle: Send + Sync {
    /// Decides the agent's next proactive action, or `None` for a no-op tick.
    async fn decide_action(
        &self,
        context: &DecisionContext,
    ) -> Result<OracleResult<Option<ActionDecision>>, OracleError>;

    /// Decides whether (and how) an agent responds to a direct address.
    async fn decide_response(
        &self,
        context: &ConversationContext,
    ) -> Result<OracleResult<ResponseDecision>, OracleError>;

    /// Compresses a structured spatial-memory dump into a short navigable
    /// mental-map summary (contract: at most 7 lines).
    async fn summarise_spatial_map(&self, raw_map: &str) -> Result<OracleResult<String>, OracleError>;
}
