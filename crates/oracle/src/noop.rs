//! A deterministic oracle that never acts and never speaks.
//!
//! Useful for engine tests that want to exercise the tick loop, cooldowns,
//! and perception plumbing without depending on any real decision logic.

use async_trait::async_trait;

use crate::context::{ConversationContext, DecisionContext};
use crate::outcome::{ActionDecision, OracleError, OracleResult, ResponseDecision};
use crate::traits::LlmOracle;

#[derive(Debug, Default)]
pub struct NoopOracle;

#[async_trait]
impl LlmOracle for NoopOracle {
    async fn decide_action(
        &self,
        _context: &DecisionContext,
    ) -> Result<OracleResult<Option<ActionDecision>>, OracleError> {
        Ok(OracleResult::new(None, None))
    }

    async fn decide_response(
        &self,
        _context: &ConversationContext,
    ) -> Result<OracleResult<ResponseDecision>, OracleError> {
        Ok(OracleResult::new(
            ResponseDecision {
                should_respond: false,
                response: None,
                reasoning: "noop oracle never responds".to_string(),
                sentiment_delta: 0,
                trust_delta: 0,
            },
            None,
        ))
    }

    async fn summarise_spatial_map(&self, raw_map: &str) -> Result<OracleResult<String>, OracleError> {
        let summary: String = raw_map.lines().take(7).collect::<Vec<_>>().join("\n");
        Ok(OracleResult::new(summary, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_model::{AgentId, CharacterId, RoomId};

    fn sample_context() -> DecisionContext {
        DecisionContext {
            agent_id: AgentId::new(),
            character_id: CharacterId::new(),
            system_prompt: "you are a guard".into(),
            agent_name: "Guard".into(),
            formatted_events: vec![],
            adjacencies: vec![],
            relationships: vec![],
            time_since_last_action_secs: 10.0,
            room_context: crate::context::RoomContext {
                room_id: RoomId::new(),
                room_name: "Gatehouse".into(),
                room_description: "a stone gatehouse".into(),
                characters_present: vec![],
                items_present: vec![],
            },
            spatial_memory: None,
            available_commands: vec!["go".into(), "say".into()],
        }
    }

    #[tokio::test]
    async fn decide_action_is_always_a_no_op() {
        let oracle = NoopOracle::default();
        let result = oracle.decide_action(&sample_context()).await.unwrap();
        assert!(result.value.is_none());
        assert!(result.usage.is_none());
    }

    #[tokio::test]
    async fn summarise_spatial_map_truncates_to_seven_lines() {
        let oracle = NoopOracle::default();
        let raw = (0..20).map(|i| format!("room {i}")).collect::<Vec<_>>().join("\n");
        let result = oracle.summarise_spatial_map(&raw).await.unwrap();
        assert_eq!(result.value.lines().count(), 7);
    }
}
