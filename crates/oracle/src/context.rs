//! Context assembled for an oracle call.
//!
//! The AI Agent Manager builds one of these per decision point; the oracle
//! implementation is free to render it into whatever prompt format its
//! backing model expects. Nothing here names a vendor or wire format.

use serde::{Deserialize, Serialize};
use world_model::{AgentId, CharacterId, RoomId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdjacencyInfo {
    pub direction: String,
    pub room_id: RoomId,
    pub room_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationshipInfo {
    pub peer_name: String,
    pub sentiment: i32,
    pub trust: i32,
    pub familiarity: i32,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomContext {
    pub room_id: RoomId,
    pub room_name: String,
    pub room_description: String,
    pub characters_present: Vec<String>,
    pub items_present: Vec<String>,
}

/// Everything the proactive loop gathers before asking the oracle to decide.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionContext {
    pub agent_id: AgentId,
    pub character_id: CharacterId,
    pub system_prompt: String,
    pub agent_name: String,
    /// Pre-rendered event lines the agent has perceived since its last action.
    pub formatted_events: Vec<String>,
    pub adjacencies: Vec<AdjacencyInfo>,
    pub relationships: Vec<RelationshipInfo>,
    pub time_since_last_action_secs: f64,
    pub room_context: RoomContext,
    pub spatial_memory: Option<String>,
    /// The verbs the dispatcher understands; the oracle must choose from these.
    pub available_commands: Vec<String>,
}

/// Context for a direct conversational prompt (`decide_response`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationContext {
    pub agent_id: AgentId,
    pub system_prompt: String,
    pub agent_name: String,
    pub speaker_name: String,
    pub message: String,
    pub conversation_history: Vec<String>,
    pub relationship: Option<RelationshipInfo>,
}
