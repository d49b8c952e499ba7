//! Wire protocol carried over the duplex game socket.
//!
//! Client-to-server and server-to-client messages are both tagged JSON,
//! matching the `#[serde(tag = "type")]` shape the persisted [`world_model::EventData`]
//! already uses. This is the transport the Command Queue and Event
//! Propagator are exercised through.

use serde::{Deserialize, Serialize};
use world_model::{CharacterId, GameEvent};

use sim_engine::dispatcher::StructuredOutput;

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    #[serde(rename = "player:join")]
    PlayerJoin { name: String },
    #[serde(rename = "character:select")]
    CharacterSelect { character_id: CharacterId },
    #[serde(rename = "character:list")]
    CharacterList { username: String },
    #[serde(rename = "character:create")]
    CharacterCreate { username: String, name: String },
    #[serde(rename = "game:command")]
    GameCommand { command: String },
    #[serde(rename = "admin:join")]
    AdminJoin,
    #[serde(rename = "admin:leave")]
    AdminLeave,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    #[serde(rename = "game:event")]
    GameEvent { event: GameEvent, rendered: String },
    #[serde(rename = "game:output")]
    GameOutput { output: StructuredOutput },
    #[serde(rename = "game:error")]
    GameError { message: String },
    #[serde(rename = "game:death")]
    GameDeath { message: String },
    #[serde(rename = "game:disconnect")]
    GameDisconnect { reason: String },
    #[serde(rename = "character:update")]
    CharacterUpdate { hp: i32, max_hp: i32, attack: i32, defense: i32 },
    #[serde(rename = "admin:game-event")]
    AdminGameEvent { event: GameEvent, rendered: String, recipients: Vec<CharacterId> },
    /// Acknowledgement replies for `player:join`/`character:*`; kept
    /// generic rather than a per-message struct since the payload shape
    /// varies by request.
    #[serde(rename = "ack")]
    Ack { request: String, payload: serde_json::Value },
}
