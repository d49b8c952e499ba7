//! Pure domain data for the text-world engine: entity shapes, identifiers,
//! events and the game clock. No I/O, no subsystem behaviour — those live
//! in `sim_engine`.

pub mod clock;
pub mod entities;
pub mod errors;
pub mod event;
pub mod ids;

pub use clock::GameClock;
pub use entities::{
    Account, AiAgentRecord, Character, ConversationTurn, Item, ItemLocation, ItemStats, ItemType,
    PlayerLogEntry, PlayerLogKind, Relationship, Room, TokenUsageLog, TokenUsageSource,
};
pub use errors::DomainError;
pub use event::{EventBuilder, EventData, EventType, GameEvent, Visibility};
pub use ids::{AccountId, AgentId, CharacterId, EventId, ItemId, RoomId};
