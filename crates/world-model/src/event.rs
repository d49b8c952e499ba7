//! Game events: the atomic, append-only units of world history.
//!
//! Unlike a single dynamically-typed `data` blob, every [`EventType`] carries
//! its own [`EventData`] variant with the fields that type actually needs.
//! Formatters and the propagator switch on the tag instead of probing an
//! untyped map. The persisted form still round-trips through `serde_json`
//! as a single JSON blob per the repository boundary.

use serde::{Deserialize, Serialize};

use crate::ids::{CharacterId, EventId, RoomId};

/// Closed set of event categories. New categories require a matching
/// [`EventData`] variant, a propagation range entry, and a formatter arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Say,
    Shout,
    Tell,
    Whisper,
    Emote,
    Movement,
    PlayerEntered,
    PlayerLeft,
    RoomDescription,
    CombatStart,
    CombatHit,
    Death,
    ItemPickup,
    ItemDrop,
    ItemEquip,
    System,
    Ambient,
    Connection,
    StateChange,
    AiDecision,
    AiAction,
    AiError,
}

impl EventType {
    /// BFS hop range used by the propagator's recipient computation.
    /// `movement` is handled as a special case by the propagator itself
    /// (origin and destination both receive it regardless of this value).
    pub fn range(&self) -> u32 {
        match self {
            EventType::Shout | EventType::CombatStart | EventType::Death => 2,
            EventType::System
            | EventType::Connection
            | EventType::StateChange
            | EventType::AiDecision
            | EventType::AiAction
            | EventType::AiError => 0,
            _ => 0,
        }
    }

    /// `ai:*` events never reach players or AI perception queues; admin mirror only.
    pub fn is_admin_only(&self) -> bool {
        matches!(self, EventType::AiDecision | EventType::AiAction | EventType::AiError)
    }

    /// Events delivered per-actor with no room-graph propagation at all.
    pub fn is_actor_scoped(&self) -> bool {
        matches!(self, EventType::System | EventType::Connection | EventType::StateChange)
    }
}

/// Who may see an event, independent of spatial range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    Room,
    Global,
    Private,
}

/// Typed payload for a [`GameEvent`], one variant per [`EventType`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventData {
    Say {
        actor_id: CharacterId,
        message: String,
    },
    Shout {
        actor_id: CharacterId,
        message: String,
    },
    Tell {
        actor_id: CharacterId,
        target_id: CharacterId,
        message: String,
    },
    Whisper {
        actor_id: CharacterId,
        target_id: CharacterId,
        message: String,
    },
    Emote {
        actor_id: CharacterId,
        action: String,
    },
    Movement {
        actor_id: CharacterId,
        from_room_id: RoomId,
        to_room_id: RoomId,
        direction: String,
    },
    PlayerEntered {
        actor_id: CharacterId,
    },
    PlayerLeft {
        actor_id: CharacterId,
    },
    RoomDescription {
        actor_id: CharacterId,
        room_id: RoomId,
    },
    CombatStart {
        attacker_id: CharacterId,
        target_id: CharacterId,
    },
    CombatHit {
        attacker_id: CharacterId,
        target_id: CharacterId,
        damage: i32,
        target_hp: i32,
        target_max_hp: i32,
    },
    Death {
        victim_id: CharacterId,
        killer_id: Option<CharacterId>,
    },
    ItemPickup {
        actor_id: CharacterId,
        item_id: crate::ids::ItemId,
        item_name: String,
    },
    ItemDrop {
        actor_id: CharacterId,
        item_id: crate::ids::ItemId,
        item_name: String,
    },
    ItemEquip {
        actor_id: CharacterId,
        item_id: crate::ids::ItemId,
        item_name: String,
        equipped: bool,
    },
    System {
        actor_id: Option<CharacterId>,
        message: String,
    },
    Ambient {
        message: String,
    },
    Connection {
        actor_id: CharacterId,
        connected: bool,
    },
    StateChange {
        actor_id: Option<CharacterId>,
        message: String,
    },
    AiDecision {
        agent_id: crate::ids::AgentId,
        reasoning: String,
    },
    AiAction {
        agent_id: crate::ids::AgentId,
        action: String,
        arguments: serde_json::Value,
    },
    AiError {
        agent_id: crate::ids::AgentId,
        message: String,
    },
}

impl EventData {
    /// The actor this event is "about", used to route `visibility == private`
    /// deliveries when no explicit recipient list is attached.
    pub fn actor_id(&self) -> Option<CharacterId> {
        match self {
            EventData::Say { actor_id, .. }
            | EventData::Shout { actor_id, .. }
            | EventData::Tell { actor_id, .. }
            | EventData::Whisper { actor_id, .. }
            | EventData::Emote { actor_id, .. }
            | EventData::Movement { actor_id, .. }
            | EventData::PlayerEntered { actor_id }
            | EventData::PlayerLeft { actor_id }
            | EventData::RoomDescription { actor_id, .. }
            | EventData::Connection { actor_id, .. } => Some(*actor_id),
            EventData::System { actor_id, .. } | EventData::StateChange { actor_id, .. } => {
                *actor_id
            }
            _ => None,
        }
    }
}

/// A complete, persisted world event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub timestamp: u64,
    pub origin_room_id: RoomId,
    pub visibility: Visibility,
    /// Set by the propagator when a recipient received a distance-weakened
    /// rewrite of this event rather than the original.
    pub attenuated: bool,
    pub content: Option<String>,
    pub data: EventData,
    pub related_entities: Vec<String>,
    /// Explicit recipient override for private events that aren't purely
    /// actor-scoped (e.g. a whisper's target).
    pub recipients: Vec<CharacterId>,
}

impl GameEvent {
    pub fn builder(event_type: EventType, origin_room_id: RoomId, data: EventData) -> EventBuilder {
        EventBuilder::new(event_type, origin_room_id, data)
    }
}

/// Fluent constructor for a [`GameEvent`]; fields without an explicit
/// setter take their `Default`.
pub struct EventBuilder {
    id: Option<EventId>,
    event_type: EventType,
    timestamp: u64,
    origin_room_id: RoomId,
    visibility: Visibility,
    content: Option<String>,
    data: EventData,
    related_entities: Vec<String>,
    recipients: Vec<CharacterId>,
}

impl EventBuilder {
    pub fn new(event_type: EventType, origin_room_id: RoomId, data: EventData) -> Self {
        Self {
            id: None,
            event_type,
            timestamp: 0,
            origin_room_id,
            visibility: Visibility::Room,
            content: None,
            data,
            related_entities: Vec::new(),
            recipients: Vec::new(),
        }
    }

    pub fn id(mut self, id: EventId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn timestamp(mut self, tick: u64) -> Self {
        self.timestamp = tick;
        self
    }

    pub fn visibility(mut self, visibility: Visibility) -> Self {
        self.visibility = visibility;
        self
    }

    pub fn content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    pub fn related(mut self, entities: Vec<String>) -> Self {
        self.related_entities = entities;
        self
    }

    pub fn recipients(mut self, recipients: Vec<CharacterId>) -> Self {
        self.recipients = recipients;
        self
    }

    pub fn build(self) -> GameEvent {
        GameEvent {
            id: self.id.unwrap_or_else(|| EventId::from_sequence(0)),
            event_type: self.event_type,
            timestamp: self.timestamp,
            origin_room_id: self.origin_room_id,
            visibility: self.visibility,
            attenuated: false,
            content: self.content,
            data: self.data,
            related_entities: self.related_entities,
            recipients: self.recipients,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shout_has_two_hop_range_and_movement_has_zero() {
        assert_eq!(EventType::Shout.range(), 2);
        assert_eq!(EventType::Movement.range(), 0);
        assert_eq!(EventType::Death.range(), 2);
    }

    #[test]
    fn ai_events_are_admin_only() {
        assert!(EventType::AiDecision.is_admin_only());
        assert!(!EventType::Say.is_admin_only());
    }

    #[test]
    fn event_data_exposes_its_actor() {
        let actor = CharacterId::new();
        let data = EventData::Shout {
            actor_id: actor,
            message: "hello".into(),
        };
        assert_eq!(data.actor_id(), Some(actor));

        let ambient = EventData::Ambient { message: "wind".into() };
        assert_eq!(ambient.actor_id(), None);
    }

    #[test]
    fn builder_round_trips_through_json() {
        let room = RoomId::new();
        let actor = CharacterId::new();
        let event = GameEvent::builder(
            EventType::Shout,
            room,
            EventData::Shout { actor_id: actor, message: "HELLO".into() },
        )
        .id(EventId::from_sequence(1))
        .timestamp(42)
        .visibility(Visibility::Room)
        .build();

        let json = serde_json::to_string(&event).unwrap();
        let parsed: GameEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.id.0, "evt_00000001");
        assert_eq!(parsed.timestamp, 42);
    }
}
