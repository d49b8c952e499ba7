//! Domain entities as plain, repository-agnostic data.
//!
//! No entity holds an owning reference to another: characters point at
//! rooms by [`RoomId`], agents point at characters by [`CharacterId`], and
//! so on. Callers resolve the reference through a store. This mirrors the
//! teacher's `Agent`/`Location` split (`components/agent.rs`,
//! `components/world.rs`), generalized away from ECS component storage to
//! plain structs a repository can load and save whole.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::{AccountId, AgentId, CharacterId, ItemId, RoomId};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
    pub created_at: i64,
    pub preferences: serde_json::Value,
}

impl Account {
    pub fn new(username: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: AccountId::new(),
            username: username.into(),
            created_at,
            preferences: serde_json::Value::Object(Default::default()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Character {
    pub id: CharacterId,
    pub name: String,
    pub description: Option<String>,
    /// `None` for an NPC; `Some` for a player-owned character.
    pub account_id: Option<AccountId>,
    pub current_room_id: RoomId,
    pub spawn_point_id: Option<ItemId>,
    pub hp: i32,
    pub max_hp: i32,
    pub attack: i32,
    pub defense: i32,
    pub speed: i32,
    pub is_alive: bool,
    pub is_dead: bool,
    pub died_at: Option<i64>,
    pub last_action_at: i64,
    pub created_at: i64,
}

impl Character {
    pub fn new_npc(name: impl Into<String>, room_id: RoomId, created_at: i64) -> Self {
        Self {
            id: CharacterId::new(),
            name: name.into(),
            description: None,
            account_id: None,
            current_room_id: room_id,
            spawn_point_id: None,
            hp: 20,
            max_hp: 20,
            attack: 10,
            defense: 5,
            speed: 10,
            is_alive: true,
            is_dead: false,
            died_at: None,
            last_action_at: created_at,
            created_at,
        }
    }

    pub fn new_player(
        name: impl Into<String>,
        account_id: AccountId,
        room_id: RoomId,
        created_at: i64,
    ) -> Self {
        let mut character = Self::new_npc(name, room_id, created_at);
        character.account_id = Some(account_id);
        character
    }

    pub fn is_npc(&self) -> bool {
        self.account_id.is_none()
    }

    /// Applies damage and flips the alive/dead flags if it proves fatal.
    /// Returns `true` if this call caused death.
    pub fn apply_damage(&mut self, damage: i32, now: i64) -> bool {
        self.hp = (self.hp - damage).max(0);
        if self.hp == 0 && self.is_alive {
            self.is_alive = false;
            self.is_dead = true;
            self.died_at = Some(now);
            return true;
        }
        false
    }

    /// `attack = 10 + Σ weapon.damage`, `defense = 5 + Σ armor.defense`,
    /// recomputed from the set of currently equipped items.
    pub fn recompute_stats(&mut self, equipped: &[&Item]) {
        let bonus_attack: i32 = equipped
            .iter()
            .filter_map(|item| item.stats.damage)
            .sum();
        let bonus_defense: i32 = equipped
            .iter()
            .filter_map(|item| item.stats.defense)
            .sum();
        self.attack = 10 + bonus_attack;
        self.defense = 5 + bonus_defense;
    }

    /// The health-word bucket used by `examine`.
    pub fn health_word(&self) -> &'static str {
        if self.is_dead {
            return "dead";
        }
        let ratio = self.hp as f64 / self.max_hp.max(1) as f64;
        match ratio {
            r if r >= 1.0 => "perfect",
            r if r >= 0.75 => "slightly scratched",
            r if r >= 0.5 => "wounded",
            r if r >= 0.25 => "badly wounded",
            _ => "near death",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    pub description: String,
    /// direction label (e.g. "north") -> destination room.
    pub exits: HashMap<String, RoomId>,
    pub is_starting: bool,
}

impl Room {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: RoomId::new(),
            name: name.into(),
            description: description.into(),
            exits: HashMap::new(),
            is_starting: false,
        }
    }

    pub fn exit_toward(&self, direction: &str) -> Option<RoomId> {
        self.exits.get(&direction.to_ascii_lowercase()).copied()
    }

    /// Direction this room calls `neighbour`, if any. Used by the formatter
    /// and flee logic when only the target room is known.
    pub fn direction_toward(&self, neighbour: RoomId) -> Option<&str> {
        self.exits
            .iter()
            .find(|(_, id)| **id == neighbour)
            .map(|(direction, _)| direction.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Weapon,
    Armor,
    Consumable,
    SpawnPoint,
    Misc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemLocation {
    Room(RoomId),
    Character(CharacterId),
    None,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ItemStats {
    pub damage: Option<i32>,
    pub defense: Option<i32>,
    pub healing: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub description: String,
    pub item_type: ItemType,
    pub stats: ItemStats,
    pub location: ItemLocation,
    pub is_equipped: bool,
}

impl Item {
    pub fn new(name: impl Into<String>, description: impl Into<String>, item_type: ItemType) -> Self {
        Self {
            id: ItemId::new(),
            name: name.into(),
            description: description.into(),
            item_type,
            stats: ItemStats::default(),
            location: ItemLocation::None,
            is_equipped: false,
        }
    }

    pub fn is_takeable(&self) -> bool {
        self.item_type != ItemType::SpawnPoint
    }
}

/// Per-peer relationship state an AI agent tracks for a name it has met.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Relationship {
    pub sentiment: i32,
    pub trust: i32,
    pub familiarity: i32,
    pub last_seen: i64,
    pub role: String,
}

impl Relationship {
    pub fn new(now: i64) -> Self {
        Self {
            sentiment: 0,
            trust: 0,
            familiarity: 0,
            last_seen: now,
            role: String::new(),
        }
    }

    pub fn clamp(&mut self) {
        self.sentiment = self.sentiment.clamp(-10, 10);
        self.trust = self.trust.clamp(0, 10);
        self.familiarity = self.familiarity.max(0);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub speaker: String,
    pub message: String,
    pub timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiAgentRecord {
    pub id: AgentId,
    pub character_id: CharacterId,
    pub system_prompt: String,
    pub home_room_id: RoomId,
    pub max_rooms_from_home: u32,
    pub spatial_memory: Option<String>,
    pub spatial_memory_updated_at: Option<i64>,
    pub relationships: HashMap<String, Relationship>,
    pub conversation_history: Vec<ConversationTurn>,
    pub last_action_at: i64,
}

impl AiAgentRecord {
    pub fn new(character_id: CharacterId, home_room_id: RoomId, system_prompt: impl Into<String>, now: i64) -> Self {
        Self {
            id: AgentId::new(),
            character_id,
            system_prompt: system_prompt.into(),
            home_room_id,
            max_rooms_from_home: 5,
            spatial_memory: None,
            spatial_memory_updated_at: None,
            relationships: HashMap::new(),
            conversation_history: Vec::new(),
            last_action_at: now,
        }
    }

    /// Bounded append; keeps only the last 20 turns per the conversation contract.
    pub fn push_turn(&mut self, turn: ConversationTurn) {
        self.conversation_history.push(turn);
        let len = self.conversation_history.len();
        if len > 20 {
            self.conversation_history.drain(0..len - 20);
        }
    }

    /// Forces the next spatial-memory refresh pass to treat this agent as stale.
    pub fn force_spatial_memory_refresh(&mut self) {
        self.spatial_memory_updated_at = Some(0);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUsageSource {
    Conversation,
    Decision,
    DecisionResponse,
    SpatialMemory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsageLog {
    pub id: String,
    pub model: String,
    pub provider: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    pub cost: f64,
    pub source: TokenUsageSource,
    pub agent_id: Option<AgentId>,
    pub source_event_id: Option<String>,
    pub created_at: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerLogKind {
    Command,
    Output,
    Event,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLogEntry {
    pub character_id: CharacterId,
    pub kind: PlayerLogKind,
    pub payload: serde_json::Value,
    pub timestamp: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn damage_to_zero_flips_alive_flags_once() {
        let room = RoomId::new();
        let mut character = Character::new_npc("Rat", room, 0);
        character.hp = 5;
        assert!(character.apply_damage(10, 100));
        assert!(!character.is_alive);
        assert!(character.is_dead);
        assert_eq!(character.died_at, Some(100));
        // Already dead: a second call must not re-trigger death bookkeeping.
        assert!(!character.apply_damage(1, 200));
        assert_eq!(character.died_at, Some(100));
    }

    #[test]
    fn health_word_buckets() {
        let room = RoomId::new();
        let mut character = Character::new_npc("Rat", room, 0);
        character.max_hp = 20;
        character.hp = 20;
        assert_eq!(character.health_word(), "perfect");
        character.hp = 14;
        assert_eq!(character.health_word(), "slightly scratched");
        character.hp = 9;
        assert_eq!(character.health_word(), "wounded");
        character.hp = 4;
        assert_eq!(character.health_word(), "badly wounded");
        character.hp = 1;
        assert_eq!(character.health_word(), "near death");
    }

    #[test]
    fn recompute_stats_sums_equipped_bonuses() {
        let room = RoomId::new();
        let mut character = Character::new_npc("Hero", room, 0);
        let mut sword = Item::new("Sword", "sharp", ItemType::Weapon);
        sword.stats.damage = Some(7);
        let mut shield = Item::new("Shield", "sturdy", ItemType::Armor);
        shield.stats.defense = Some(3);
        character.recompute_stats(&[&sword, &shield]);
        assert_eq!(character.attack, 17);
        assert_eq!(character.defense, 8);
    }

    #[test]
    fn spawn_point_items_are_not_takeable() {
        let item = Item::new("Obelisk", "a glowing stone", ItemType::SpawnPoint);
        assert!(!item.is_takeable());
    }
}
