//! Persistence boundary.
//!
//! The core never talks to a concrete database. Every mutation and lookup
//! goes through [`WorldStore`], a repository trait the engine is
//! unit-testable against. [`InMemoryWorldStore`] is the reference
//! implementation used by tests and as the engine's working cache; a real
//! backend implements the same trait and is wired in by the `server`
//! crate.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use thiserror::Error;

use world_model::{
    Account, AccountId, AgentId, AiAgentRecord, Character, CharacterId, GameClock, GameEvent, Item,
    ItemId, PlayerLogEntry, Room, RoomId, TokenUsageLog,
};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("no such room: {0}")]
    NoSuchRoom(RoomId),
    #[error("no such character: {0}")]
    NoSuchCharacter(CharacterId),
    #[error("no such item: {0}")]
    NoSuchItem(ItemId),
    #[error("no such agent: {0}")]
    NoSuchAgent(AgentId),
    #[error("no such account: {0}")]
    NoSuchAccount(AccountId),
    #[error("backend error: {0}")]
    Backend(String),
}

/// Abstract repository for every persisted aggregate the engine touches.
///
/// Implementations are assumed to serialise per-entity mutations; callers
/// never hold locks across an `.await` on this trait.
#[async_trait]
pub trait WorldStore: Send + Sync {
    async fn load_rooms(&self) -> Result<Vec<Room>, StoreError>;
    async fn get_room(&self, id: RoomId) -> Result<Room, StoreError>;

    async fn load_characters(&self) -> Result<Vec<Character>, StoreError>;
    async fn get_character(&self, id: CharacterId) -> Result<Character, StoreError>;
    async fn save_character(&self, character: Character) -> Result<(), StoreError>;
    async fn delete_character(&self, id: CharacterId) -> Result<(), StoreError>;

    async fn load_items(&self) -> Result<Vec<Item>, StoreError>;
    async fn save_item(&self, item: Item) -> Result<(), StoreError>;
    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError>;

    async fn load_agents(&self) -> Result<Vec<AiAgentRecord>, StoreError>;
    async fn get_agent(&self, id: AgentId) -> Result<AiAgentRecord, StoreError>;
    async fn save_agent(&self, agent: AiAgentRecord) -> Result<(), StoreError>;

    async fn get_account(&self, username: &str) -> Result<Option<Account>, StoreError>;
    async fn save_account(&self, account: Account) -> Result<(), StoreError>;
    async fn characters_for_account(&self, account_id: AccountId) -> Result<Vec<Character>, StoreError>;

    async fn append_event(&self, event: GameEvent) -> Result<(), StoreError>;
    async fn append_player_log(&self, entry: PlayerLogEntry) -> Result<(), StoreError>;
    async fn append_token_usage(&self, log: TokenUsageLog) -> Result<(), StoreError>;

    async fn load_clock(&self) -> Result<GameClock, StoreError>;
    async fn save_clock(&self, clock: GameClock) -> Result<(), StoreError>;
}

/// Reference in-memory implementation. Backed by `std::sync::RwLock` rather
/// than an async lock: every method body only ever holds the guard across
/// plain in-memory operations, never across an `.await`.
#[derive(Default)]
pub struct InMemoryWorldStore {
    rooms: RwLock<HashMap<RoomId, Room>>,
    characters: RwLock<HashMap<CharacterId, Character>>,
    items: RwLock<HashMap<ItemId, Item>>,
    agents: RwLock<HashMap<AgentId, AiAgentRecord>>,
    accounts: RwLock<HashMap<AccountId, Account>>,
    events: RwLock<Vec<GameEvent>>,
    player_logs: RwLock<Vec<PlayerLogEntry>>,
    token_usage: RwLock<Vec<TokenUsageLog>>,
    clock: RwLock<GameClock>,
}

impl InMemoryWorldStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_room(&self, room: Room) {
        self.rooms.write().unwrap().insert(room.id, room);
    }

    pub fn seed_character(&self, character: Character) {
        self.characters.write().unwrap().insert(character.id, character);
    }

    pub fn seed_item(&self, item: Item) {
        self.items.write().unwrap().insert(item.id, item);
    }

    pub fn seed_agent(&self, agent: AiAgentRecord) {
        self.agents.write().unwrap().insert(agent.id, agent);
    }

    /// Test/inspection helper: all events appended so far, in order.
    pub fn events_snapshot(&self) -> Vec<GameEvent> {
        self.events.read().unwrap().clone()
    }
}

#[async_trait]
impl WorldStore for InMemoryWorldStore {
    async fn load_rooms(&self) -> Result<Vec<Room>, StoreError> {
        Ok(self.rooms.read().unwrap().values().cloned().collect())
    }

    async fn get_room(&self, id: RoomId) -> Result<Room, StoreError> {
        self.rooms
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NoSuchRoom(id))
    }

    async fn load_characters(&self) -> Result<Vec<Character>, StoreError> {
        Ok(self.characters.read().unwrap().values().cloned().collect())
    }

    async fn get_character(&self, id: CharacterId) -> Result<Character, StoreError> {
        self.characters
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NoSuchCharacter(id))
    }

    async fn save_character(&self, character: Character) -> Result<(), StoreError> {
        self.characters.write().unwrap().insert(character.id, character);
        Ok(())
    }

    async fn delete_character(&self, id: CharacterId) -> Result<(), StoreError> {
        self.characters.write().unwrap().remove(&id);
        Ok(())
    }

    async fn load_items(&self) -> Result<Vec<Item>, StoreError> {
        Ok(self.items.read().unwrap().values().cloned().collect())
    }

    async fn save_item(&self, item: Item) -> Result<(), StoreError> {
        self.items.write().unwrap().insert(item.id, item);
        Ok(())
    }

    async fn delete_item(&self, id: ItemId) -> Result<(), StoreError> {
        self.items.write().unwrap().remove(&id);
        Ok(())
    }

    async fn load_agents(&self) -> Result<Vec<AiAgentRecord>, StoreError> {
        Ok(self.agents.read().unwrap().values().cloned().collect())
    }

    async fn get_agent(&self, id: AgentId) -> Result<AiAgentRecord, StoreError> {
        self.agents
            .read()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or(StoreError::NoSuchAgent(id))
    }

    async fn save_agent(&self, agent: AiAgentRecord) -> Result<(), StoreError> {
        self.agents.write().unwrap().insert(agent.id, agent);
        Ok(())
    }

    async fn get_account(&self, username: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .accounts
            .read()
            .unwrap()
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn save_account(&self, account: Account) -> Result<(), StoreError> {
        self.accounts.write().unwrap().insert(account.id, account);
        Ok(())
    }

    async fn characters_for_account(&self, account_id: AccountId) -> Result<Vec<Character>, StoreError> {
        Ok(self
            .characters
            .read()
            .unwrap()
            .values()
            .filter(|c| c.account_id == Some(account_id))
            .cloned()
            .collect())
    }

    async fn append_event(&self, event: GameEvent) -> Result<(), StoreError> {
        self.events.write().unwrap().push(event);
        Ok(())
    }

    async fn append_player_log(&self, entry: PlayerLogEntry) -> Result<(), StoreError> {
        self.player_logs.write().unwrap().push(entry);
        Ok(())
    }

    async fn append_token_usage(&self, log: TokenUsageLog) -> Result<(), StoreError> {
        self.token_usage.write().unwrap().push(log);
        Ok(())
    }

    async fn load_clock(&self) -> Result<GameClock, StoreError> {
        Ok(*self.clock.read().unwrap())
    }

    async fn save_clock(&self, clock: GameClock) -> Result<(), StoreError> {
        *self.clock.write().unwrap() = clock;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_model::Room;

    #[tokio::test]
    async fn round_trips_a_room() {
        let store = InMemoryWorldStore::new();
        let room = Room::new("Gatehouse", "a stone gatehouse");
        let id = room.id;
        store.seed_room(room);

        let fetched = store.get_room(id).await.unwrap();
        assert_eq!(fetched.name, "Gatehouse");
    }

    #[tokio::test]
    async fn missing_room_is_an_error() {
        let store = InMemoryWorldStore::new();
        let result = store.get_room(world_model::RoomId::new()).await;
        assert!(result.is_err());
    }
}
