//! The engine's live, synchronous working set.
//!
//! Persistence is authoritative; this cache is rebuilt from the
//! [`crate::store::WorldStore`] at startup and is the only thing any
//! subsystem mutates mid-tick. Writes are queued back to the store as
//! fire-and-forget async tasks so no tick ever blocks on I/O, matching the
//! concurrency contract that only I/O may suspend and a suspension must
//! never yield a partially-emitted tick.

use std::collections::HashMap;

use world_model::{AgentId, AiAgentRecord, Character, CharacterId, Item, ItemId, Room, RoomId};

use crate::graph::RoomGraph;
use crate::propagator::Occupant;

pub struct WorldCache {
    pub graph: RoomGraph,
    pub characters: HashMap<CharacterId, Character>,
    pub items: HashMap<ItemId, Item>,
    pub agents: HashMap<AgentId, AiAgentRecord>,
    /// Reverse index: an NPC's character id to its controlling agent, kept
    /// in sync whenever an agent is inserted or removed.
    character_to_agent: HashMap<CharacterId, AgentId>,
}

impl WorldCache {
    pub fn new(rooms: Vec<Room>, characters: Vec<Character>, items: Vec<Item>, agents: Vec<AiAgentRecord>) -> Self {
        let character_to_agent = agents.iter().map(|a| (a.character_id, a.id)).collect();
        Self {
            graph: RoomGraph::new(rooms),
            characters: characters.into_iter().map(|c| (c.id, c)).collect(),
            items: items.into_iter().map(|i| (i.id, i)).collect(),
            agents: agents.into_iter().map(|a| (a.id, a)).collect(),
            character_to_agent,
        }
    }

    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.graph.get(id)
    }

    pub fn character(&self, id: CharacterId) -> Option<&Character> {
        self.characters.get(&id)
    }

    pub fn character_mut(&mut self, id: CharacterId) -> Option<&mut Character> {
        self.characters.get_mut(&id)
    }

    pub fn agent_for_character(&self, character_id: CharacterId) -> Option<&AiAgentRecord> {
        self.character_to_agent.get(&character_id).and_then(|id| self.agents.get(id))
    }

    pub fn insert_agent(&mut self, agent: AiAgentRecord) {
        self.character_to_agent.insert(agent.character_id, agent.id);
        self.agents.insert(agent.id, agent);
    }

    /// Characters alive and present in `room_id`, excluding `exclude` if given.
    pub fn characters_in_room(&self, room_id: RoomId, exclude: Option<CharacterId>) -> Vec<&Character> {
        self.characters
            .values()
            .filter(|c| c.is_alive && c.current_room_id == room_id && Some(c.id) != exclude)
            .collect()
    }

    pub fn items_in_room(&self, room_id: RoomId) -> Vec<&Item> {
        self.items
            .values()
            .filter(|i| matches!(i.location, world_model::ItemLocation::Room(r) if r == room_id))
            .collect()
    }

    pub fn items_held_by(&self, character_id: CharacterId) -> Vec<&Item> {
        self.items
            .values()
            .filter(|i| matches!(i.location, world_model::ItemLocation::Character(c) if c == character_id))
            .collect()
    }

    pub fn equipped_items_of(&self, character_id: CharacterId) -> Vec<&Item> {
        self.items_held_by(character_id).into_iter().filter(|i| i.is_equipped).collect()
    }

    /// Snapshot of every living occupant of every room, grouped for the
    /// propagator's recipient computation.
    pub fn occupants_by_room(&self) -> HashMap<RoomId, Vec<Occupant>> {
        let mut out: HashMap<RoomId, Vec<Occupant>> = HashMap::new();
        for character in self.characters.values() {
            if !character.is_alive {
                continue;
            }
            let occupant = match self.character_to_agent.get(&character.id) {
                Some(agent_id) => Occupant::Ai(character.id, *agent_id),
                None => Occupant::Player(character.id),
            };
            out.entry(character.current_room_id).or_default().push(occupant);
        }
        out
    }

    pub fn recompute_stats(&mut self, character_id: CharacterId) {
        let equipped_ids: Vec<ItemId> = self.equipped_items_of(character_id).into_iter().map(|i| i.id).collect();
        let equipped: Vec<&Item> = equipped_ids.iter().filter_map(|id| self.items.get(id)).collect();
        if let Some(character) = self.characters.get_mut(&character_id) {
            character.recompute_stats(&equipped);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn occupants_by_room_separates_players_from_ai() {
        let room = Room::new("Square", "");
        let room_id = room.id;
        let player = Character::new_npc("Player", room_id, 0);
        let npc = Character::new_npc("Guard", room_id, 0);
        let player_id = player.id;
        let npc_id = npc.id;
        let agent = AiAgentRecord::new(npc_id, room_id, "guard duty", 0);

        let cache = WorldCache::new(vec![room], vec![player, npc], vec![], vec![agent]);
        let occupants = cache.occupants_by_room();
        let in_room = &occupants[&room_id];
        assert_eq!(in_room.len(), 2);

        let has_player = in_room.iter().any(|o| matches!(o, Occupant::Player(id) if *id == player_id));
        let has_ai = in_room.iter().any(|o| matches!(o, Occupant::Ai(id, _) if *id == npc_id));
        assert!(has_player);
        assert!(has_ai);
    }
}
