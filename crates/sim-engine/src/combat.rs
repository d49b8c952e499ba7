//! Per-attacker gauge combat.
//!
//! One table entry per attacker: `{target, gauge, speed}`. Every tick each
//! gauge accumulates its owner's speed; at 100 a swing resolves and 100 is
//! subtracted, carrying overflow — but never more than one swing per tick
//! per the ordering guarantee that combat damage for a given attacker is
//! monotonic per tick.

use std::collections::HashMap;

use world_model::{Character, CharacterId, EventData, EventType, GameEvent, RoomId};

pub const SWING_THRESHOLD: f64 = 100.0;
pub const DEFAULT_FLEE_SUCCESS_PROBABILITY: f64 = 0.7;

#[derive(Debug, Clone)]
struct CombatEntry {
    target_id: CharacterId,
    gauge: f64,
    speed: i32,
}

#[derive(Debug, Default)]
pub struct CombatTable {
    entries: HashMap<CharacterId, CombatEntry>,
}

/// Outcome of resolving one tick's worth of swings for a single attacker.
pub enum SwingOutcome {
    /// The attacker's own entry was silently dropped (missing/dead/moved participant).
    Removed,
    Hit { event: GameEvent, victim_died: bool },
}

impl CombatTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fighting(&self, attacker_id: CharacterId) -> bool {
        self.entries.contains_key(&attacker_id)
    }

    pub fn target_of(&self, attacker_id: CharacterId) -> Option<CharacterId> {
        self.entries.get(&attacker_id).map(|e| e.target_id)
    }

    /// Inserts a new entry or re-targets an existing one; resets the gauge.
    pub fn start_combat(&mut self, attacker_id: CharacterId, target_id: CharacterId, speed: i32) {
        self.entries.insert(attacker_id, CombatEntry { target_id, gauge: 0.0, speed });
    }

    pub fn remove(&mut self, attacker_id: CharacterId) -> bool {
        self.entries.remove(&attacker_id).is_some()
    }

    /// Removes the victim's own entry plus every entry that targeted it —
    /// called once a character's death has been applied.
    pub fn remove_victim(&mut self, victim_id: CharacterId) {
        self.entries.remove(&victim_id);
        self.entries.retain(|_, entry| entry.target_id != victim_id);
    }

    pub fn attacker_ids(&self) -> Vec<CharacterId> {
        self.entries.keys().copied().collect()
    }

    /// Advances every gauge by its owner's speed. Returns the attacker ids
    /// whose gauge crossed the swing threshold this tick, in a stable order.
    pub fn step_gauges(&mut self) -> Vec<CharacterId> {
        let mut ready = Vec::new();
        let mut attacker_ids: Vec<CharacterId> = self.entries.keys().copied().collect();
        attacker_ids.sort_by_key(|id| id.0);
        for attacker_id in attacker_ids {
            if let Some(entry) = self.entries.get_mut(&attacker_id) {
                entry.gauge += entry.speed as f64;
                if entry.gauge >= SWING_THRESHOLD {
                    entry.gauge -= SWING_THRESHOLD;
                    entry.gauge = entry.gauge.min(SWING_THRESHOLD - 1.0);
                    ready.push(attacker_id);
                }
            }
        }
        ready
    }

    /// Resolves one swing for `attacker_id` against its current target,
    /// mutating `characters` in place. Removes the attacker's entry silently
    /// if either participant is missing, dead, or no longer co-located.
    pub fn resolve_swing(
        &mut self,
        attacker_id: CharacterId,
        characters: &mut HashMap<CharacterId, Character>,
        now: u64,
        next_event_id: &mut impl FnMut() -> world_model::EventId,
    ) -> SwingOutcome {
        let target_id = match self.entries.get(&attacker_id) {
            Some(entry) => entry.target_id,
            None => return SwingOutcome::Removed,
        };

        let (attacker_alive, attacker_attack, attacker_room) = match characters.get(&attacker_id) {
            Some(c) if c.is_alive => (true, c.attack, c.current_room_id),
            _ => (false, 0, RoomId::new()),
        };
        if !attacker_alive {
            self.entries.remove(&attacker_id);
            return SwingOutcome::Removed;
        }

        let target_valid = characters
            .get(&target_id)
            .map(|t| t.is_alive && t.current_room_id == attacker_room)
            .unwrap_or(false);
        if !target_valid {
            self.entries.remove(&attacker_id);
            return SwingOutcome::Removed;
        }

        let target_defense = characters[&target_id].defense;
        let damage = (attacker_attack - target_defense).max(1);
        let target = characters.get_mut(&target_id).unwrap();
        let died = target.apply_damage(damage, now);
        let target_hp = target.hp;
        let target_max_hp = target.max_hp;

        if died {
            self.remove_victim(target_id);
        }

        let event = GameEvent::builder(
            EventType::CombatHit,
            attacker_room,
            EventData::CombatHit {
                attacker_id,
                target_id,
                damage,
                target_hp,
                target_max_hp,
            },
        )
        .id(next_event_id())
        .timestamp(now)
        .build();

        SwingOutcome::Hit { event, victim_died: died }
    }
}

/// Attempts a flee roll for `attacker_id`. On success removes the combat
/// entry and returns the event list to emit (movement is left to the
/// dispatcher, which performs the actual `go`).
pub fn attempt_flee(
    table: &mut CombatTable,
    attacker_id: CharacterId,
    success_probability: f64,
    roll: f64,
) -> Result<(), &'static str> {
    if !table.is_fighting(attacker_id) {
        return Err("aren't fighting or listening");
    }
    if roll < success_probability {
        table.remove(attacker_id);
        Ok(())
    } else {
        Err("failed to escape")
    }
}

pub fn death_event(
    victim_id: CharacterId,
    killer_id: Option<CharacterId>,
    room_id: RoomId,
    now: u64,
    id: world_model::EventId,
) -> GameEvent {
    GameEvent::builder(EventType::Death, room_id, EventData::Death { victim_id, killer_id })
        .id(id)
        .timestamp(now)
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_model::EventId;

    fn make_character(hp: i32, attack: i32, defense: i32, room: RoomId) -> Character {
        let mut c = Character::new_npc("Fighter", room, 0);
        c.hp = hp;
        c.max_hp = hp;
        c.attack = attack;
        c.defense = defense;
        c
    }

    #[test]
    fn swing_resolves_only_after_gauge_crosses_threshold() {
        let room = RoomId::new();
        let mut characters = HashMap::new();
        let attacker = make_character(20, 15, 5, room);
        let mut target = make_character(10, 5, 0, room);
        target.max_hp = 10;
        let attacker_id = attacker.id;
        let target_id = target.id;
        characters.insert(attacker_id, attacker);
        characters.insert(target_id, target);

        let mut table = CombatTable::new();
        table.start_combat(attacker_id, target_id, 10);

        let mut sequence = 0u64;
        let mut next_id = || {
            sequence += 1;
            EventId::from_sequence(sequence)
        };

        for tick in 1..10 {
            let ready = table.step_gauges();
            assert!(ready.is_empty(), "should not be ready at tick {tick}");
        }

        let ready = table.step_gauges();
        assert_eq!(ready, vec![attacker_id]);

        match table.resolve_swing(attacker_id, &mut characters, 10, &mut next_id) {
            SwingOutcome::Hit { event, victim_died } => {
                assert!(victim_died);
                if let EventData::CombatHit { damage, target_hp, .. } = event.data {
                    assert_eq!(damage, 15);
                    assert_eq!(target_hp, 0);
                } else {
                    panic!("wrong event data");
                }
            }
            SwingOutcome::Removed => panic!("expected a hit"),
        }

        assert!(!table.is_fighting(attacker_id));
    }

    #[test]
    fn death_removes_all_entries_targeting_the_victim() {
        let room = RoomId::new();
        let victim_id = CharacterId::new();
        let a = CharacterId::new();
        let b = CharacterId::new();

        let mut table = CombatTable::new();
        table.start_combat(a, victim_id, 10);
        table.start_combat(b, victim_id, 10);
        let _ = room;

        table.remove_victim(victim_id);
        assert!(!table.is_fighting(a));
        assert!(!table.is_fighting(b));
    }

    #[test]
    fn flee_fails_when_not_in_combat() {
        let mut table = CombatTable::new();
        let attacker = CharacterId::new();
        let result = attempt_flee(&mut table, attacker, DEFAULT_FLEE_SUCCESS_PROBABILITY, 0.1);
        assert_eq!(result, Err("aren't fighting or listening"));
    }
}
