//! AI Agent Manager: perception queues, cooldowns, and decision-context
//! assembly for NPC agents.
//!
//! This module stays synchronous and pure: a resource holds a timestamp,
//! a `should_*` predicate gates the system. The actual oracle call is
//! `async` and must not suspend inside a tick, so the proactive pass
//! itself — awaiting [`oracle::LlmOracle`], posting the resulting command
//! back onto the [`crate::command::CommandQueue`] — is orchestrated by the
//! `server` crate. What lives here is everything that can be decided
//! synchronously: whether an agent is due, what context to hand the
//! oracle, and how to fold its answer back into agent state.

use std::collections::{HashMap, VecDeque};

use world_model::{AgentId, AiAgentRecord, CharacterId, GameEvent, Relationship, RoomId};

use crate::formatter::{format_event, ViewerContext};
use crate::graph::RoomGraph;
use crate::sinks::AiPerceptionSink;
use crate::world_cache::WorldCache;

/// Perception events older than this are dropped on every enqueue/drain.
pub const PERCEPTION_WINDOW_MS: u64 = 30_000;
/// Minimum time between an agent's proactive actions.
pub const ACTION_COOLDOWN_MS: u64 = 3_000;
/// Cadence of the proactive loop, independent of the 10 Hz tick clock.
pub const PROACTIVE_INTERVAL_MS: u64 = 10_000;
/// An agent's spatial memory is considered stale after this long.
pub const SPATIAL_MEMORY_MAX_AGE_MS: i64 = 24 * 60 * 60 * 1000;

/// Bounded rolling window of events an agent has perceived but not yet
/// acted on. Pruned to the last 30 seconds on every push and drain.
#[derive(Debug, Default)]
struct PerceptionQueue {
    events: VecDeque<(u64, GameEvent)>,
}

impl PerceptionQueue {
    fn push(&mut self, event: GameEvent, now_ms: u64) {
        self.events.push_back((now_ms, event));
        self.prune(now_ms);
    }

    fn prune(&mut self, now_ms: u64) {
        let cutoff = now_ms.saturating_sub(PERCEPTION_WINDOW_MS);
        while let Some((seen_at, _)) = self.events.front() {
            if *seen_at < cutoff {
                self.events.pop_front();
            } else {
                break;
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns every perceived event without clearing the queue — the
    /// proactive pass reads the window, it doesn't consume it; events age
    /// out on their own per [`PERCEPTION_WINDOW_MS`].
    fn snapshot(&self, now_ms: u64) -> Vec<GameEvent> {
        let cutoff = now_ms.saturating_sub(PERCEPTION_WINDOW_MS);
        self.events
            .iter()
            .filter(|(seen_at, _)| *seen_at >= cutoff)
            .map(|(_, event)| event.clone())
            .collect()
    }
}

#[derive(Debug, Default)]
struct AgentRuntime {
    queue: PerceptionQueue,
    last_action_at_ms: u64,
    /// Last time a proactive pass was *attempted* (oracle call spawned),
    /// independent of whether it produced an action. Gates call cadence at
    /// [`PROACTIVE_INTERVAL_MS`] even when the oracle keeps returning no-ops,
    /// which never advance `last_action_at_ms`. `None` until the first
    /// attempt, so a freshly registered agent isn't blocked from its first pass.
    last_proactive_attempt_ms: Option<u64>,
}

/// Per-agent perception and cooldown bookkeeping. Owned by the engine and
/// threaded explicitly into the propagator (as an [`AiPerceptionSink`]) and
/// the proactive loop — no process-wide singleton, per the redesign note.
#[derive(Debug, Default)]
pub struct AiManager {
    runtimes: HashMap<AgentId, AgentRuntime>,
}

impl AiManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn runtime_mut(&mut self, agent_id: AgentId) -> &mut AgentRuntime {
        self.runtimes.entry(agent_id).or_default()
    }

    /// Skip rules 1-4 from the proactive loop contract, evaluated in order.
    /// Rule 1 (missing/dead character) and rule 2 (no co-located human) are
    /// evaluated by the caller, which has the world cache; this takes their
    /// results alongside the cooldown and queue state this module owns.
    pub fn is_due_for_proactive_pass(
        &self,
        agent_id: AgentId,
        now_ms: u64,
        character_alive: bool,
        human_co_located: bool,
    ) -> bool {
        if !character_alive || !human_co_located {
            return false;
        }
        let Some(runtime) = self.runtimes.get(&agent_id) else {
            return false;
        };
        if now_ms.saturating_sub(runtime.last_action_at_ms) < ACTION_COOLDOWN_MS {
            return false;
        }
        if let Some(last_attempt) = runtime.last_proactive_attempt_ms {
            if now_ms.saturating_sub(last_attempt) < PROACTIVE_INTERVAL_MS {
                return false;
            }
        }
        !runtime.queue.is_empty()
    }

    /// Formatted event lines an agent has perceived within the rolling window.
    pub fn perceived_events(&self, agent_id: AgentId, now_ms: u64) -> Vec<GameEvent> {
        self.runtimes.get(&agent_id).map(|r| r.queue.snapshot(now_ms)).unwrap_or_default()
    }

    pub fn time_since_last_action_secs(&self, agent_id: AgentId, now_ms: u64) -> f64 {
        let last = self.runtimes.get(&agent_id).map(|r| r.last_action_at_ms).unwrap_or(0);
        now_ms.saturating_sub(last) as f64 / 1000.0
    }

    /// Called only after a proactive action is actually enqueued — an
    /// `ai:error` or a genuine no-op does *not* reset the cooldown (open
    /// question resolved per spec: cooldown advances on success only).
    pub fn mark_acted(&mut self, agent_id: AgentId, now_ms: u64) {
        self.runtime_mut(agent_id).last_action_at_ms = now_ms;
    }

    /// Called as soon as a proactive oracle call is spawned, success or not,
    /// so a no-op-returning oracle still only gets called once per
    /// [`PROACTIVE_INTERVAL_MS`] instead of on every tick.
    pub fn mark_proactive_attempt(&mut self, agent_id: AgentId, now_ms: u64) {
        self.runtime_mut(agent_id).last_proactive_attempt_ms = Some(now_ms);
    }

    /// Registers a freshly loaded/spawned agent so its runtime entry exists
    /// even before its first perceived event.
    pub fn register(&mut self, agent_id: AgentId) {
        self.runtimes.entry(agent_id).or_default();
    }

    /// Registers an agent loaded from the store, carrying its persisted
    /// `last_action_at` (seconds) into the runtime cooldown clock (ms) so a
    /// restart doesn't reset every agent's cooldown to zero at once.
    pub fn register_from_record(&mut self, agent: &AiAgentRecord) {
        self.runtimes.insert(
            agent.id,
            AgentRuntime {
                queue: PerceptionQueue::default(),
                last_action_at_ms: (agent.last_action_at.max(0) as u64).saturating_mul(1000),
                last_proactive_attempt_ms: None,
            },
        );
    }
}

impl AiPerceptionSink for AiManager {
    fn perceive(&mut self, agent_id: AgentId, event: GameEvent) {
        // Timestamps arrive as tick numbers (tenths of a second); convert
        // to milliseconds so the 30s window lines up with wall-clock cadence.
        let now_ms = event.timestamp.saturating_mul(100);
        self.runtime_mut(agent_id).queue.push(event, now_ms);
    }
}

/// True if at least one living player character shares `room_id` with the
/// agent — an AI never initiates conversation with only AIs present.
pub fn human_present_in_room(world: &WorldCache, room_id: RoomId) -> bool {
    world
        .characters_in_room(room_id, None)
        .iter()
        .any(|c| c.account_id.is_some())
}

/// Assembles the context handed to [`oracle::LlmOracle::decide_action`].
/// Pure and synchronous: the caller awaits the oracle separately.
pub fn build_decision_context(
    agent: &AiAgentRecord,
    character_id: CharacterId,
    world: &WorldCache,
    perceived: &[GameEvent],
    time_since_last_action_secs: f64,
    available_commands: &[&str],
) -> oracle::DecisionContext {
    let character = world.character(character_id);
    let room_id = character.map(|c| c.current_room_id).unwrap_or(agent.home_room_id);
    let room = world.room(room_id);

    let actor_name = |id: CharacterId| world.character(id).map(|c| c.name.clone()).unwrap_or_else(|| "someone".into());
    let viewer = ViewerContext::for_actor(character_id, room_id, false);
    let formatted_events = perceived.iter().map(|e| format_event(e, &viewer, actor_name)).filter(|s| !s.is_empty()).collect();

    let adjacencies = room
        .map(|r| {
            r.exits
                .iter()
                .map(|(direction, target)| oracle::AdjacencyInfo {
                    direction: direction.clone(),
                    room_id: *target,
                    room_name: world.room(*target).map(|t| t.name.clone()).unwrap_or_else(|| "somewhere".into()),
                })
                .collect()
        })
        .unwrap_or_default();

    let relationships = agent
        .relationships
        .iter()
        .map(|(peer_name, rel)| oracle::RelationshipInfo {
            peer_name: peer_name.clone(),
            sentiment: rel.sentiment,
            trust: rel.trust,
            familiarity: rel.familiarity,
            role: rel.role.clone(),
        })
        .collect();

    let room_context = oracle::RoomContext {
        room_id,
        room_name: room.map(|r| r.name.clone()).unwrap_or_default(),
        room_description: room.map(|r| r.description.clone()).unwrap_or_default(),
        characters_present: world.characters_in_room(room_id, Some(character_id)).into_iter().map(|c| c.name.clone()).collect(),
        items_present: world.items_in_room(room_id).into_iter().map(|i| i.name.clone()).collect(),
    };

    oracle::DecisionContext {
        agent_id: agent.id,
        character_id,
        system_prompt: agent.system_prompt.clone(),
        agent_name: character.map(|c| c.name.clone()).unwrap_or_default(),
        formatted_events,
        adjacencies,
        relationships,
        time_since_last_action_secs,
        room_context,
        spatial_memory: agent.spatial_memory.clone(),
        available_commands: available_commands.iter().map(|s| s.to_string()).collect(),
    }
}

/// Assembles context for a direct conversational prompt.
pub fn build_conversation_context(
    agent: &AiAgentRecord,
    agent_name: &str,
    speaker_name: &str,
    message: &str,
) -> oracle::ConversationContext {
    let relationship = agent.relationships.get(speaker_name).map(|rel| oracle::RelationshipInfo {
        peer_name: speaker_name.to_string(),
        sentiment: rel.sentiment,
        trust: rel.trust,
        familiarity: rel.familiarity,
        role: rel.role.clone(),
    });

    oracle::ConversationContext {
        agent_id: agent.id,
        system_prompt: agent.system_prompt.clone(),
        agent_name: agent_name.to_string(),
        speaker_name: speaker_name.to_string(),
        message: message.to_string(),
        conversation_history: agent.conversation_history.iter().map(|t| format!("{}: {}", t.speaker, t.message)).collect(),
        relationship,
    }
}

/// Folds an oracle [`oracle::ResponseDecision`] back into agent state:
/// familiarity/sentiment/trust updates and a bounded conversation history
/// append, all in place on the caller's [`AiAgentRecord`].
pub fn apply_conversation_outcome(
    agent: &mut AiAgentRecord,
    speaker_name: &str,
    message: &str,
    response: &str,
    agent_name: &str,
    sentiment_delta: i32,
    trust_delta: i32,
    now: i64,
) {
    agent.push_turn(world_model::ConversationTurn { speaker: speaker_name.to_string(), message: message.to_string(), timestamp: now });
    agent.push_turn(world_model::ConversationTurn { speaker: agent_name.to_string(), message: response.to_string(), timestamp: now });

    let relationship = agent.relationships.entry(speaker_name.to_string()).or_insert_with(|| Relationship::new(now));
    relationship.familiarity += 1;
    relationship.last_seen = now;
    relationship.sentiment += sentiment_delta;
    relationship.trust += trust_delta;
    relationship.clamp();
}

/// True if an agent's spatial memory has never been set, or was last
/// refreshed more than 24h ago. Admin `regenerate-spatial-memory` forces
/// this by setting `spatial_memory_updated_at` to an ancient timestamp.
pub fn spatial_memory_is_stale(agent: &AiAgentRecord, now: i64) -> bool {
    match agent.spatial_memory_updated_at {
        None => true,
        Some(updated_at) => now.saturating_sub(updated_at) >= SPATIAL_MEMORY_MAX_AGE_MS / 1000,
    }
}

/// One room's entry in the structured map assembled for the oracle's
/// spatial-memory compression pass.
struct SpatialMapEntry {
    room_name: String,
    distance: u32,
    exits: Vec<(String, String)>,
}

/// BFS from `agent.home_room_id` out to `max_rooms_from_home + 2` hops,
/// rendered as a plain-text table for [`oracle::LlmOracle::summarise_spatial_map`].
/// An agent may operate with `None` spatial memory — it just loses the
/// ability to plan routes beyond adjacent rooms.
pub fn gather_spatial_map(graph: &RoomGraph, agent: &AiAgentRecord) -> String {
    let hops = agent.max_rooms_from_home + 2;
    let reachable = graph.bfs_within_range(agent.home_room_id, hops);

    let mut entries: Vec<SpatialMapEntry> = reachable
        .into_iter()
        .filter_map(|(room_id, distance)| {
            let room = graph.get(room_id)?;
            let exits = room
                .exits
                .iter()
                .map(|(direction, target)| {
                    let target_name = graph.get(*target).map(|r| r.name.clone()).unwrap_or_else(|| "unknown".into());
                    (direction.clone(), target_name)
                })
                .collect();
            Some(SpatialMapEntry { room_name: room.name.clone(), distance, exits })
        })
        .collect();
    entries.sort_by_key(|e| e.distance);

    let mut out = String::new();
    for entry in &entries {
        let exits_str = entry.exits.iter().map(|(d, n)| format!("{d}->{n}")).collect::<Vec<_>>().join(", ");
        out.push_str(&format!("{} (d{}): {}\n", entry.room_name, entry.distance, exits_str));
    }
    out
}

/// Movement rule exposed to the oracle: an AI may only move to a direction
/// that is a live exit from its current room (never trust the mental map
/// over reality), and never beyond `max_rooms_from_home` hops from home.
pub fn ai_movement_allowed(graph: &RoomGraph, agent: &AiAgentRecord, current_room: RoomId, direction: &str) -> Result<RoomId, &'static str> {
    let room = graph.get(current_room).ok_or("agent's current room no longer exists")?;
    let Some(destination) = room.exit_toward(direction) else {
        return Err("You can't go that way");
    };
    match graph.distance(agent.home_room_id, destination) {
        Some(distance) if distance <= agent.max_rooms_from_home => Ok(destination),
        _ => Err("too far from home to wander there"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_model::{Character, Room};

    fn sample_agent(home: RoomId) -> AiAgentRecord {
        AiAgentRecord::new(CharacterId::new(), home, "guard duty", 0)
    }

    #[test]
    fn perception_window_drops_stale_events() {
        let mut manager = AiManager::new();
        let agent_id = AgentId::new();
        manager.register(agent_id);

        let room = RoomId::new();
        let old_event = world_model::GameEvent::builder(
            world_model::EventType::Ambient,
            room,
            world_model::EventData::Ambient { message: "wind".into() },
        )
        .timestamp(0)
        .build();
        manager.perceive(agent_id, old_event);

        let new_event = world_model::GameEvent::builder(
            world_model::EventType::Ambient,
            room,
            world_model::EventData::Ambient { message: "rustle".into() },
        )
        .timestamp(1000) // 1000 ticks * 100ms = 100,000ms later
        .build();
        manager.perceive(agent_id, new_event);

        let perceived = manager.perceived_events(agent_id, 100_000);
        assert_eq!(perceived.len(), 1);
    }

    #[test]
    fn cooldown_blocks_proactive_pass_until_elapsed() {
        let mut manager = AiManager::new();
        let agent_id = AgentId::new();
        manager.register(agent_id);
        let room = RoomId::new();
        manager.perceive(
            agent_id,
            world_model::GameEvent::builder(world_model::EventType::Ambient, room, world_model::EventData::Ambient { message: "x".into() })
                .timestamp(0)
                .build(),
        );
        manager.mark_acted(agent_id, 1_000);

        assert!(!manager.is_due_for_proactive_pass(agent_id, 2_000, true, true));
        assert!(manager.is_due_for_proactive_pass(agent_id, 4_001, true, true));
    }

    #[test]
    fn proactive_attempt_cadence_blocks_retries_within_ten_seconds() {
        let mut manager = AiManager::new();
        let agent_id = AgentId::new();
        manager.register(agent_id);
        let room = RoomId::new();
        manager.perceive(
            agent_id,
            world_model::GameEvent::builder(world_model::EventType::Ambient, room, world_model::EventData::Ambient { message: "x".into() })
                .timestamp(0)
                .build(),
        );

        // Due immediately: never attempted, cooldown satisfied (no prior action).
        assert!(manager.is_due_for_proactive_pass(agent_id, 5_000, true, true));

        // A no-op oracle call doesn't advance `last_action_at_ms`, but the
        // attempt itself must still suppress retries for PROACTIVE_INTERVAL_MS.
        manager.mark_proactive_attempt(agent_id, 5_000);
        assert!(!manager.is_due_for_proactive_pass(agent_id, 6_000, true, true));
        assert!(!manager.is_due_for_proactive_pass(agent_id, 14_999, true, true));
        assert!(manager.is_due_for_proactive_pass(agent_id, 15_001, true, true));
    }

    #[test]
    fn due_check_requires_human_and_living_character() {
        let mut manager = AiManager::new();
        let agent_id = AgentId::new();
        manager.register(agent_id);
        let room = RoomId::new();
        manager.perceive(
            agent_id,
            world_model::GameEvent::builder(world_model::EventType::Ambient, room, world_model::EventData::Ambient { message: "x".into() })
                .timestamp(0)
                .build(),
        );

        assert!(!manager.is_due_for_proactive_pass(agent_id, 100_000, false, true));
        assert!(!manager.is_due_for_proactive_pass(agent_id, 100_000, true, false));
        assert!(manager.is_due_for_proactive_pass(agent_id, 100_000, true, true));
    }

    #[test]
    fn ai_movement_rejects_beyond_home_radius() {
        let mut home = Room::new("Home", "");
        let mut far = Room::new("Far", "");
        home.exits.insert("north".into(), far.id);
        far.exits.insert("south".into(), home.id);
        let home_id = home.id;
        let far_id = far.id;
        let graph = RoomGraph::new(vec![home, far]);

        let mut agent = sample_agent(home_id);
        agent.max_rooms_from_home = 0;
        let result = ai_movement_allowed(&graph, &agent, home_id, "north");
        assert_eq!(result, Err("too far from home to wander there"));
        let _ = far_id;
    }

    #[test]
    fn spatial_memory_staleness() {
        let agent = sample_agent(RoomId::new());
        assert!(spatial_memory_is_stale(&agent, 100));

        let mut fresh = agent;
        fresh.spatial_memory = Some("map".into());
        fresh.spatial_memory_updated_at = Some(100);
        assert!(!spatial_memory_is_stale(&fresh, 100 + 60));
        assert!(spatial_memory_is_stale(&fresh, 100 + SPATIAL_MEMORY_MAX_AGE_MS / 1000 + 1));
    }

    #[test]
    fn apply_conversation_outcome_updates_relationship_and_history() {
        let mut agent = sample_agent(RoomId::new());
        apply_conversation_outcome(&mut agent, "Rowan", "hello", "hi there", "Guard", 2, 1, 500);
        let rel = agent.relationships.get("Rowan").unwrap();
        assert_eq!(rel.familiarity, 1);
        assert_eq!(rel.sentiment, 2);
        assert_eq!(rel.trust, 1);
        assert_eq!(agent.conversation_history.len(), 2);
    }

    #[test]
    fn human_presence_check_distinguishes_players_from_npcs() {
        let room = Room::new("Square", "");
        let room_id = room.id;
        let npc = Character::new_npc("Guard", room_id, 0);
        let player = {
            let mut c = Character::new_npc("Hero", room_id, 0);
            c.account_id = Some(world_model::AccountId::new());
            c
        };
        let world_npc_only = WorldCache::new(vec![Room::new("Square", "")], vec![npc.clone()], vec![], vec![]);
        assert!(!human_present_in_room(&world_npc_only, room_id));

        let world_with_human = WorldCache::new(vec![Room::new("Square", "")], vec![npc, player], vec![], vec![]);
        assert!(human_present_in_room(&world_with_human, room_id));
    }
}
