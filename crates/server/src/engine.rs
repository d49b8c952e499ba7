//! Tick orchestration: wires the Command Queue, Dispatcher, Combat System,
//! AI Agent Manager, and Event Propagator into a running [`GameLoop`], and
//! bridges its synchronous tick to the async oracle and transport layers.
//!
//! Every [`Subsystem::on_tick`] body here is synchronous and holds the
//! [`SharedWorld`] lock only across plain in-memory work, never across an
//! `.await`. Oracle calls are spawned as detached tasks that post their
//! result back through an unbounded channel; the *next* tick's
//! [`AiProactiveSubsystem`] drains it before looking for newly eligible
//! agents.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tokio::sync::mpsc;

use oracle::{ActionDecision, LlmOracle, OracleError, OracleResult, ResponseDecision, TokenUsage};
use sim_engine::combat::CombatTable;
use sim_engine::command::{Command, CommandQueue, CommandSource};
use sim_engine::dispatcher::{self, StructuredOutput};
use sim_engine::formatter::{format_event, ViewerContext};
use sim_engine::game_loop::{Subsystem, TickContext};
use sim_engine::listening::ListeningRegistry;
use sim_engine::propagator::{EventPropagator, PropagatorContext};
use sim_engine::store::WorldStore;
use sim_engine::world_cache::WorldCache;
use sim_engine::ai_manager::{self, AiManager};
use world_model::{AgentId, CharacterId, EventData, EventType, GameEvent};

use crate::connections::ConnectionRegistry;
use crate::protocol::ServerMessage;
use crate::sinks::{SocketAdminMirror, SocketPlayerSink};

/// Verbs advertised to the oracle as legal actions. Kept as a flat list
/// here rather than derived from the dispatcher's match arms — those are
/// an implementation detail, this is a contract with the prompt.
const AVAILABLE_COMMANDS: &[&str] = &[
    "look", "go", "say", "shout", "emote", "tell", "whisper", "inventory", "take", "drop", "equip",
    "unequip", "examine", "attack", "flee", "stop", "listen",
];

/// Caller-supplied deadline for an oracle call. On expiry the action is a
/// no-op and an `ai:error` event is emitted, same as any other oracle error.
const ORACLE_CALL_DEADLINE: Duration = Duration::from_secs(10);

/// Time a dying player's socket is left open after `game:death` before the
/// server sends `game:disconnect` and the transport closes it.
const DEATH_DISCONNECT_DELAY: Duration = Duration::from_secs(3);

/// Everything a tick subsystem mutates. Locked once per subsystem per tick.
pub struct SharedWorld {
    pub cache: WorldCache,
    pub combat: CombatTable,
    pub listening: ListeningRegistry,
    pub command_queue: CommandQueue,
    pub propagator: EventPropagator,
    pub ai: AiManager,
    pub rng: SmallRng,
    /// Events this engine flushed last tick, scanned by the AI subsystem
    /// for direct-address conversation turns before it looks for newly
    /// due proactive agents.
    last_tick_events: Vec<GameEvent>,
}

impl SharedWorld {
    pub fn new(cache: WorldCache, command_drain_cap: usize) -> Self {
        Self {
            cache,
            combat: CombatTable::new(),
            listening: ListeningRegistry::new(),
            command_queue: CommandQueue::new(command_drain_cap),
            propagator: EventPropagator::new(),
            ai: AiManager::new(),
            rng: SmallRng::from_entropy(),
            last_tick_events: Vec::new(),
        }
    }
}

pub type Shared = Arc<Mutex<SharedWorld>>;

/// Result of a detached oracle call, posted back onto the channel the next
/// tick's [`AiProactiveSubsystem`] drains.
enum AiOutcome {
    Proactive {
        agent_id: AgentId,
        character_id: CharacterId,
        result: Result<Option<ActionDecision>, OracleError>,
    },
    Conversation {
        agent_id: AgentId,
        character_id: CharacterId,
        speaker_name: String,
        message: String,
        result: Result<ResponseDecision, OracleError>,
    },
}

/// Forwards oracle-reported token usage to the store as a detached task.
/// The oracle boundary hands this back alongside a decision purely so the
/// core can log it; it never blocks the tick on the write.
fn spawn_usage_append(store: &Arc<dyn WorldStore>, usage: Option<TokenUsage>) {
    let Some(usage) = usage else { return };
    let store = store.clone();
    tokio::spawn(async move {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        let log = world_model::TokenUsageLog {
            id: uuid::Uuid::new_v4().to_string(),
            model: usage.model,
            provider: usage.provider,
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            cost: usage.cost,
            source: usage.source,
            agent_id: usage.agent_id,
            source_event_id: usage.source_event_id,
            created_at,
        };
        let _ = store.append_token_usage(log).await;
    });
}

/// Runs an oracle call under the shared call deadline, folding a timeout
/// into the same [`OracleError`] variant the oracle itself would return.
async fn with_deadline<T>(
    fut: impl std::future::Future<Output = Result<OracleResult<T>, OracleError>>,
) -> Result<OracleResult<T>, OracleError> {
    match tokio::time::timeout(ORACLE_CALL_DEADLINE, fut).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(ORACLE_CALL_DEADLINE)),
    }
}

/// Drains the command queue, dispatches each entry, and routes its
/// structured output back to the commanding actor's socket ahead of any of
/// that command's events — the ordering contract `dispatch`'s own doc
/// comment hands to its caller.
pub struct CommandSubsystem {
    shared: Shared,
    registry: ConnectionRegistry,
    store: Arc<dyn WorldStore>,
}

impl CommandSubsystem {
    pub fn new(shared: Shared, registry: ConnectionRegistry, store: Arc<dyn WorldStore>) -> Self {
        Self { shared, registry, store }
    }
}

impl Subsystem for CommandSubsystem {
    fn name(&self) -> &'static str {
        "commands"
    }

    fn on_tick(&mut self, ctx: &TickContext) {
        let now = ctx.tick_number;
        let mut world = self.shared.lock().unwrap();
        let commands = world.command_queue.drain_tick();
        for command in commands {
            let actor_alive = world.cache.character(command.actor_id).map(|c| c.is_alive).unwrap_or(false);
            if !actor_alive {
                tracing::warn!(actor_id = %command.actor_id, command = %command.text, "dropping command: actor no longer resolves to a living character");
                continue;
            }

            let result = dispatcher::dispatch(
                command.actor_id,
                &command.text,
                &mut world.cache,
                &mut world.combat,
                &mut world.listening,
                now,
                &mut world.rng,
            );

            if let Some(output) = result.output.clone() {
                self.registry.send_to_player(command.actor_id, ServerMessage::GameOutput { output: output.clone() });
                let entry = world_model::PlayerLogEntry {
                    character_id: command.actor_id,
                    kind: world_model::PlayerLogKind::Output,
                    payload: serde_json::to_value(&output).unwrap_or(serde_json::Value::Null),
                    timestamp: now as i64,
                };
                let store = self.store.clone();
                tokio::spawn(async move {
                    let _ = store.append_player_log(entry).await;
                });
            }
            if let Some(message) = result.error.clone() {
                self.registry.send_to_player(command.actor_id, ServerMessage::GameError { message });
            }

            for event in result.events {
                world.propagator.broadcast(event);
            }

            let source_label = match command.source {
                CommandSource::Ai => "ai",
                CommandSource::Player => "player",
            };
            let entry = world_model::PlayerLogEntry {
                character_id: command.actor_id,
                kind: world_model::PlayerLogKind::Command,
                payload: serde_json::json!({ "source": source_label, "text": command.text }),
                timestamp: now as i64,
            };
            let store = self.store.clone();
            tokio::spawn(async move {
                let _ = store.append_player_log(entry).await;
            });
        }
    }
}

/// Steps per-attacker gauges, resolves swings, and hands off deaths to the
/// dispatcher's death handling. Stays strictly after commands (a `flee` or
/// `stop` issued this tick must land before this tick's swings) and before
/// the propagator flush.
pub struct CombatSubsystem {
    shared: Shared,
    registry: ConnectionRegistry,
}

impl CombatSubsystem {
    pub fn new(shared: Shared, registry: ConnectionRegistry) -> Self {
        Self { shared, registry }
    }
}

impl Subsystem for CombatSubsystem {
    fn name(&self) -> &'static str {
        "combat"
    }

    fn on_tick(&mut self, ctx: &TickContext) {
        let now = ctx.tick_number;
        let mut world = self.shared.lock().unwrap();
        let ready = world.combat.step_gauges();
        let mut dummy_id = || world_model::EventId::from_sequence(0);
        let mut died_players = Vec::new();
        for attacker_id in ready {
            let SharedWorld { cache, combat, propagator, .. } = &mut *world;
            match combat.resolve_swing(attacker_id, &mut cache.characters, now, &mut dummy_id) {
                sim_engine::combat::SwingOutcome::Removed => {}
                sim_engine::combat::SwingOutcome::Hit { event, victim_died } => {
                    let victim_id = match &event.data {
                        EventData::CombatHit { target_id, .. } => *target_id,
                        _ => unreachable!("resolve_swing always produces CombatHit"),
                    };
                    propagator.broadcast(event);
                    if victim_died {
                        let death = dispatcher::handle_death(victim_id, Some(attacker_id), cache, combat, now);
                        propagator.broadcast(death);
                        if cache.character(victim_id).map(|c| c.account_id.is_some()).unwrap_or(false) {
                            died_players.push(victim_id);
                        }
                    }
                }
            }
        }
        drop(world);
        for character_id in died_players {
            self.registry.send_to_player(
                character_id,
                ServerMessage::GameDeath { message: "You have died.".to_string() },
            );
            let registry = self.registry.clone();
            tokio::spawn(async move {
                tokio::time::sleep(DEATH_DISCONNECT_DELAY).await;
                registry.send_to_player(
                    character_id,
                    ServerMessage::GameDisconnect { reason: "you have died".to_string() },
                );
            });
        }
    }
}

/// Drains last tick's oracle outcomes, folds them into agent/queue state,
/// scans for direct-address conversation turns, and spawns this tick's
/// oracle calls. Runs after commands (an AI acting this tick should see
/// commands issued earlier in the same tick reflected in the cache) and
/// before the propagator flush (so its own `ai:*` events join this tick's
/// batch).
pub struct AiProactiveSubsystem {
    shared: Shared,
    oracle: Arc<dyn LlmOracle>,
    store: Arc<dyn WorldStore>,
    outcome_tx: mpsc::UnboundedSender<AiOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<AiOutcome>,
}

impl AiProactiveSubsystem {
    pub fn new(shared: Shared, oracle: Arc<dyn LlmOracle>, store: Arc<dyn WorldStore>) -> Self {
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self { shared, oracle, store, outcome_tx, outcome_rx }
    }

    fn drain_outcomes(&mut self, world: &mut SharedWorld, now: u64) {
        while let Ok(outcome) = self.outcome_rx.try_recv() {
            match outcome {
                AiOutcome::Proactive { agent_id, character_id, result } => match result {
                    Ok(Some(decision)) => {
                        world.propagator.broadcast(GameEvent::builder(
                            EventType::AiDecision,
                            world.cache.character(character_id).map(|c| c.current_room_id).unwrap_or_else(world_model::RoomId::new),
                            EventData::AiDecision { agent_id, reasoning: decision.reasoning.clone() },
                        ).timestamp(now).build());
                        let command_text = render_action_command(&decision);
                        world.command_queue.enqueue(Command::ai(character_id, command_text, now));
                        world.ai.mark_acted(agent_id, now.saturating_mul(100));
                    }
                    Ok(None) => {
                        // Deliberate no-op tick; cooldown does not advance.
                    }
                    Err(error) => {
                        let room_id = world.cache.character(character_id).map(|c| c.current_room_id).unwrap_or_else(world_model::RoomId::new);
                        world.propagator.broadcast(GameEvent::builder(
                            EventType::AiError,
                            room_id,
                            EventData::AiError { agent_id, message: error.to_string() },
                        ).timestamp(now).build());
                    }
                },
                AiOutcome::Conversation { agent_id, character_id, speaker_name, message, result } => match result {
                    Ok(decision) if decision.should_respond => {
                        if let Some(response) = decision.response.clone() {
                            let command_text = format!("say {response}");
                            world.command_queue.enqueue(Command::ai(character_id, command_text, now));
                        }
                        if let Some(agent) = world.cache.agents.get(&agent_id).cloned() {
                            let mut agent = agent;
                            let agent_name = world.cache.character(character_id).map(|c| c.name.clone()).unwrap_or_default();
                            ai_manager::apply_conversation_outcome(
                                &mut agent,
                                &speaker_name,
                                &message,
                                decision.response.as_deref().unwrap_or(""),
                                &agent_name,
                                decision.sentiment_delta,
                                decision.trust_delta,
                                now as i64,
                            );
                            world.cache.insert_agent(agent);
                        }
                    }
                    Ok(_) => {}
                    Err(error) => {
                        let room_id = world.cache.character(character_id).map(|c| c.current_room_id).unwrap_or_else(world_model::RoomId::new);
                        world.propagator.broadcast(GameEvent::builder(
                            EventType::AiError,
                            room_id,
                            EventData::AiError { agent_id, message: error.to_string() },
                        ).timestamp(now).build());
                    }
                },
            }
        }
    }

    fn spawn_conversation_calls(&self, world: &SharedWorld, now_ms: u64) {
        for event in &world.last_tick_events {
            let (speaker_id, target_id, message) = match &event.data {
                EventData::Tell { actor_id, target_id, message } => (*actor_id, *target_id, message.clone()),
                EventData::Whisper { actor_id, target_id, message } => (*actor_id, *target_id, message.clone()),
                _ => continue,
            };
            let Some(agent) = world.cache.agent_for_character(target_id) else { continue };
            let Some(speaker) = world.cache.character(speaker_id) else { continue };
            let agent_name = world.cache.character(target_id).map(|c| c.name.clone()).unwrap_or_default();
            let context = ai_manager::build_conversation_context(agent, &agent_name, &speaker.name, &message);
            let agent_id = agent.id;
            let oracle = self.oracle.clone();
            let tx = self.outcome_tx.clone();
            let store = self.store.clone();
            let speaker_name = speaker.name.clone();
            tokio::spawn(async move {
                let outcome = with_deadline(oracle.decide_response(&context)).await;
                let result = match outcome {
                    Ok(result) => {
                        spawn_usage_append(&store, result.usage);
                        Ok(result.value)
                    }
                    Err(error) => Err(error),
                };
                let _ = tx.send(AiOutcome::Conversation { agent_id, character_id: target_id, speaker_name, message, result });
            });
        }
        let _ = now_ms;
    }

    fn spawn_proactive_calls(&self, world: &mut SharedWorld, now_ms: u64) {
        let agent_ids: Vec<AgentId> = world.cache.agents.keys().copied().collect();
        for agent_id in agent_ids {
            let Some(agent) = world.cache.agents.get(&agent_id) else { continue };
            let character_alive = world.cache.character(agent.character_id).map(|c| c.is_alive).unwrap_or(false);
            let room_id = world.cache.character(agent.character_id).map(|c| c.current_room_id);
            let human_co_located = room_id.map(|r| ai_manager::human_present_in_room(&world.cache, r)).unwrap_or(false);
            if !world.ai.is_due_for_proactive_pass(agent.id, now_ms, character_alive, human_co_located) {
                continue;
            }
            // Mark the attempt before spawning so a no-op-returning oracle
            // still only gets called once per PROACTIVE_INTERVAL_MS.
            world.ai.mark_proactive_attempt(agent.id, now_ms);
            let agent = world.cache.agents.get(&agent_id).expect("checked above");
            let perceived = world.ai.perceived_events(agent.id, now_ms);
            let time_since_last_action_secs = world.ai.time_since_last_action_secs(agent.id, now_ms);
            let context = ai_manager::build_decision_context(
                agent,
                agent.character_id,
                &world.cache,
                &perceived,
                time_since_last_action_secs,
                AVAILABLE_COMMANDS,
            );
            let agent_id = agent.id;
            let character_id = agent.character_id;
            let oracle = self.oracle.clone();
            let tx = self.outcome_tx.clone();
            let store = self.store.clone();
            tokio::spawn(async move {
                let outcome = with_deadline(oracle.decide_action(&context)).await;
                let result = match outcome {
                    Ok(result) => {
                        spawn_usage_append(&store, result.usage);
                        Ok(result.value)
                    }
                    Err(error) => Err(error),
                };
                let _ = tx.send(AiOutcome::Proactive { agent_id, character_id, result });
            });
        }
    }
}

/// Turns an oracle [`ActionDecision`] into a command line the dispatcher
/// already knows how to parse. `arguments` is a loosely typed JSON blob;
/// only the conventional `target`/`direction`/`message` keys are
/// recognised, anything else degrades to a bare verb.
fn render_action_command(decision: &ActionDecision) -> String {
    let arg = |key: &str| decision.arguments.get(key).and_then(|v| v.as_str()).map(str::to_string);
    match decision.action.as_str() {
        "go" => format!("go {}", arg("direction").unwrap_or_default()),
        "attack" => format!("attack {}", arg("target").unwrap_or_default()),
        "say" => format!("say {}", arg("message").unwrap_or_default()),
        "emote" => format!("emote {}", arg("message").unwrap_or_default()),
        "take" => format!("take {}", arg("target").unwrap_or_default()),
        "drop" => format!("drop {}", arg("target").unwrap_or_default()),
        "examine" => format!("examine {}", arg("target").unwrap_or_default()),
        "flee" => "flee".to_string(),
        "stop" => "stop".to_string(),
        other => other.to_string(),
    }
}

impl Subsystem for AiProactiveSubsystem {
    fn name(&self) -> &'static str {
        "ai_proactive"
    }

    fn on_tick(&mut self, ctx: &TickContext) {
        let now_ms = ctx.tick_number.saturating_mul(100);
        let mut world = self.shared.lock().unwrap();
        self.drain_outcomes(&mut world, ctx.tick_number);
        self.spawn_conversation_calls(&world, now_ms);
        self.spawn_proactive_calls(&mut world, now_ms);
    }
}

/// Flushes the tick-local event queue: computes recipients, attenuates,
/// delivers to sockets and AI perception, mirrors to admins, and persists.
/// Runs last so every other subsystem's events join this tick's batch.
pub struct PropagatorSubsystem {
    shared: Shared,
    store: Arc<dyn WorldStore>,
    registry: ConnectionRegistry,
}

impl PropagatorSubsystem {
    pub fn new(shared: Shared, store: Arc<dyn WorldStore>, registry: ConnectionRegistry) -> Self {
        Self { shared, store, registry }
    }
}

impl Subsystem for PropagatorSubsystem {
    fn name(&self) -> &'static str {
        "propagator"
    }

    fn on_tick(&mut self, _ctx: &TickContext) {
        let mut guard = self.shared.lock().unwrap();
        let world: &mut SharedWorld = &mut guard;

        let occupants_by_room = world.cache.occupants_by_room();
        let prop_ctx = PropagatorContext {
            graph: &world.cache.graph,
            characters: &world.cache.characters,
            occupants_by_room: &occupants_by_room,
            listening: &world.listening,
        };

        // Registry clones are cheap (Arc); the sinks only need it for the
        // duration of this flush.
        let mut player_sink = SocketPlayerSink::new(self.registry.clone());
        let mut admin_mirror = SocketAdminMirror::new(self.registry.clone());

        let persisted = world.propagator.flush_queue(&prop_ctx, &mut player_sink, &mut world.ai, &mut admin_mirror);
        let deliveries = player_sink.take_deliveries();

        world.last_tick_events = persisted.clone();

        let store = self.store.clone();
        tokio::spawn(async move {
            for event in persisted {
                let _ = store.append_event(event).await;
            }
        });

        let store = self.store.clone();
        tokio::spawn(async move {
            for (character_id, event, rendered) in deliveries {
                let entry = world_model::PlayerLogEntry {
                    character_id,
                    kind: world_model::PlayerLogKind::Event,
                    payload: serde_json::json!({ "event": event, "rendered": rendered }),
                    timestamp: event.timestamp as i64,
                };
                let _ = store.append_player_log(entry).await;
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sim_engine::store::InMemoryWorldStore;
    use world_model::{Character, Room};

    #[tokio::test]
    async fn dead_actor_commands_are_dropped_before_dispatch() {
        let room = Room::new("Square", "");
        let room_id = room.id;
        let mut character = Character::new_npc("Ghost", room_id, 0);
        character.is_alive = false;
        character.is_dead = true;
        let character_id = character.id;
        let cache = WorldCache::new(vec![room], vec![character], vec![], vec![]);

        let shared: Shared = Arc::new(Mutex::new(SharedWorld::new(cache, 64)));
        shared.lock().unwrap().command_queue.enqueue(Command::player(character_id, "look", 0));

        let registry = ConnectionRegistry::new();
        let store: Arc<dyn WorldStore> = Arc::new(InMemoryWorldStore::new());
        let mut subsystem = CommandSubsystem::new(shared.clone(), registry, store);

        subsystem.on_tick(&TickContext { tick_number: 1, delta_seconds: 0.1, is_paused: false });

        // The command is dropped outright: no output/error is produced and
        // the character's room is untouched (dispatch never ran).
        assert_eq!(shared.lock().unwrap().cache.character(character_id).unwrap().current_room_id, room_id);
    }
}
