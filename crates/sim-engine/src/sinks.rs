//! Delivery endpoints the propagator pushes into.
//!
//! Kept as plain traits passed explicitly into the propagator rather than
//! singletons the engine reaches for internally — same redesign as the
//! listening registry. `server` implements [`PlayerSink`] over a socket
//! registry; [`AiPerceptionSink`] is implemented by the AI Agent Manager's
//! per-agent queues.

use world_model::{AgentId, CharacterId, GameEvent};

pub trait PlayerSink {
    /// Delivers a formatted event to a connected player's socket and
    /// appends it to their player-log. A no-op if the character has no
    /// live connection (e.g. an NPC, or a disconnected player).
    fn deliver_event(&mut self, character_id: CharacterId, event: &GameEvent, rendered: &str);
}

pub trait AiPerceptionSink {
    /// Pushes an event into an AI agent's bounded perception queue.
    fn perceive(&mut self, agent_id: AgentId, event: GameEvent);
}

pub trait AdminMirror {
    /// Broadcasts an omniscient-formatted clone, with the full recipient
    /// list attached, regardless of the event's own visibility/attenuation.
    fn mirror(&mut self, event: &GameEvent, rendered: &str, recipients: &[CharacterId]);
}

/// No-op sinks for tests that only care about propagation logic, not delivery.
#[derive(Default)]
pub struct NullPlayerSink;
impl PlayerSink for NullPlayerSink {
    fn deliver_event(&mut self, _character_id: CharacterId, _event: &GameEvent, _rendered: &str) {}
}

#[derive(Default)]
pub struct NullAiSink;
impl AiPerceptionSink for NullAiSink {
    fn perceive(&mut self, _agent_id: AgentId, _event: GameEvent) {}
}

#[derive(Default)]
pub struct NullAdminMirror;
impl AdminMirror for NullAdminMirror {
    fn mirror(&mut self, _event: &GameEvent, _rendered: &str, _recipients: &[CharacterId]) {}
}

/// Test double that records every delivery for assertions.
#[derive(Default)]
pub struct RecordingPlayerSink {
    pub deliveries: Vec<(CharacterId, String)>,
}
impl PlayerSink for RecordingPlayerSink {
    fn deliver_event(&mut self, character_id: CharacterId, _event: &GameEvent, rendered: &str) {
        self.deliveries.push((character_id, rendered.to_string()));
    }
}

#[derive(Default)]
pub struct RecordingAiSink {
    pub deliveries: Vec<(AgentId, GameEvent)>,
}
impl AiPerceptionSink for RecordingAiSink {
    fn perceive(&mut self, agent_id: AgentId, event: GameEvent) {
        self.deliveries.push((agent_id, event));
    }
}
