//! Event propagation: range computation, attenuation, admin mirror,
//! per-recipient formatting, and delivery.
//!
//! Holds a tick-local FIFO. `broadcast` enqueues; `flush_queue` drains it at
//! its slot in the tick, producing persistence work for the caller and
//! delivering formatted renders directly into the supplied sinks.

use std::collections::{HashSet, VecDeque};

use world_model::{Character, CharacterId, EventData, EventId, EventType, GameEvent, RoomId, Visibility};

use crate::formatter::{format_event, ViewerContext};
use crate::graph::RoomGraph;
use crate::listening::ListeningRegistry;
use crate::sinks::{AdminMirror, AiPerceptionSink, PlayerSink};

/// Who a room occupant is, for delivery routing.
#[derive(Debug, Clone, Copy)]
pub enum Occupant {
    Player(CharacterId),
    Ai(CharacterId, world_model::AgentId),
}

impl Occupant {
    fn character_id(&self) -> CharacterId {
        match self {
            Occupant::Player(id) => *id,
            Occupant::Ai(id, _) => *id,
        }
    }
}

pub struct PropagatorContext<'a> {
    pub graph: &'a RoomGraph,
    pub characters: &'a std::collections::HashMap<CharacterId, Character>,
    /// Every living occupant of every room, keyed by room, precomputed by
    /// the caller once per tick.
    pub occupants_by_room: &'a std::collections::HashMap<RoomId, Vec<Occupant>>,
    pub listening: &'a ListeningRegistry,
}

impl<'a> PropagatorContext<'a> {
    fn actor_name(&self, character_id: CharacterId) -> String {
        self.characters
            .get(&character_id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| "someone".to_string())
    }

    fn room_of(&self, character_id: CharacterId) -> Option<RoomId> {
        self.characters.get(&character_id).map(|c| c.current_room_id)
    }
}

pub struct EventPropagator {
    queue: VecDeque<GameEvent>,
    next_sequence: u64,
}

impl EventPropagator {
    pub fn new() -> Self {
        Self { queue: VecDeque::new(), next_sequence: 1 }
    }

    /// Assigns the next sequence id and enqueues. Call sites that already
    /// have an id (e.g. combat) should prefer [`Self::broadcast_with_id`].
    pub fn broadcast(&mut self, mut event: GameEvent) {
        event.id = EventId::from_sequence(self.next_sequence);
        self.next_sequence += 1;
        self.queue.push_back(event);
    }

    pub fn broadcast_with_id(&mut self, event: GameEvent) {
        self.queue.push_back(event);
    }

    pub fn pending_len(&self) -> usize {
        self.queue.len()
    }

    /// Drains the whole tick-local queue, delivering to sinks as it goes
    /// and returning the (possibly attenuation-rewritten) events that must
    /// still be persisted, in delivery order.
    pub fn flush_queue(
        &mut self,
        ctx: &PropagatorContext<'_>,
        player_sink: &mut dyn PlayerSink,
        ai_sink: &mut dyn AiPerceptionSink,
        admin: &mut dyn AdminMirror,
    ) -> Vec<GameEvent> {
        let mut persisted = Vec::with_capacity(self.queue.len());
        while let Some(mut event) = self.queue.pop_front() {
            let recipients = compute_recipients(&event, ctx);
            let max_distance = recipients.iter().map(|(_, d)| *d).max().unwrap_or(0);

            // The admin mirror is always omniscient: rendered from the event
            // as-is, at distance 0, regardless of how far any other
            // recipient sits from the origin.
            let omniscient_render = format_event(&event, &ViewerContext::omniscient(), |id| ctx.actor_name(id));
            let recipient_ids: Vec<CharacterId> = recipients.iter().map(|(occupant, _)| occupant.character_id()).collect();
            admin.mirror(&event, &omniscient_render, &recipient_ids);

            if !event.event_type.is_admin_only() {
                for (occupant, distance) in &recipients {
                    let viewer_room = ctx.room_of(occupant.character_id());
                    let is_listening = match &event.data {
                        EventData::Tell { actor_id, target_id, .. } => {
                            ctx.listening.overhears(occupant.character_id(), *actor_id, *target_id)
                        }
                        _ => false,
                    };
                    let viewer = ViewerContext::for_actor(occupant.character_id(), viewer_room.unwrap_or(event.origin_room_id), is_listening)
                        .at_distance(*distance);
                    let rendered = format_event(&event, &viewer, |id| ctx.actor_name(id));
                    if rendered.is_empty() {
                        continue;
                    }
                    match occupant {
                        Occupant::Player(character_id) => player_sink.deliver_event(*character_id, &event, &rendered),
                        Occupant::Ai(_, agent_id) => ai_sink.perceive(*agent_id, event.clone()),
                    }
                }
            }

            // `attenuated` is storage bookkeeping only — whether *any*
            // recipient sat beyond the origin room — never consulted by the
            // formatter, which renders per recipient distance instead.
            event.attenuated = max_distance > 0;
            persisted.push(event);
        }
        persisted
    }
}

impl Default for EventPropagator {
    fn default() -> Self {
        Self::new()
    }
}

/// Computes the (occupant, hop-distance) recipient set for one event.
fn compute_recipients(event: &GameEvent, ctx: &PropagatorContext<'_>) -> Vec<(Occupant, u32)> {
    if event.event_type.is_admin_only() {
        return Vec::new();
    }

    if event.visibility == Visibility::Private {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        let mut explicit: Vec<CharacterId> = event.recipients.clone();
        if explicit.is_empty() {
            if let Some(actor) = event.data.actor_id() {
                explicit.push(actor);
            }
        }
        if let EventData::Tell { target_id, .. } | EventData::Whisper { target_id, .. } = &event.data {
            explicit.push(*target_id);
        }
        for character_id in explicit {
            if seen.insert(character_id) {
                if let Some(room_id) = ctx.room_of(character_id) {
                    if let Some(occupants) = ctx.occupants_by_room.get(&room_id) {
                        if let Some(occupant) = occupants.iter().find(|o| o.character_id() == character_id) {
                            out.push((*occupant, 0));
                        }
                    }
                }
            }
        }
        return out;
    }

    if event.event_type.is_actor_scoped() {
        return event
            .data
            .actor_id()
            .and_then(|actor| {
                let room_id = ctx.room_of(actor)?;
                let occupants = ctx.occupants_by_room.get(&room_id)?;
                occupants.iter().find(|o| o.character_id() == actor).map(|o| vec![(*o, 0)])
            })
            .unwrap_or_default();
    }

    if event.event_type == EventType::Movement {
        if let EventData::Movement { from_room_id, to_room_id, .. } = &event.data {
            let mut out = Vec::new();
            for room in [*from_room_id, *to_room_id] {
                if let Some(occupants) = ctx.occupants_by_room.get(&room) {
                    out.extend(occupants.iter().map(|o| (*o, 0)));
                }
            }
            return out;
        }
    }

    let range = event.event_type.range();
    let within = ctx.graph.bfs_within_range(event.origin_room_id, range);
    let mut out = Vec::new();
    for (room_id, distance) in within {
        if let Some(occupants) = ctx.occupants_by_room.get(&room_id) {
            out.extend(occupants.iter().map(|o| (*o, distance)));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sinks::{RecordingAiSink, RecordingPlayerSink};
    use std::collections::HashMap;
    use world_model::{Character, Room};

    fn linear_rooms(n: usize) -> (Vec<Room>, Vec<RoomId>) {
        let mut rooms: Vec<Room> = (0..n).map(|i| Room::new(format!("Room {i}"), "")).collect();
        let ids: Vec<RoomId> = rooms.iter().map(|r| r.id).collect();
        for i in 0..n - 1 {
            rooms[i].exits.insert("north".into(), ids[i + 1]);
            rooms[i + 1].exits.insert("south".into(), ids[i]);
        }
        (rooms, ids)
    }

    #[test]
    fn shout_reaches_neighbour_with_attenuated_content() {
        let (rooms, ids) = linear_rooms(2);
        let graph = RoomGraph::new(rooms);
        let room_a = ids[0];
        let room_b = ids[1];

        let p1 = Character::new_npc("P1", room_a, 0);
        let p2 = Character::new_npc("P2", room_b, 0);
        let p1_id = p1.id;
        let p2_id = p2.id;

        let mut characters = HashMap::new();
        characters.insert(p1_id, p1);
        characters.insert(p2_id, p2);

        let mut occupants = HashMap::new();
        occupants.insert(room_a, vec![Occupant::Player(p1_id)]);
        occupants.insert(room_b, vec![Occupant::Player(p2_id)]);

        let listening = ListeningRegistry::new();
        let ctx = PropagatorContext {
            graph: &graph,
            characters: &characters,
            occupants_by_room: &occupants,
            listening: &listening,
        };

        let mut propagator = EventPropagator::new();
        propagator.broadcast(
            GameEvent::builder(
                EventType::Shout,
                room_a,
                EventData::Shout { actor_id: p1_id, message: "HELLO".into() },
            )
            .visibility(Visibility::Room)
            .build(),
        );

        let mut player_sink = RecordingPlayerSink::default();
        let mut ai_sink = RecordingAiSink::default();
        let mut admin = crate::sinks::NullAdminMirror;
        let persisted = propagator.flush_queue(&ctx, &mut player_sink, &mut ai_sink, &mut admin);

        assert_eq!(persisted.len(), 1);
        assert!(persisted[0].attenuated);

        // P1, the shouter, is a distance-0 recipient of their own shout and
        // must see the near form even though P2 (distance 1) sees the distant one.
        let p1_render = player_sink.deliveries.iter().find(|(id, _)| *id == p1_id).unwrap();
        assert_eq!(p1_render.1, "You shout: \"HELLO\"");

        let p2_render = player_sink.deliveries.iter().find(|(id, _)| *id == p2_id).unwrap();
        assert_eq!(p2_render.1, "You hear a distant shout: HELLO");
    }

    #[test]
    fn private_event_reaches_exactly_the_actor() {
        let room = Room::new("Cell", "");
        let room_id = room.id;
        let graph = RoomGraph::new(vec![room]);
        let actor = Character::new_npc("Solo", room_id, 0);
        let actor_id = actor.id;

        let mut characters = HashMap::new();
        characters.insert(actor_id, actor);
        let mut occupants = HashMap::new();
        occupants.insert(room_id, vec![Occupant::Player(actor_id)]);
        let listening = ListeningRegistry::new();
        let ctx = PropagatorContext { graph: &graph, characters: &characters, occupants_by_room: &occupants, listening: &listening };

        let mut propagator = EventPropagator::new();
        propagator.broadcast(
            GameEvent::builder(
                EventType::System,
                room_id,
                EventData::System { actor_id: Some(actor_id), message: "welcome".into() },
            )
            .visibility(Visibility::Private)
            .build(),
        );

        let mut player_sink = RecordingPlayerSink::default();
        let mut ai_sink = RecordingAiSink::default();
        let mut admin = crate::sinks::NullAdminMirror;
        propagator.flush_queue(&ctx, &mut player_sink, &mut ai_sink, &mut admin);

        assert_eq!(player_sink.deliveries.len(), 1);
        assert_eq!(player_sink.deliveries[0].0, actor_id);
    }
}
