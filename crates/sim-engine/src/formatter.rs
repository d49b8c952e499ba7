//! Perspective-aware rendering of a [`GameEvent`] into plain text.
//!
//! A pure function: same event, same viewer, same listening state, same
//! string, always. No I/O, no mutation — the propagator calls this once per
//! recipient per event.

use world_model::{CharacterId, EventData, EventType, GameEvent, RoomId};

/// Viewer-specific rendering inputs. `None` viewer id means the omniscient
/// (admin) perspective. `distance` is this viewer's own hop-distance from
/// the event's origin room — the attenuation rewrite is keyed off *this*,
/// never off a single event-wide flag, since two recipients of the same
/// event can sit at different distances (the shouter in the origin room at
/// distance 0, a neighbour at distance 1).
pub struct ViewerContext {
    pub viewer_actor_id: Option<CharacterId>,
    pub viewer_room_id: Option<RoomId>,
    pub is_listening: bool,
    pub distance: u32,
}

impl ViewerContext {
    /// The admin mirror: always renders the near, un-attenuated form,
    /// regardless of how far any other recipient sat from the origin.
    pub fn omniscient() -> Self {
        Self { viewer_actor_id: None, viewer_room_id: None, is_listening: false, distance: 0 }
    }

    pub fn for_actor(actor_id: CharacterId, room_id: RoomId, is_listening: bool) -> Self {
        Self { viewer_actor_id: Some(actor_id), viewer_room_id: Some(room_id), is_listening, distance: 0 }
    }

    pub fn at_distance(mut self, distance: u32) -> Self {
        self.distance = distance;
        self
    }
}

fn opposite_direction(direction: &str) -> String {
    match direction.to_ascii_lowercase().as_str() {
        "north" => "south".into(),
        "south" => "north".into(),
        "east" => "west".into(),
        "west" => "east".into(),
        "northeast" => "southwest".into(),
        "southwest" => "northeast".into(),
        "northwest" => "southeast".into(),
        "southeast" => "northwest".into(),
        "up" => "below".into(),
        "down" => "above".into(),
        _ => "somewhere".into(),
    }
}

/// Renders `event` for the given viewer. Returns `""` for a render the
/// propagator should discard (e.g. the mover's own arrival side).
pub fn format_event(
    event: &GameEvent,
    viewer: &ViewerContext,
    actor_name: impl Fn(CharacterId) -> String,
) -> String {
    match &event.data {
        EventData::Say { actor_id, message } => {
            perspective_speech(viewer, *actor_id, &actor_name(*actor_id), |who| format!("{who} says: \"{message}\""), || "You say: ".to_string() + &format!("\"{message}\""))
        }
        EventData::Shout { actor_id, message } => {
            if viewer.distance > 0 {
                format!("You hear a distant shout: {message}")
            } else if viewer.viewer_actor_id == Some(*actor_id) {
                format!("You shout: \"{message}\"")
            } else {
                format!("{} shouts: \"{}\"", actor_name(*actor_id), message)
            }
        }
        EventData::Emote { actor_id, action } => {
            if viewer.viewer_actor_id == Some(*actor_id) {
                format!("You {action}")
            } else {
                format!("{} {}", actor_name(*actor_id), action)
            }
        }
        EventData::Tell { actor_id, target_id, message } => {
            format_tell(viewer, *actor_id, *target_id, message, &actor_name)
        }
        EventData::Whisper { actor_id, target_id, message } => {
            format_whisper(viewer, *actor_id, *target_id, message, &actor_name)
        }
        EventData::Movement { actor_id, from_room_id, to_room_id, direction } => {
            format_movement(viewer, *actor_id, *from_room_id, *to_room_id, direction, &actor_name)
        }
        EventData::PlayerEntered { actor_id } => format!("{} enters.", actor_name(*actor_id)),
        EventData::PlayerLeft { actor_id } => format!("{} leaves.", actor_name(*actor_id)),
        EventData::RoomDescription { .. } => String::new(),
        EventData::CombatStart { attacker_id, target_id } => {
            if viewer.distance > 0 {
                "You hear the clash of combat in the distance.".to_string()
            } else {
                format!("{} attacks {}!", actor_name(*attacker_id), actor_name(*target_id))
            }
        }
        EventData::CombatHit { attacker_id, target_id, damage, .. } => {
            if viewer.viewer_actor_id == Some(*target_id) {
                format!("{} hits you for {} damage!", actor_name(*attacker_id), damage)
            } else if viewer.viewer_actor_id == Some(*attacker_id) {
                format!("You hit {} for {} damage!", actor_name(*target_id), damage)
            } else {
                format!("{} hits {} for {} damage!", actor_name(*attacker_id), actor_name(*target_id), damage)
            }
        }
        EventData::Death { victim_id, .. } => {
            if viewer.distance > 0 {
                "You sense a death somewhere nearby.".to_string()
            } else if viewer.viewer_actor_id == Some(*victim_id) {
                "You have died.".to_string()
            } else {
                format!("{} has died.", actor_name(*victim_id))
            }
        }
        EventData::ItemPickup { actor_id, item_name, .. } => {
            if viewer.viewer_actor_id == Some(*actor_id) {
                format!("You pick up {item_name}.")
            } else {
                format!("{} picks up {}.", actor_name(*actor_id), item_name)
            }
        }
        EventData::ItemDrop { actor_id, item_name, .. } => {
            if viewer.viewer_actor_id == Some(*actor_id) {
                format!("You drop {item_name}.")
            } else {
                format!("{} drops {}.", actor_name(*actor_id), item_name)
            }
        }
        EventData::ItemEquip { actor_id, item_name, equipped, .. } => {
            let verb = if *equipped { "equip" } else { "unequip" };
            if viewer.viewer_actor_id == Some(*actor_id) {
                format!("You {verb} {item_name}.")
            } else {
                format!("{} {}s {}.", actor_name(*actor_id), verb, item_name)
            }
        }
        EventData::System { message, .. } => message.clone(),
        EventData::Ambient { message } => message.clone(),
        EventData::Connection { actor_id, connected } => {
            if *connected {
                format!("{} has connected.", actor_name(*actor_id))
            } else {
                format!("{} has disconnected.", actor_name(*actor_id))
            }
        }
        EventData::StateChange { message, .. } => message.clone(),
        EventData::AiDecision { reasoning, .. } => format!("[ai:decision] {reasoning}"),
        EventData::AiAction { action, .. } => format!("[ai:action] {action}"),
        EventData::AiError { message, .. } => format!("[ai:error] {message}"),
    }
}

fn perspective_speech(
    viewer: &ViewerContext,
    actor_id: CharacterId,
    actor_label: &str,
    third_person: impl Fn(&str) -> String,
    first_person: impl Fn() -> String,
) -> String {
    if viewer.viewer_actor_id == Some(actor_id) {
        first_person()
    } else {
        third_person(actor_label)
    }
}

/// `tell` is room-visible but obfuscated: only participants, or a listener
/// subscribed to either party, see the quoted content.
fn format_tell(
    viewer: &ViewerContext,
    actor_id: CharacterId,
    target_id: CharacterId,
    message: &str,
    actor_name: &impl Fn(CharacterId) -> String,
) -> String {
    match viewer.viewer_actor_id {
        Some(id) if id == actor_id => format!("You say to {}: \"{}\"", actor_name(target_id), message),
        Some(id) if id == target_id => format!("{} says to you: \"{}\"", actor_name(actor_id), message),
        Some(_) if viewer.is_listening => {
            format!("{} says to {}: \"{}\"", actor_name(actor_id), actor_name(target_id), message)
        }
        _ => format!("{} says something to {}.", actor_name(actor_id), actor_name(target_id)),
    }
}

/// `whisper` observers never see content, and normally don't receive the
/// event at all — this branch only fires if something routed it to them anyway.
fn format_whisper(
    viewer: &ViewerContext,
    actor_id: CharacterId,
    target_id: CharacterId,
    message: &str,
    actor_name: &impl Fn(CharacterId) -> String,
) -> String {
    match viewer.viewer_actor_id {
        Some(id) if id == actor_id => format!("You whisper to {}: \"{}\"", actor_name(target_id), message),
        Some(id) if id == target_id => format!("{} whispers to you: \"{}\"", actor_name(actor_id), message),
        _ => String::new(),
    }
}

fn format_movement(
    viewer: &ViewerContext,
    actor_id: CharacterId,
    from_room_id: RoomId,
    to_room_id: RoomId,
    direction: &str,
    actor_name: &impl Fn(CharacterId) -> String,
) -> String {
    let is_mover = viewer.viewer_actor_id == Some(actor_id);
    match viewer.viewer_room_id {
        Some(room) if room == from_room_id => {
            if is_mover {
                format!("You move {direction}.")
            } else {
                format!("{} moves {}.", actor_name(actor_id), direction)
            }
        }
        Some(room) if room == to_room_id => {
            if is_mover {
                // The mover's arrival is conveyed by the subsequent room_description.
                String::new()
            } else {
                format!("{} arrives from the {}.", actor_name(actor_id), opposite_direction(direction))
            }
        }
        _ => String::new(),
    }
}

/// Dispatches event type to range and treats `movement` as delivered to
/// both origin and destination regardless of its own zero range — callers
/// that need the spatial rule directly can match on [`EventType::Movement`].
pub fn is_movement(event_type: EventType) -> bool {
    matches!(event_type, EventType::Movement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use world_model::{EventId, Visibility};

    fn name_fn() -> impl Fn(CharacterId) -> String {
        |_| "Rowan".to_string()
    }

    #[test]
    fn movement_departure_and_arrival_use_opposite_directions() {
        let actor = CharacterId::new();
        let origin = RoomId::new();
        let destination = RoomId::new();
        let event = GameEvent::builder(
            EventType::Movement,
            origin,
            EventData::Movement { actor_id: actor, from_room_id: origin, to_room_id: destination, direction: "north".into() },
        )
        .id(EventId::from_sequence(1))
        .visibility(Visibility::Room)
        .build();

        let observer_in_origin = ViewerContext::for_actor(CharacterId::new(), origin, false);
        let observer_in_destination = ViewerContext::for_actor(CharacterId::new(), destination, false);
        let mover_in_destination = ViewerContext::for_actor(actor, destination, false);

        assert_eq!(format_event(&event, &observer_in_origin, name_fn()), "Rowan moves north.");
        assert_eq!(format_event(&event, &observer_in_destination, name_fn()), "Rowan arrives from the south.");
        assert_eq!(format_event(&event, &mover_in_destination, name_fn()), "");
    }

    #[test]
    fn tell_is_obfuscated_unless_listening_or_participant() {
        let sender = CharacterId::new();
        let target = CharacterId::new();
        let room = RoomId::new();
        let event = GameEvent::builder(
            EventType::Tell,
            room,
            EventData::Tell { actor_id: sender, target_id: target, message: "second plan".into() },
        )
        .id(EventId::from_sequence(1))
        .visibility(Visibility::Room)
        .build();

        let names = |id: CharacterId| if id == sender { "P1".to_string() } else { "P2".to_string() };

        let bystander = ViewerContext::for_actor(CharacterId::new(), room, false);
        assert_eq!(format_event(&event, &bystander, names), "P1 says something to P2.");

        let listener = ViewerContext::for_actor(CharacterId::new(), room, true);
        assert_eq!(format_event(&event, &listener, names), "P1 says to P2: \"second plan\"");

        let recipient = ViewerContext::for_actor(target, room, false);
        assert_eq!(format_event(&event, &recipient, names), "P1 says to you: \"second plan\"");
    }

    #[test]
    fn shout_at_distance_is_prefixed_and_attenuated() {
        let actor = CharacterId::new();
        let room = RoomId::new();
        let event = GameEvent::builder(
            EventType::Shout,
            room,
            EventData::Shout { actor_id: actor, message: "HELLO".into() },
        )
        .id(EventId::from_sequence(1))
        .build();

        let observer = ViewerContext::for_actor(CharacterId::new(), room, false).at_distance(1);
        assert_eq!(format_event(&event, &observer, name_fn()), "You hear a distant shout: HELLO");
    }

    #[test]
    fn shouter_in_origin_room_hears_own_voice_even_when_shout_also_reaches_a_neighbour() {
        let actor = CharacterId::new();
        let room = RoomId::new();
        let event = GameEvent::builder(
            EventType::Shout,
            room,
            EventData::Shout { actor_id: actor, message: "HELLO".into() },
        )
        .id(EventId::from_sequence(1))
        .build();

        // Same event, but this viewer is the shouter at distance 0 — must not
        // see the distant rendering just because some other recipient is farther away.
        let shouter = ViewerContext::for_actor(actor, room, false).at_distance(0);
        assert_eq!(format_event(&event, &shouter, name_fn()), "You shout: \"HELLO\"");
    }
}
