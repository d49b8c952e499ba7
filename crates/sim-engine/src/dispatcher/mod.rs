//! Command parsing and routing.
//!
//! `dispatch` takes one whitespace-normalised line and the actor issuing
//! it, mutates the world cache in place, and returns a [`CommandResult`]:
//! the events to hand to the propagator plus optional structured output for
//! the commanding socket. Output always reaches the actor before any of
//! this command's events are delivered — the caller is responsible for
//! that ordering, this module only guarantees the result carries both.

mod parse;

use rand::Rng;

use world_model::{
    CharacterId, EventData, EventType, GameEvent, Item, ItemId, ItemLocation, ItemType, RoomId, Visibility,
};

use crate::combat::{attempt_flee, death_event, CombatTable, DEFAULT_FLEE_SUCCESS_PROBABILITY};
use crate::listening::ListeningRegistry;
use crate::world_cache::WorldCache;

pub use parse::{resolve_target, Candidate};

#[derive(Debug, Clone, serde::Serialize)]
pub struct RoomView {
    pub name: String,
    pub description: String,
    pub exits: Vec<String>,
    pub characters: Vec<String>,
    pub items: Vec<String>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct InventoryView {
    pub items: Vec<InventoryEntry>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct InventoryEntry {
    pub name: String,
    pub equipped: bool,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ItemDetailView {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CharacterDetailView {
    pub name: String,
    pub health_word: String,
}

#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "view")]
pub enum StructuredOutput {
    Room(RoomView),
    Inventory(InventoryView),
    ItemDetail(ItemDetailView),
    CharacterDetail(CharacterDetailView),
    SystemMessage { message: String },
}

#[derive(Debug, Default)]
pub struct CommandResult {
    pub success: bool,
    pub events: Vec<GameEvent>,
    pub output: Option<StructuredOutput>,
    pub error: Option<String>,
}

impl CommandResult {
    fn ok(events: Vec<GameEvent>, output: Option<StructuredOutput>) -> Self {
        Self { success: true, events, output, error: None }
    }

    fn err(message: impl Into<String>) -> Self {
        Self { success: false, events: Vec::new(), output: None, error: Some(message.into()) }
    }
}

fn expand_direction_shortcut(token: &str) -> &str {
    match token {
        "n" => "north",
        "s" => "south",
        "e" => "east",
        "w" => "west",
        "u" => "up",
        "d" => "down",
        other => other,
    }
}

/// Parses and executes one command line for `actor_id`.
pub fn dispatch(
    actor_id: CharacterId,
    text: &str,
    world: &mut WorldCache,
    combat: &mut CombatTable,
    listening: &mut ListeningRegistry,
    now: u64,
    rng: &mut impl Rng,
) -> CommandResult {
    let normalized = text.trim();
    if normalized.is_empty() {
        return CommandResult::err("Unknown command");
    }
    let mut parts = normalized.splitn(2, char::is_whitespace);
    let raw_verb = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();
    let verb = expand_direction_shortcut(&raw_verb.to_ascii_lowercase());

    match verb {
        "look" | "l" => cmd_look(actor_id, world),
        "north" | "south" | "east" | "west" | "up" | "down" => cmd_go(actor_id, verb, world),
        "go" | "move" => {
            if rest.is_empty() {
                CommandResult::err("Go where?")
            } else {
                cmd_go(actor_id, &expand_direction_shortcut(&rest.to_ascii_lowercase()).to_string(), world)
            }
        }
        "say" => cmd_say(actor_id, rest, world),
        "shout" => cmd_shout(actor_id, rest, world),
        "emote" => cmd_emote(actor_id, rest, world),
        "tell" => cmd_tell(actor_id, rest, world, listening),
        "whisper" => cmd_whisper(actor_id, rest, world),
        "inventory" | "i" => cmd_inventory(actor_id, world),
        "take" => cmd_take(actor_id, rest, world),
        "drop" => cmd_drop(actor_id, rest, world),
        "equip" => cmd_equip(actor_id, rest, world, true),
        "unequip" => cmd_equip(actor_id, rest, world, false),
        "examine" | "ex" => cmd_examine(actor_id, rest, world),
        "attack" | "kill" | "fight" | "hit" => cmd_attack(actor_id, rest, world, combat, listening),
        "flee" | "run" | "escape" => cmd_flee(actor_id, world, combat, rng),
        "stop" => cmd_stop(actor_id, combat, listening),
        "listen" | "ls" => cmd_listen(actor_id, rest, world, listening, combat),
        _ => CommandResult::err("Unknown command"),
    }
}

fn cmd_look(actor_id: CharacterId, world: &WorldCache) -> CommandResult {
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let Some(room) = world.room(actor.current_room_id) else {
        return CommandResult::err("You are nowhere.");
    };

    let mut exits: Vec<String> = room.exits.keys().cloned().collect();
    exits.sort();

    let characters: Vec<String> = world
        .characters_in_room(actor.current_room_id, Some(actor_id))
        .into_iter()
        .map(|c| c.name.clone())
        .collect();
    let items: Vec<String> = world.items_in_room(actor.current_room_id).into_iter().map(|i| i.name.clone()).collect();

    CommandResult::ok(
        Vec::new(),
        Some(StructuredOutput::Room(RoomView {
            name: room.name.clone(),
            description: room.description.clone(),
            exits,
            characters,
            items,
        })),
    )
}

fn cmd_go(actor_id: CharacterId, direction: &str, world: &mut WorldCache) -> CommandResult {
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let from_room_id = actor.current_room_id;
    let Some(room) = world.room(from_room_id) else {
        return CommandResult::err("You are nowhere.");
    };
    let Some(to_room_id) = room.exit_toward(direction) else {
        return CommandResult::err("You can't go that way");
    };

    if let Some(character) = world.character_mut(actor_id) {
        character.current_room_id = to_room_id;
    }

    let movement = GameEvent::builder(
        EventType::Movement,
        from_room_id,
        EventData::Movement { actor_id, from_room_id, to_room_id, direction: direction.to_string() },
    )
    .visibility(Visibility::Room)
    .build();

    let room_description = GameEvent::builder(
        EventType::RoomDescription,
        to_room_id,
        EventData::RoomDescription { actor_id, room_id: to_room_id },
    )
    .visibility(Visibility::Private)
    .recipients(vec![actor_id])
    .build();

    CommandResult::ok(vec![movement, room_description], None)
}

fn cmd_say(actor_id: CharacterId, message: &str, world: &WorldCache) -> CommandResult {
    if message.is_empty() {
        return CommandResult::err("Say what?");
    }
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let event = GameEvent::builder(
        EventType::Say,
        actor.current_room_id,
        EventData::Say { actor_id, message: message.to_string() },
    )
    .visibility(Visibility::Room)
    .build();
    CommandResult::ok(vec![event], None)
}

fn cmd_shout(actor_id: CharacterId, message: &str, world: &WorldCache) -> CommandResult {
    if message.is_empty() {
        return CommandResult::err("Shout what?");
    }
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let event = GameEvent::builder(
        EventType::Shout,
        actor.current_room_id,
        EventData::Shout { actor_id, message: message.to_string() },
    )
    .visibility(Visibility::Room)
    .build();
    CommandResult::ok(vec![event], None)
}

fn cmd_emote(actor_id: CharacterId, action: &str, world: &WorldCache) -> CommandResult {
    if action.is_empty() {
        return CommandResult::err("Emote what?");
    }
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let event = GameEvent::builder(
        EventType::Emote,
        actor.current_room_id,
        EventData::Emote { actor_id, action: action.to_string() },
    )
    .visibility(Visibility::Room)
    .build();
    CommandResult::ok(vec![event], None)
}

fn present_candidates(world: &WorldCache, room_id: RoomId, exclude: CharacterId) -> Vec<Candidate<'_, CharacterId>> {
    world
        .characters_in_room(room_id, Some(exclude))
        .into_iter()
        .map(|c| Candidate { id: c.id, name: c.name.as_str() })
        .collect()
}

/// Inventory-then-room item candidates, in that precedence order, for the
/// same greedy parser `resolve_target` uses for characters.
fn item_candidates(world: &WorldCache, actor_id: CharacterId, room_id: RoomId) -> Vec<Candidate<'_, ItemId>> {
    let mut items: Vec<&Item> = world.items_held_by(actor_id);
    items.extend(world.items_in_room(room_id));
    items.into_iter().map(|i| Candidate { id: i.id, name: i.name.as_str() }).collect()
}

/// `tell` is visibility room but obfuscated for non-participants unless the
/// observer is listening — see the formatter. Kept as a room broadcast per
/// the design note: this is intentional, not an oversight.
fn cmd_tell(actor_id: CharacterId, rest: &str, world: &WorldCache, _listening: &ListeningRegistry) -> CommandResult {
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let candidates = present_candidates(world, actor.current_room_id, actor_id);
    let Some((target_id, message)) = resolve_target(rest, &candidates, CharacterId::from_uuid) else {
        return CommandResult::err("Tell whom?");
    };
    if message.is_empty() {
        return CommandResult::err("Tell them what?");
    }
    let event = GameEvent::builder(
        EventType::Tell,
        actor.current_room_id,
        EventData::Tell { actor_id, target_id, message: message.to_string() },
    )
    .visibility(Visibility::Room)
    .build();
    CommandResult::ok(vec![event], None)
}

fn cmd_whisper(actor_id: CharacterId, rest: &str, world: &WorldCache) -> CommandResult {
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let candidates = present_candidates(world, actor.current_room_id, actor_id);
    let Some((target_id, message)) = resolve_target(rest, &candidates, CharacterId::from_uuid) else {
        return CommandResult::err("Whisper to whom?");
    };
    if message.is_empty() {
        return CommandResult::err("Whisper what?");
    }
    let event = GameEvent::builder(
        EventType::Whisper,
        actor.current_room_id,
        EventData::Whisper { actor_id, target_id, message: message.to_string() },
    )
    .visibility(Visibility::Private)
    .recipients(vec![actor_id, target_id])
    .build();
    CommandResult::ok(vec![event], None)
}

fn cmd_inventory(actor_id: CharacterId, world: &WorldCache) -> CommandResult {
    let items: Vec<InventoryEntry> = world
        .items_held_by(actor_id)
        .into_iter()
        .map(|i| InventoryEntry { name: i.name.clone(), equipped: i.is_equipped })
        .collect();
    CommandResult::ok(Vec::new(), Some(StructuredOutput::Inventory(InventoryView { items })))
}

fn find_item_in(name: &str, items: Vec<&Item>) -> Option<ItemId> {
    items.into_iter().find(|i| i.name.eq_ignore_ascii_case(name)).map(|i| i.id)
}

fn cmd_take(actor_id: CharacterId, name: &str, world: &mut WorldCache) -> CommandResult {
    if name.is_empty() {
        return CommandResult::err("Take what?");
    }
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let room_id = actor.current_room_id;
    let Some(item_id) = find_item_in(name, world.items_in_room(room_id)) else {
        return CommandResult::err("You don't see that here.");
    };
    let item = world.items.get(&item_id).unwrap();
    if !item.is_takeable() {
        return CommandResult::err("You can't take that.");
    }
    let item_name = item.name.clone();
    world.items.get_mut(&item_id).unwrap().location = ItemLocation::Character(actor_id);

    let event = GameEvent::builder(
        EventType::ItemPickup,
        room_id,
        EventData::ItemPickup { actor_id, item_id, item_name },
    )
    .visibility(Visibility::Room)
    .build();
    CommandResult::ok(vec![event], None)
}

fn cmd_drop(actor_id: CharacterId, name: &str, world: &mut WorldCache) -> CommandResult {
    if name.is_empty() {
        return CommandResult::err("Drop what?");
    }
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let room_id = actor.current_room_id;
    let Some(item_id) = find_item_in(name, world.items_held_by(actor_id)) else {
        return CommandResult::err("You aren't carrying that.");
    };
    let item_name = world.items.get(&item_id).unwrap().name.clone();
    let was_equipped = world.items.get(&item_id).unwrap().is_equipped;
    {
        let item = world.items.get_mut(&item_id).unwrap();
        item.location = ItemLocation::Room(room_id);
        item.is_equipped = false;
    }
    if was_equipped {
        world.recompute_stats(actor_id);
    }

    let event = GameEvent::builder(
        EventType::ItemDrop,
        room_id,
        EventData::ItemDrop { actor_id, item_id, item_name },
    )
    .visibility(Visibility::Room)
    .build();
    CommandResult::ok(vec![event], None)
}

/// Shared slot key for "only one equipped item of this type at a time".
fn equip_slot(item_type: ItemType) -> Option<ItemType> {
    match item_type {
        ItemType::Weapon | ItemType::Armor => Some(item_type),
        _ => None,
    }
}

fn cmd_equip(actor_id: CharacterId, name: &str, world: &mut WorldCache, equip: bool) -> CommandResult {
    if name.is_empty() {
        return CommandResult::err(if equip { "Equip what?" } else { "Unequip what?" });
    }
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let room_id = actor.current_room_id;
    let Some(item_id) = find_item_in(name, world.items_held_by(actor_id)) else {
        return CommandResult::err("You aren't carrying that.");
    };

    let item_type = world.items.get(&item_id).unwrap().item_type;
    if equip {
        if let Some(slot) = equip_slot(item_type) {
            let same_slot: Vec<ItemId> = world
                .items_held_by(actor_id)
                .into_iter()
                .filter(|i| i.is_equipped && i.item_type == slot && i.id != item_id)
                .map(|i| i.id)
                .collect();
            for other in same_slot {
                world.items.get_mut(&other).unwrap().is_equipped = false;
            }
        }
        world.items.get_mut(&item_id).unwrap().is_equipped = true;
    } else {
        world.items.get_mut(&item_id).unwrap().is_equipped = false;
    }
    world.recompute_stats(actor_id);

    let item_name = world.items.get(&item_id).unwrap().name.clone();
    let event = GameEvent::builder(
        EventType::ItemEquip,
        room_id,
        EventData::ItemEquip { actor_id, item_id, item_name, equipped: equip },
    )
    .visibility(Visibility::Room)
    .build();
    CommandResult::ok(vec![event], None)
}

/// Resolves the same way `tell`/`whisper`/`listen` do: greedy prefix match,
/// quoted names, and the explicit `@id:<uuid>` form, against inventory+room
/// items first, then characters in the room.
fn cmd_examine(actor_id: CharacterId, name: &str, world: &WorldCache) -> CommandResult {
    if name.is_empty() {
        return CommandResult::err("Examine what?");
    }
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let room_id = actor.current_room_id;

    let items = item_candidates(world, actor_id, room_id);
    if let Some((item_id, _)) = resolve_target(name, &items, ItemId::from_uuid) {
        let item = world.items.get(&item_id).unwrap();
        return CommandResult::ok(
            Vec::new(),
            Some(StructuredOutput::ItemDetail(ItemDetailView { name: item.name.clone(), description: item.description.clone() })),
        );
    }

    let candidates = present_candidates(world, room_id, actor_id);
    if let Some((character_id, _)) = resolve_target(name, &candidates, CharacterId::from_uuid) {
        let target = world.character(character_id).unwrap();
        return CommandResult::ok(
            Vec::new(),
            Some(StructuredOutput::CharacterDetail(CharacterDetailView {
                name: target.name.clone(),
                health_word: target.health_word().to_string(),
            })),
        );
    }

    CommandResult::err("You don't see that here.")
}

fn cmd_attack(
    actor_id: CharacterId,
    name: &str,
    world: &mut WorldCache,
    combat: &mut CombatTable,
    listening: &mut ListeningRegistry,
) -> CommandResult {
    if listening.is_listening(actor_id) {
        return CommandResult::err("You can't fight while trying to eavesdrop.");
    }
    if name.is_empty() {
        return CommandResult::err("Attack whom?");
    }
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let room_id = actor.current_room_id;
    let actor_speed = actor.speed;
    let candidates = present_candidates(world, room_id, actor_id);
    let Some(candidate) = candidates.iter().find(|c| c.name.eq_ignore_ascii_case(name)) else {
        return CommandResult::err("They aren't here.");
    };
    let target_id = candidate.id;
    if target_id == actor_id {
        return CommandResult::err("You can't attack yourself.");
    }
    let Some(target) = world.character(target_id) else {
        return CommandResult::err("They aren't here.");
    };
    if !target.is_alive {
        return CommandResult::err("They are already dead.");
    }
    let target_name = target.name.clone();

    combat.start_combat(actor_id, target_id, actor_speed);

    let event = GameEvent::builder(
        EventType::CombatStart,
        room_id,
        EventData::CombatStart { attacker_id: actor_id, target_id },
    )
    .visibility(Visibility::Room)
    .build();

    CommandResult::ok(
        vec![event],
        Some(StructuredOutput::SystemMessage { message: format!("You attack {target_name}!") }),
    )
}

fn cmd_flee(actor_id: CharacterId, world: &mut WorldCache, combat: &mut CombatTable, rng: &mut impl Rng) -> CommandResult {
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let room_id = actor.current_room_id;
    let Some(room) = world.room(room_id) else {
        return CommandResult::err("There is nowhere to run!");
    };
    if room.exits.is_empty() {
        return CommandResult::err("There is nowhere to run!");
    }

    let roll: f64 = rng.gen_range(0.0..1.0);
    match attempt_flee(combat, actor_id, DEFAULT_FLEE_SUCCESS_PROBABILITY, roll) {
        Err(message) => CommandResult::err(message),
        Ok(()) => {
            let exits: Vec<(String, RoomId)> = room.exits.iter().map(|(d, r)| (d.clone(), *r)).collect();
            let index = rng.gen_range(0..exits.len());
            let (direction, to_room_id) = exits[index].clone();
            if let Some(character) = world.character_mut(actor_id) {
                character.current_room_id = to_room_id;
            }
            let movement = GameEvent::builder(
                EventType::Movement,
                room_id,
                EventData::Movement { actor_id, from_room_id: room_id, to_room_id, direction },
            )
            .visibility(Visibility::Room)
            .build();
            CommandResult::ok(vec![movement], None)
        }
    }
}

fn cmd_stop(actor_id: CharacterId, combat: &mut CombatTable, listening: &mut ListeningRegistry) -> CommandResult {
    let stopped_combat = combat.remove(actor_id);
    let stopped_listening = listening.stop(actor_id);
    if !stopped_combat && !stopped_listening {
        return CommandResult::err("You aren't fighting or listening.");
    }
    let mut parts = Vec::new();
    if stopped_combat {
        parts.push("fighting");
    }
    if stopped_listening {
        parts.push("listening");
    }
    CommandResult::ok(
        Vec::new(),
        Some(StructuredOutput::SystemMessage { message: format!("You stop {}.", parts.join(" and ")) }),
    )
}

fn cmd_listen(
    actor_id: CharacterId,
    rest: &str,
    world: &WorldCache,
    listening: &mut ListeningRegistry,
    combat: &CombatTable,
) -> CommandResult {
    if rest.eq_ignore_ascii_case("stop") {
        listening.stop(actor_id);
        return CommandResult::ok(
            Vec::new(),
            Some(StructuredOutput::SystemMessage { message: "You stop listening.".to_string() }),
        );
    }
    if combat.is_fighting(actor_id) {
        return CommandResult::err("You can't listen while in combat.");
    }
    if rest.is_empty() {
        return CommandResult::err("Listen to whom?");
    }
    let Some(actor) = world.character(actor_id) else {
        return CommandResult::err("You don't exist.");
    };
    let candidates = present_candidates(world, actor.current_room_id, actor_id);
    let Some((target_id, _)) = resolve_target(rest, &candidates, CharacterId::from_uuid) else {
        return CommandResult::err("They aren't here.");
    };
    listening.start(actor_id, target_id);
    CommandResult::ok(Vec::new(), Some(StructuredOutput::SystemMessage { message: "You start listening.".to_string() }))
}

/// Called by the combat subsystem once a swing kills its target: produces
/// the corpse item and the death event. Kept here alongside the other
/// command-shaped mutations since it mirrors `drop`'s item-placement logic.
pub fn handle_death(
    victim_id: CharacterId,
    killer_id: Option<CharacterId>,
    world: &mut WorldCache,
    combat: &mut CombatTable,
    now: u64,
) -> GameEvent {
    let room_id = world.character(victim_id).map(|c| c.current_room_id).unwrap_or_else(RoomId::new);
    let held: Vec<ItemId> = world.items_held_by(victim_id).into_iter().map(|i| i.id).collect();
    let mut dropped_names = Vec::new();
    for item_id in &held {
        let item = world.items.get_mut(item_id).unwrap();
        item.location = ItemLocation::Room(room_id);
        item.is_equipped = false;
        dropped_names.push(item.name.clone());
    }

    let victim_name = world.character(victim_id).map(|c| c.name.clone()).unwrap_or_else(|| "Someone".into());
    let description = if dropped_names.is_empty() {
        format!("The corpse of {victim_name}.")
    } else {
        format!("The corpse of {victim_name}, surrounded by: {}.", dropped_names.join(", "))
    };
    let mut corpse = Item::new(format!("{victim_name}'s corpse"), description, ItemType::Misc);
    corpse.location = ItemLocation::Room(room_id);
    world.items.insert(corpse.id, corpse);

    combat.remove_victim(victim_id);

    death_event(victim_id, killer_id, room_id, now, world_model::EventId::from_sequence(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;
    use world_model::Room;

    fn two_room_world() -> (WorldCache, RoomId, RoomId, CharacterId) {
        let mut room_a = Room::new("A", "a plain room");
        let room_b = Room::new("B", "another room");
        room_a.exits.insert("north".into(), room_b.id);
        let room_a_id = room_a.id;
        let room_b_id = room_b.id;
        let actor = world_model::Character::new_npc("Mover", room_a_id, 0);
        let actor_id = actor.id;
        let world = WorldCache::new(vec![room_a, room_b], vec![actor], vec![], vec![]);
        (world, room_a_id, room_b_id, actor_id)
    }

    #[test]
    fn go_unknown_direction_fails() {
        let (mut world, _, _, actor_id) = two_room_world();
        let mut combat = CombatTable::new();
        let mut listening = ListeningRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let result = dispatch(actor_id, "go south", &mut world, &mut combat, &mut listening, 0, &mut rng);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("You can't go that way"));
    }

    #[test]
    fn directional_shortcut_moves_and_emits_movement_then_room_description() {
        let (mut world, room_a, room_b, actor_id) = two_room_world();
        let mut combat = CombatTable::new();
        let mut listening = ListeningRegistry::new();
        let mut rng = SmallRng::seed_from_u64(1);
        let result = dispatch(actor_id, "n", &mut world, &mut combat, &mut listening, 0, &mut rng);
        assert!(result.success);
        assert_eq!(world.character(actor_id).unwrap().current_room_id, room_b);
        assert_eq!(result.events.len(), 2);
        assert!(matches!(result.events[0].event_type, EventType::Movement));
        assert!(matches!(result.events[1].event_type, EventType::RoomDescription));
        let _ = room_a;
    }

    #[test]
    fn attack_while_listening_is_rejected() {
        let (mut world, _, _, actor_id) = two_room_world();
        let mut combat = CombatTable::new();
        let mut listening = ListeningRegistry::new();
        listening.start(actor_id, CharacterId::new());
        let mut rng = SmallRng::seed_from_u64(1);
        let result = dispatch(actor_id, "attack Guard", &mut world, &mut combat, &mut listening, 0, &mut rng);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("You can't fight while trying to eavesdrop."));
    }

    #[test]
    fn stop_with_nothing_active_reports_error() {
        let (_, _, _, actor_id) = two_room_world();
        let mut combat = CombatTable::new();
        let mut listening = ListeningRegistry::new();
        let result = cmd_stop(actor_id, &mut combat, &mut listening);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("You aren't fighting or listening."));
    }

    #[test]
    fn flee_with_no_exits_fails_gracefully() {
        let room = Room::new("Trap", "a sealed cell");
        let room_id = room.id;
        let actor = world_model::Character::new_npc("Trapped", room_id, 0);
        let actor_id = actor.id;
        let mut world = WorldCache::new(vec![room], vec![actor], vec![], vec![]);
        let mut combat = CombatTable::new();
        combat.start_combat(actor_id, CharacterId::new(), 10);
        let mut rng = SmallRng::seed_from_u64(1);
        let result = cmd_flee(actor_id, &mut world, &mut combat, &mut rng);
        assert!(!result.success);
        assert_eq!(result.error.as_deref(), Some("There is nowhere to run!"));
        assert!(combat.is_fighting(actor_id));
    }

    #[test]
    fn equip_then_unequip_restores_stats() {
        let room = Room::new("Armory", "");
        let room_id = room.id;
        let mut actor = world_model::Character::new_npc("Hero", room_id, 0);
        actor.attack = 10;
        actor.defense = 5;
        let actor_id = actor.id;
        let mut sword = Item::new("Sword", "sharp", ItemType::Weapon);
        sword.stats.damage = Some(7);
        sword.location = ItemLocation::Character(actor_id);
        let sword_id = sword.id;
        let mut world = WorldCache::new(vec![room], vec![actor], vec![sword], vec![]);

        let equip_result = cmd_equip(actor_id, "Sword", &mut world, true);
        assert!(equip_result.success);
        assert_eq!(world.character(actor_id).unwrap().attack, 17);
        assert!(world.items.get(&sword_id).unwrap().is_equipped);

        let unequip_result = cmd_equip(actor_id, "Sword", &mut world, false);
        assert!(unequip_result.success);
        assert_eq!(world.character(actor_id).unwrap().attack, 10);
        assert!(!world.items.get(&sword_id).unwrap().is_equipped);
    }

    #[test]
    fn examine_resolves_items_before_characters_via_quoted_name() {
        let room = Room::new("Hall", "");
        let room_id = room.id;
        let actor = world_model::Character::new_npc("Hero", room_id, 0);
        let actor_id = actor.id;
        let lantern = Item::new("Brass Lantern", "a dull brass lantern", ItemType::Misc);
        let mut world = WorldCache::new(vec![room], vec![actor], vec![lantern], vec![]);

        let result = cmd_examine(actor_id, "\"Brass Lantern\"", &world);
        assert!(result.success);
        match result.output {
            Some(StructuredOutput::ItemDetail(view)) => assert_eq!(view.name, "Brass Lantern"),
            other => panic!("expected item detail, got {other:?}"),
        }
        let _ = room_id;
    }

    #[test]
    fn examine_resolves_explicit_id_form_for_characters() {
        let room = Room::new("Hall", "");
        let room_id = room.id;
        let actor = world_model::Character::new_npc("Hero", room_id, 0);
        let actor_id = actor.id;
        let guard = world_model::Character::new_npc("Guard", room_id, 0);
        let guard_id = guard.id;
        let world = WorldCache::new(vec![room], vec![actor, guard], vec![], vec![]);

        let query = format!("@id:{}", guard_id.0);
        let result = cmd_examine(actor_id, &query, &world);
        assert!(result.success);
        match result.output {
            Some(StructuredOutput::CharacterDetail(view)) => assert_eq!(view.name, "Guard"),
            other => panic!("expected character detail, got {other:?}"),
        }
    }
}
