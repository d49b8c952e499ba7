//! The duplex game socket.
//!
//! One task per connection, split into inbound and outbound halves and
//! driven by a single `tokio::select!` loop — the same shape as the
//! reference transport this is grounded on, generalized from a single
//! upstream bridge to the shared [`engine::Shared`] world plus the
//! persistence and connection-registry handles a full player session needs.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use sim_engine::command::Command;
use sim_engine::store::WorldStore;
use world_model::{Account, Character, CharacterId};

use crate::connections::ConnectionRegistry;
use crate::engine::Shared;
use crate::protocol::{ClientMessage, ServerMessage};

/// Everything a connection needs to resolve a client message: the tick
/// state for enqueueing commands, the socket registry for ack delivery
/// and broadcast, and the store for account/character lookups the
/// dispatcher itself never touches.
pub struct AppState {
    pub shared: Shared,
    pub registry: ConnectionRegistry,
    pub store: Arc<dyn WorldStore>,
}

/// `GET /ws` — upgrades to the game socket.
pub async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state))
}

fn wall_clock_secs() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

async fn handle_ws(socket: WebSocket, state: Arc<AppState>) {
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<ServerMessage>();
    let (mut ws_tx, mut ws_rx) = socket.split();
    let mut current_character: Option<CharacterId> = None;

    loop {
        tokio::select! {
            // Engine/registry -> this socket.
            msg = outbound_rx.recv() => {
                match msg {
                    Some(message) => {
                        let is_disconnect = matches!(message, ServerMessage::GameDisconnect { .. });
                        let Ok(text) = serde_json::to_string(&message) else { continue };
                        if ws_tx.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                        if is_disconnect {
                            break;
                        }
                    }
                    None => break,
                }
            }

            // This socket -> engine.
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let Ok(client_message) = serde_json::from_str::<ClientMessage>(&text) else {
                            let _ = outbound_tx.send(ServerMessage::GameError {
                                message: "malformed client message".to_string(),
                            });
                            continue;
                        };
                        handle_client_message(client_message, &state, &outbound_tx, &mut current_character).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(_)) => break,
                    _ => {}
                }
            }
        }
    }

    if let Some(character_id) = current_character {
        state.registry.unregister_player(character_id);
    }
}

async fn handle_client_message(
    message: ClientMessage,
    state: &Arc<AppState>,
    outbound_tx: &mpsc::UnboundedSender<ServerMessage>,
    current_character: &mut Option<CharacterId>,
) {
    match message {
        ClientMessage::PlayerJoin { name } => {
            let _ = outbound_tx.send(ServerMessage::Ack {
                request: "player:join".to_string(),
                payload: serde_json::json!({ "name": name }),
            });
        }

        ClientMessage::CharacterList { username } => {
            let characters = match state.store.get_account(&username).await {
                Ok(Some(account)) => state.store.characters_for_account(account.id).await.unwrap_or_default(),
                _ => Vec::new(),
            };
            let payload = serde_json::json!({
                "characters": characters.iter().map(|c| serde_json::json!({
                    "id": c.id,
                    "name": c.name,
                    "isAlive": c.is_alive,
                })).collect::<Vec<_>>(),
            });
            let _ = outbound_tx.send(ServerMessage::Ack { request: "character:list".to_string(), payload });
        }

        ClientMessage::CharacterCreate { username, name } => {
            let account = match state.store.get_account(&username).await {
                Ok(Some(account)) => account,
                _ => {
                    let account = Account::new(username.clone(), wall_clock_secs());
                    if state.store.save_account(account.clone()).await.is_err() {
                        let _ = outbound_tx.send(ServerMessage::GameError { message: "could not create account".to_string() });
                        return;
                    }
                    account
                }
            };

            let spawn_room = {
                let world = state.shared.lock().unwrap();
                world.cache.graph.starting_room().unwrap_or_else(world_model::RoomId::new)
            };
            let character = Character::new_player(name, account.id, spawn_room, wall_clock_secs());
            let character_id = character.id;
            if state.store.save_character(character.clone()).await.is_err() {
                let _ = outbound_tx.send(ServerMessage::GameError { message: "could not create character".to_string() });
                return;
            }
            {
                let mut world = state.shared.lock().unwrap();
                world.cache.characters.insert(character_id, character);
            }
            let _ = outbound_tx.send(ServerMessage::Ack {
                request: "character:create".to_string(),
                payload: serde_json::json!({ "characterId": character_id }),
            });
        }

        ClientMessage::CharacterSelect { character_id } => {
            let character = {
                let world = state.shared.lock().unwrap();
                world.cache.character(character_id).cloned()
            };
            let Some(character) = character else {
                let _ = outbound_tx.send(ServerMessage::GameError { message: "no such character".to_string() });
                return;
            };
            state.registry.register_player(character_id, outbound_tx.clone());
            *current_character = Some(character_id);
            let _ = outbound_tx.send(ServerMessage::Ack {
                request: "character:select".to_string(),
                payload: serde_json::json!({ "characterId": character_id }),
            });
            let _ = outbound_tx.send(ServerMessage::CharacterUpdate {
                hp: character.hp,
                max_hp: character.max_hp,
                attack: character.attack,
                defense: character.defense,
            });
        }

        ClientMessage::GameCommand { command } => {
            let Some(actor_id) = *current_character else {
                let _ = outbound_tx.send(ServerMessage::GameError { message: "select a character first".to_string() });
                return;
            };
            let mut world = state.shared.lock().unwrap();
            world.command_queue.enqueue(Command::player(actor_id, command, wall_clock_secs() as u64));
        }

        ClientMessage::AdminJoin => {
            state.registry.register_admin(outbound_tx.clone());
            let _ = outbound_tx.send(ServerMessage::Ack {
                request: "admin:join".to_string(),
                payload: serde_json::Value::Null,
            });
        }

        ClientMessage::AdminLeave => {
            // `ConnectionRegistry` only ever prunes an admin subscriber on a
            // failed send (`broadcast_to_admins`); there is no explicit
            // removal path. Dropping this connection's sender on socket
            // close achieves the same effect, so this just acks.
            let _ = outbound_tx.send(ServerMessage::Ack {
                request: "admin:leave".to_string(),
                payload: serde_json::Value::Null,
            });
        }
    }
}
