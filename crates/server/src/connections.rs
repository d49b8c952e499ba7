//! Socket registry: per-character outbound channels plus the admin
//! subscriber fan-out list.
//!
//! Kept as an explicit, passed-around value rather than a singleton the
//! engine reaches for internally — the same redesign the engine core
//! itself applies to the listening registry and AI perception sinks.
//! `ConnectionRegistry` is the piece that lives on the transport side of
//! that boundary. Guarded by a plain `std::sync::RwLock` rather than
//! `tokio::sync::RwLock`: [`sim_engine::sinks::PlayerSink`] and
//! [`sim_engine::sinks::AdminMirror`] are synchronous trait methods called
//! from inside a tick, and every critical section here is a non-blocking
//! channel send — never held across an `.await`.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tokio::sync::mpsc::UnboundedSender;

use world_model::CharacterId;

use crate::protocol::ServerMessage;

#[derive(Default)]
struct Registry {
    players: HashMap<CharacterId, UnboundedSender<ServerMessage>>,
    admins: Vec<UnboundedSender<ServerMessage>>,
}

#[derive(Clone, Default)]
pub struct ConnectionRegistry {
    inner: Arc<RwLock<Registry>>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_player(&self, character_id: CharacterId, sender: UnboundedSender<ServerMessage>) {
        self.inner.write().unwrap().players.insert(character_id, sender);
    }

    pub fn unregister_player(&self, character_id: CharacterId) {
        self.inner.write().unwrap().players.remove(&character_id);
    }

    pub fn register_admin(&self, sender: UnboundedSender<ServerMessage>) {
        self.inner.write().unwrap().admins.push(sender);
    }

    /// Sends directly to one connected player's socket, silently dropping
    /// the message if they have since disconnected or never connected
    /// (e.g. an NPC).
    pub fn send_to_player(&self, character_id: CharacterId, message: ServerMessage) {
        let guard = self.inner.read().unwrap();
        if let Some(sender) = guard.players.get(&character_id) {
            let _ = sender.send(message);
        }
    }

    pub fn broadcast_to_admins(&self, message: ServerMessage) {
        let mut guard = self.inner.write().unwrap();
        guard.admins.retain(|sender| sender.send(message.clone()).is_ok());
    }

    pub fn is_player_connected(&self, character_id: CharacterId) -> bool {
        self.inner.read().unwrap().players.contains_key(&character_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_to_unregistered_player_is_a_silent_no_op() {
        let registry = ConnectionRegistry::new();
        registry.send_to_player(CharacterId::new(), ServerMessage::GameError { message: "x".into() });
    }

    #[test]
    fn broadcast_prunes_disconnected_admin_subscribers() {
        let registry = ConnectionRegistry::new();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        registry.register_admin(tx);
        drop(rx);
        registry.broadcast_to_admins(ServerMessage::GameError { message: "x".into() });
        registry.broadcast_to_admins(ServerMessage::GameError { message: "y".into() });
        assert_eq!(registry.inner.read().unwrap().admins.len(), 0);
    }
}
