//! Engine sink implementations backed by the socket registry.

use sim_engine::sinks::{AdminMirror, PlayerSink};
use world_model::{CharacterId, GameEvent};

use crate::connections::ConnectionRegistry;
use crate::protocol::ServerMessage;

/// Delivers formatted events to connected players' sockets and buffers
/// each delivery for the caller to turn into a player-log `Event` entry
/// once the flush that owns the store handle (`engine::PropagatorSubsystem`)
/// is done with this sink.
pub struct SocketPlayerSink {
    registry: ConnectionRegistry,
    pub deliveries: Vec<(CharacterId, GameEvent, String)>,
}

impl SocketPlayerSink {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry, deliveries: Vec::new() }
    }

    /// Drains the buffered deliveries, e.g. to persist them as player-log entries.
    pub fn take_deliveries(&mut self) -> Vec<(CharacterId, GameEvent, String)> {
        std::mem::take(&mut self.deliveries)
    }
}

impl PlayerSink for SocketPlayerSink {
    fn deliver_event(&mut self, character_id: CharacterId, event: &GameEvent, rendered: &str) {
        self.registry.send_to_player(
            character_id,
            ServerMessage::GameEvent { event: event.clone(), rendered: rendered.to_string() },
        );
        self.deliveries.push((character_id, event.clone(), rendered.to_string()));
    }
}

pub struct SocketAdminMirror {
    registry: ConnectionRegistry,
}

impl SocketAdminMirror {
    pub fn new(registry: ConnectionRegistry) -> Self {
        Self { registry }
    }
}

impl AdminMirror for SocketAdminMirror {
    fn mirror(&mut self, event: &GameEvent, rendered: &str, recipients: &[CharacterId]) {
        self.registry.broadcast_to_admins(ServerMessage::AdminGameEvent {
            event: event.clone(),
            rendered: rendered.to_string(),
            recipients: recipients.to_vec(),
        });
    }
}
