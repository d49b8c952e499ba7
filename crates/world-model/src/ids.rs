//! Strongly-typed entity identifiers.
//!
//! Every aggregate root gets its own newtype wrapping a [`Uuid`] so that a
//! `RoomId` can never be handed to a function expecting a `CharacterId` by
//! accident. Event ids are a separate, sequential, human-grep-able scheme
//! (`evt_00000001`) since events are append-only and ordering matters more
//! than unguessability.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn from_uuid(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

id_type!(AccountId);
id_type!(CharacterId);
id_type!(RoomId);
id_type!(ItemId);
id_type!(AgentId);

/// Sequential event identifier, e.g. `evt_00000001`.
///
/// Kept as a formatted string rather than a UUID because events are
/// append-only and the propagator's ordering guarantees are easiest to
/// eyeball when ids sort lexically alongside their sequence number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(pub String);

impl EventId {
    pub fn from_sequence(sequence: u64) -> Self {
        Self(format!("evt_{:08}", sequence))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_id_formats_with_zero_padding() {
        assert_eq!(EventId::from_sequence(1).0, "evt_00000001");
        assert_eq!(EventId::from_sequence(42371).0, "evt_00042371");
    }

    #[test]
    fn id_types_are_distinct_newtypes() {
        let room = RoomId::new();
        let character = CharacterId::new();
        assert_ne!(room.0, Uuid::nil());
        assert_ne!(character.0, Uuid::nil());
    }
}
