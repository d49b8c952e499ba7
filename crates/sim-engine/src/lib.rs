//! Core simulation engine: the synchronous, testable heart of the game
//! server. Transport, persistence wiring, and process lifetime live in
//! `server`; this crate only knows about ticks, commands, and events.

pub mod ai_manager;
pub mod combat;
pub mod command;
pub mod dispatcher;
pub mod errors;
pub mod formatter;
pub mod game_loop;
pub mod graph;
pub mod listening;
pub mod propagator;
pub mod sinks;
pub mod store;
pub mod world_cache;

pub use ai_manager::AiManager;
pub use combat::{attempt_flee, death_event, CombatTable, SwingOutcome, DEFAULT_FLEE_SUCCESS_PROBABILITY};
pub use command::{Command, CommandQueue, CommandSource};
pub use dispatcher::{dispatch, CommandResult};
pub use errors::GameError;
pub use formatter::{format_event, ViewerContext};
pub use game_loop::{GameLoop, Subsystem, TickContext};
pub use graph::RoomGraph;
pub use listening::ListeningRegistry;
pub use propagator::{EventPropagator, Occupant, PropagatorContext};
pub use store::{InMemoryWorldStore, StoreError, WorldStore};
pub use world_cache::WorldCache;
