//! Transport, persistence wiring, and process lifetime for the text-world
//! server. `sim_engine` owns ticks, commands, and events; everything here
//! is the async shell around it: socket handling, config, the connection
//! registry, and the tick-to-subsystem wiring in [`engine`].

pub mod admin_stub;
pub mod config;
pub mod connections;
pub mod engine;
pub mod protocol;
pub mod sinks;
pub mod ws;

pub use config::{ConfigError, NodeEnv, ServerConfig};
pub use connections::ConnectionRegistry;
pub use engine::{AiProactiveSubsystem, CombatSubsystem, CommandSubsystem, PropagatorSubsystem, Shared, SharedWorld};
pub use protocol::{ClientMessage, ServerMessage};
