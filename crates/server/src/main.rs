//! Process entry point: loads configuration, seeds a starting world,
//! wires the tick subsystems into a running [`GameLoop`], and serves the
//! duplex game socket plus a liveness route.

use std::sync::{Arc, Mutex};

use axum::routing::get;
use axum::{Json, Router};
use clap::Parser;
use tower_http::trace::TraceLayer;

use oracle::{LlmOracle, NoopOracle};
use sim_engine::game_loop::GameLoop;
use sim_engine::store::{InMemoryWorldStore, WorldStore};
use sim_engine::world_cache::WorldCache;
use world_model::Room;

use server::engine::{AiProactiveSubsystem, CombatSubsystem, CommandSubsystem, PropagatorSubsystem, SharedWorld};
use server::{ConnectionRegistry, ServerConfig};

/// Command-line overrides layered on top of the environment-loaded config.
/// Everything here has an env var equivalent; the flag just saves a reach
/// for `PORT=... cargo run` during local iteration.
#[derive(Parser, Debug)]
#[command(name = "textworld-server")]
#[command(about = "Persistent multi-user text-world server")]
struct Args {
    /// Overrides the PORT environment variable.
    #[arg(long)]
    port: Option<u16>,
}

/// A connected-but-empty two-room world: a starting square and an
/// adjoining gatehouse. Real deployments load rooms from whatever backend
/// implements [`WorldStore`] instead of this in-process default.
fn seed_starting_world(store: &InMemoryWorldStore) {
    let mut square = Room::new("Town Square", "A worn cobblestone square, the heart of the settlement.");
    square.is_starting = true;
    let mut gatehouse = Room::new("Gatehouse", "A stone gatehouse, its doors open to the road beyond.");

    square.exits.insert("north".to_string(), gatehouse.id);
    gatehouse.exits.insert("south".to_string(), square.id);

    store.seed_room(square);
    store.seed_room(gatehouse);
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!("shutdown signal received");
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let mut config = match ServerConfig::from_env() {
        Ok(config) => config,
        Err(error) => {
            tracing::error!("fatal: {error}");
            std::process::exit(1);
        }
    };
    if let Some(port) = args.port {
        config.port = port;
    }

    let in_memory_store = InMemoryWorldStore::new();
    seed_starting_world(&in_memory_store);
    let store: Arc<dyn WorldStore> = Arc::new(in_memory_store);

    let rooms = store.load_rooms().await.expect("seeded rooms must load");
    let characters = store.load_characters().await.expect("characters must load");
    let agents = store.load_agents().await.expect("agents must load");
    let items = store.load_items().await.expect("items must load");
    let cache = WorldCache::new(rooms, characters, items, agents);
    let clock = store.load_clock().await.unwrap_or_default();

    let shared = Arc::new(Mutex::new(SharedWorld::new(cache, 64)));
    let registry = ConnectionRegistry::new();

    // No concrete LLM provider lives in this workspace; `NoopOracle` is
    // the stand-in until a real implementation of `LlmOracle` is wired in
    // from outside.
    let oracle: Arc<dyn LlmOracle> = Arc::new(NoopOracle);

    let mut game_loop = GameLoop::new(clock);
    game_loop.register(Box::new(CommandSubsystem::new(shared.clone(), registry.clone(), store.clone())));
    game_loop.register(Box::new(AiProactiveSubsystem::new(shared.clone(), oracle.clone(), store.clone())));
    game_loop.register(Box::new(CombatSubsystem::new(shared.clone(), registry.clone())));
    game_loop.register(Box::new(PropagatorSubsystem::new(shared.clone(), store.clone(), registry.clone())));

    tokio::spawn(async move {
        let mut interval = tokio::time::interval(std::time::Duration::from_millis(1000 / world_model::clock::TICKS_PER_SECOND));
        loop {
            interval.tick().await;
            game_loop.tick();
        }
    });

    let app_state = Arc::new(server::ws::AppState { shared, registry, store });
    let router = Router::new()
        .route("/health", get(health))
        .route("/ws", get(server::ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("textworld-server listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr).await.expect("failed to bind listen address");
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await.expect("server error");
}
