//! Documented boundary for the HTTP admin/REST surface.
//!
//! None of this is implemented. The game socket (`ws`) and its `/health`
//! liveness sibling are the only HTTP-adjacent surface this crate serves;
//! everything below is an external collaborator the core is written
//! against as a boundary, not a route handler waiting to be filled in.
//! Recorded here, with doc comments only, so the boundary is explicit
//! rather than silently absent.

/// `GET /api/accounts/:username/characters` — list a player's characters.
/// `POST /api/accounts/:username/characters` — create one.
pub mod account_characters {}

/// `GET /api/characters/:id` — character detail.
/// `DELETE /api/characters/:id` — retire a character.
pub mod character_detail {}

/// `GET /api/accounts/:username/preferences` — read stored preferences.
/// `PATCH /api/accounts/:username/preferences` — partial update.
pub mod account_preferences {}

/// `GET /admin/map` — room graph for the admin dashboard.
pub mod admin_map {}

/// `GET /admin/events` — historical event query, filterable by room/type/actor.
pub mod admin_events {}

/// `GET /admin/agents`, `POST /admin/agents`, `PATCH /admin/agents/:id`,
/// `DELETE /admin/agents/:id` — AI agent CRUD.
/// `POST /admin/agents/:id/regenerate-spatial-memory` — forces the next
/// spatial-memory refresh pass early, bypassing the staleness window
/// `ai_manager::spatial_memory_is_stale` otherwise gates on.
pub mod admin_agents {}

/// `POST /admin/pause`, `POST /admin/resume` — toggles `GameLoop::pause`/
/// `resume` from outside the tick loop.
/// `GET /admin/status` — current clock, pause state, connected-player count.
pub mod admin_control {}

/// Token-usage analytics: aggregate cost/volume queries over the
/// `append_token_usage` log, broken down by agent, model, and source.
pub mod token_usage_analytics {}
