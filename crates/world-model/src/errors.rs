//! Shared domain error types.
//!
//! Every variant below derives `thiserror::Error` rather than hand-rolling
//! `Display`/`Error` impls — one message format, declared next to the data
//! it formats.

use thiserror::Error;

/// Errors raised while validating or mutating domain entities directly,
/// independent of any storage or network concern.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("no exit toward '{0}'")]
    NoSuchExit(String),

    #[error("item {0} has no room or character location")]
    OrphanedItem(String),

    #[error("item must be held by a character to be equipped")]
    EquipWithoutHolder,

    #[error("spawn_point items cannot be picked up")]
    SpawnPointNotTakeable,
}
