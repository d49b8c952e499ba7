//! Engine-wide error taxonomy.
//!
//! Five kinds, matching the error-handling contract: user errors surface
//! verbatim to the player, everything else is logged and handled without
//! ever panicking a tick.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    /// Bad command, missing target, invalid direction. Returned to the
    /// actor as-is; never logged, never retried.
    #[error("{0}")]
    User(String),

    /// Schema mismatch on a REST/WebSocket payload.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Database contention, network blip. May be retried once by the caller.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Oracle timeout, malformed tool call, parse failure. Non-fatal.
    #[error("oracle error: {0}")]
    Oracle(#[from] oracle::OracleError),

    /// Dangling reference, vanished room. Aborts the action silently for
    /// that actor; the actor is left in a safe state.
    #[error("data integrity error: {0}")]
    DataIntegrity(String),
}

impl GameError {
    pub fn is_user_facing(&self) -> bool {
        matches!(self, GameError::User(_))
    }
}
