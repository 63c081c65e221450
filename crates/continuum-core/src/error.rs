//! Error types for the turn engine.
//!
//! [`TurnError`] is the request-level taxonomy: every variant is recoverable
//! at the request boundary (the caller may retry later) except
//! [`TurnError::TurnTimingMissing`], which signals a broken internal
//! invariant. [`EngineError`] adds the storage and rehydration failures that
//! only the engine facade can produce.

use continuum_ledger::LedgerError;

use crate::room::StateError;
use crate::store::StoreError;

/// Why a scheduler operation was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TurnError {
    /// The caller's identity is unknown to the participant registry.
    #[error("Not registered")]
    NotRegistered,

    /// Registration was attempted with a blank nickname.
    #[error("Nickname required")]
    InvalidNickname,

    /// The caller is already waiting for (or holding) a turn.
    #[error("Already in queue")]
    AlreadyQueued,

    /// The caller finished a turn recently and must wait before rejoining.
    #[error("Cooldown active")]
    CooldownActive {
        /// Whole seconds until the caller may queue again (rounded up).
        remaining_seconds: u64,
    },

    /// Someone else holds the turn.
    #[error("Not your turn")]
    NotYourTurn,

    /// Nobody holds the turn.
    #[error("No active turn")]
    NoActiveTurn,

    /// The caller's turn ran out before the submission arrived. The turn has
    /// been ended and the cooldown applied.
    #[error("Time expired")]
    TimeExpired,

    /// The submission was blank after trimming.
    #[error("Empty text")]
    EmptyText,

    /// The submission exceeds the entry bound.
    #[error("Entry too long: {len} characters, maximum is {max}")]
    EntryTooLong {
        /// Submitted length in characters (after trimming).
        len: usize,
        /// The configured maximum.
        max: usize,
    },

    /// The draft exceeds the draft bound.
    #[error("Draft too long: {len} characters, maximum is {max}")]
    DraftTooLong {
        /// Draft length in characters.
        len: usize,
        /// The configured maximum.
        max: usize,
    },

    /// A holder is recorded without a turn start (or the reverse). Never
    /// expected in correct operation.
    #[error("Turn timing missing")]
    TurnTimingMissing,

    /// The ledger refused an entry the scheduler had already validated.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl TurnError {
    /// Whether the error reflects a broken invariant rather than a refused
    /// request.
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::TurnTimingMissing | Self::Ledger(_))
    }
}

/// Errors surfaced by [`TurnEngine`](crate::engine::TurnEngine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The scheduler refused the operation.
    #[error(transparent)]
    Turn(#[from] TurnError),

    /// Persisting the new state failed; nothing was changed.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// The persisted state failed integrity checks on load.
    #[error("state error: {0}")]
    State(#[from] StateError),
}

impl EngineError {
    /// The scheduler error, if this is one.
    pub const fn as_turn(&self) -> Option<&TurnError> {
        match self {
            Self::Turn(e) => Some(e),
            Self::Store(_) | Self::State(_) => None,
        }
    }
}
