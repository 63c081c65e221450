//! The turn state owned by the scheduler.
//!
//! Holder and turn start are stored as two optional fields (the persisted
//! layout), but they are only ever set or cleared together through
//! [`TurnState::begin`] and [`TurnState::end`]. [`TurnState::active`] is the
//! single place that checks the pairing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use continuum_types::ParticipantId;

use crate::error::TurnError;

/// A turn in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveTurn {
    /// The participant who may write.
    pub holder: ParticipantId,
    /// When the turn began.
    pub started_at: DateTime<Utc>,
}

/// Current holder, turn start, draft, and completed-turn counter.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnState {
    holder: Option<ParticipantId>,
    started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    draft: String,
    #[serde(default)]
    turn_number: u64,
}

impl TurnState {
    /// The active turn, if any.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::TurnTimingMissing`] if exactly one of holder and
    /// turn start is set.
    pub fn active(&self) -> Result<Option<ActiveTurn>, TurnError> {
        match (self.holder, self.started_at) {
            (Some(holder), Some(started_at)) => Ok(Some(ActiveTurn { holder, started_at })),
            (None, None) => Ok(None),
            _ => Err(TurnError::TurnTimingMissing),
        }
    }

    /// The current holder, without checking the turn start.
    pub const fn holder(&self) -> Option<ParticipantId> {
        self.holder
    }

    /// Whether `id` currently holds the turn.
    pub fn is_holder(&self, id: ParticipantId) -> bool {
        self.holder == Some(id)
    }

    /// When the current turn began.
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// The holder's in-progress draft.
    pub fn draft(&self) -> &str {
        &self.draft
    }

    /// Number of turns completed by submission.
    pub const fn turn_number(&self) -> u64 {
        self.turn_number
    }

    /// Hand the turn to `holder` starting at `now`, with an empty draft.
    pub(crate) fn begin(&mut self, holder: ParticipantId, now: DateTime<Utc>) {
        self.holder = Some(holder);
        self.started_at = Some(now);
        self.draft.clear();
    }

    /// Clear holder, turn start, and draft. Returns whether anything changed.
    pub(crate) fn end(&mut self) -> bool {
        let changed = self.holder.is_some() || self.started_at.is_some() || !self.draft.is_empty();
        self.holder = None;
        self.started_at = None;
        self.draft.clear();
        changed
    }

    pub(crate) fn set_draft(&mut self, draft: &str) {
        draft.clone_into(&mut self.draft);
    }

    pub(crate) const fn set_turn_number(&mut self, turn_number: u64) {
        self.turn_number = turn_number;
    }
}
