//! The single owned state object behind the engine's mutex.
//!
//! A [`RoomState`] bundles the participant registry, the queue, the turn
//! state, and the ledger. It is what gets persisted and what gets rehydrated
//! on startup; [`RoomState::validate`] is the gate a loaded snapshot must
//! pass before the engine serves any request from it.

use serde::{Deserialize, Serialize};

use continuum_ledger::{Ledger, SequenceResult};
use continuum_ledger::sequence::SequenceBreak;
use continuum_types::ParticipantId;

use crate::queue::TurnQueue;
use crate::registry::ParticipantRegistry;
use crate::turn::TurnState;

/// Integrity failures found in a rehydrated room.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// Holder and turn start are not set together.
    #[error("turn holder and turn start must be set together")]
    TurnTiming,

    /// The current holder is not a registered participant.
    #[error("turn holder {0} is not registered")]
    UnknownHolder(ParticipantId),

    /// The current holder is also waiting in the queue.
    #[error("turn holder {0} is also queued")]
    HolderQueued(ParticipantId),

    /// A queued identity is not a registered participant.
    #[error("queued participant {0} is not registered")]
    UnknownQueued(ParticipantId),

    /// An identity appears more than once in the queue.
    #[error("participant {0} is queued more than once")]
    DuplicateQueued(ParticipantId),

    /// Ledger entries are not numbered `1..=len`.
    #[error("ledger sequence broken: {0}")]
    LedgerSequence(SequenceBreak),

    /// The completed-turn counter disagrees with the ledger.
    #[error("turn counter is {counter} but the ledger ends at turn {ledger}")]
    TurnCounter {
        /// The persisted counter.
        counter: u64,
        /// The last ledger turn number.
        ledger: u64,
    },
}

/// Registry, queue, turn state, and ledger as one unit.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomState {
    pub(crate) registry: ParticipantRegistry,
    pub(crate) queue: TurnQueue,
    pub(crate) turn: TurnState,
    pub(crate) ledger: Ledger,
}

impl RoomState {
    /// An empty room: nobody registered, nobody writing, nothing written.
    pub fn new() -> Self {
        Self::default()
    }

    /// The participant registry.
    pub const fn registry(&self) -> &ParticipantRegistry {
        &self.registry
    }

    /// The waiting queue.
    pub const fn queue(&self) -> &TurnQueue {
        &self.queue
    }

    /// The turn state.
    pub const fn turn(&self) -> &TurnState {
        &self.turn
    }

    /// The ledger.
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Check every cross-component invariant.
    ///
    /// # Errors
    ///
    /// Returns the first [`StateError`] found.
    pub fn validate(&self) -> Result<(), StateError> {
        let active = self.turn.active().map_err(|_err| StateError::TurnTiming)?;

        if let Some(active) = active {
            if !self.registry.contains(active.holder) {
                return Err(StateError::UnknownHolder(active.holder));
            }
            if self.queue.contains(active.holder) {
                return Err(StateError::HolderQueued(active.holder));
            }
        }

        if let Some(id) = self.queue.first_duplicate() {
            return Err(StateError::DuplicateQueued(id));
        }
        if let Some(entry) = self
            .queue
            .iter()
            .find(|e| !self.registry.contains(e.participant_id))
        {
            return Err(StateError::UnknownQueued(entry.participant_id));
        }

        if let SequenceResult::Broken(at) = self.ledger.verify_sequence() {
            return Err(StateError::LedgerSequence(at));
        }
        let ledger = self.ledger.last_turn_number();
        if self.turn.turn_number() != ledger {
            return Err(StateError::TurnCounter {
                counter: self.turn.turn_number(),
                ledger,
            });
        }

        Ok(())
    }
}
