//! Live-update events pushed to connected observers.
//!
//! Events are purely additive: clients that never connect to the live channel
//! still see the same state by polling the status endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::TurnEndReason;
use crate::ids::ParticipantId;
use crate::structs::{Entry, QueuedParticipant};

/// A turn that just ended, attached to the [`LiveEvent::TurnUpdate`] that
/// reports it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EndedTurn {
    /// The participant whose turn ended.
    pub participant_id: ParticipantId,
    /// Why it ended.
    pub reason: TurnEndReason,
    /// When the participant may queue again.
    pub cooldown_until: DateTime<Utc>,
}

/// A change to the shared writing room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "type", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum LiveEvent {
    /// The current holder changed (promotion, expiry, or submission).
    TurnUpdate {
        /// New holder, if any.
        holder: Option<ParticipantId>,
        /// New holder's nickname, if any.
        nickname: Option<String>,
        /// Start of the new turn, if any.
        started_at: Option<DateTime<Utc>>,
        /// Turn length in seconds.
        turn_seconds: u64,
        /// Completed-turn counter after the change.
        turn_number: u64,
        /// The turn that ended as part of this change, if any.
        ended: Option<EndedTurn>,
    },
    /// Someone joined, left, or was promoted out of the queue.
    QueueUpdate {
        /// Waiting participants in turn order.
        queue: Vec<QueuedParticipant>,
    },
    /// The holder saved a new draft.
    DraftUpdate {
        /// The full draft text.
        draft: String,
    },
    /// A submission was accepted into the ledger.
    NewEntry {
        /// The accepted entry.
        entry: Entry,
    },
}
