//! Core entity structs: participants, queue entries, ledger entries, and the
//! status snapshot served to polling clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{EntryId, ParticipantId};

// ---------------------------------------------------------------------------
// Participant
// ---------------------------------------------------------------------------

/// A registered writer.
///
/// Created on registration and never deleted. The cooldown field is only
/// written by the turn scheduler when one of the participant's turns ends;
/// `None` (or a timestamp in the past) means the participant may queue now.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Participant {
    /// Stable identity.
    pub id: ParticipantId,
    /// Display nickname. Not unique.
    pub nickname: String,
    /// Instant until which the participant may not rejoin the queue.
    pub cooldown_until: Option<DateTime<Utc>>,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Queue
// ---------------------------------------------------------------------------

/// A participant waiting for a turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueueEntry {
    /// The waiting participant.
    pub participant_id: ParticipantId,
    /// When the participant joined the queue.
    pub enqueued_at: DateTime<Utc>,
}

/// Queue position as shown to clients (identity plus nickname).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct QueuedParticipant {
    /// The waiting participant.
    pub participant_id: ParticipantId,
    /// Their nickname at the time of the snapshot.
    pub nickname: String,
}

// ---------------------------------------------------------------------------
// Ledger entry
// ---------------------------------------------------------------------------

/// An accepted submission. Immutable once appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Entry {
    /// Unique entry identifier.
    pub id: EntryId,
    /// The participant who held the turn.
    pub author_id: ParticipantId,
    /// Author nickname captured at submit time.
    pub author_nickname: String,
    /// Submitted text, trimmed of surrounding whitespace. Never empty.
    pub text: String,
    /// Ordinal of the turn that produced this entry (1-based, gapless).
    pub turn_number: u64,
    /// Acceptance time.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Status snapshot
// ---------------------------------------------------------------------------

/// Read-only projection of the turn state for a (possibly anonymous) caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct StatusSnapshot {
    /// Identity of the current holder, if a turn is active.
    pub current_holder: Option<ParticipantId>,
    /// Nickname of the current holder, if a turn is active.
    pub current_nickname: Option<String>,
    /// Whole seconds left in the active turn; 0 when nobody holds the turn.
    pub seconds_remaining: u64,
    /// Waiting participants in turn order, capped at the configured page size.
    pub queue: Vec<QueuedParticipant>,
    /// Total number of waiting participants (may exceed `queue.len()`).
    pub queue_length: usize,
    /// The holder's in-progress draft.
    pub draft: String,
    /// Number of turns completed by submission so far.
    pub turn_number: u64,
    /// The caller's remaining cooldown in whole seconds, if one is active.
    pub my_cooldown_seconds: Option<u64>,
}
