//! Read-only projection of a room for external callers.
//!
//! Nothing here mutates state. The engine reconciles first and then projects,
//! so a snapshot never shows a turn that has already run out.

use chrono::{DateTime, Utc};

use continuum_types::{ParticipantId, QueuedParticipant, StatusSnapshot};

use crate::clock::ceil_seconds;
use crate::error::TurnError;
use crate::room::RoomState;
use crate::scheduler::TurnScheduler;

/// Build the status snapshot seen by `caller` at `now`.
///
/// `seconds_remaining` is rounded up and is 0 when nobody holds the turn.
/// The queue lists at most `queue_limit` participants; `queue_length` always
/// reports the full count. `my_cooldown_seconds` is set only for a known
/// caller whose cooldown is still running.
///
/// # Errors
///
/// [`TurnError::TurnTimingMissing`] if holder and start are out of step.
pub fn project(
    room: &RoomState,
    scheduler: &TurnScheduler,
    caller: Option<ParticipantId>,
    now: DateTime<Utc>,
    queue_limit: usize,
) -> Result<StatusSnapshot, TurnError> {
    let active = room.turn().active()?;

    let seconds_remaining = active
        .map(|turn| ceil_seconds(scheduler.remaining(turn.started_at, now)))
        .unwrap_or_default();
    let current_nickname = active
        .and_then(|turn| room.registry().nickname(turn.holder))
        .map(str::to_owned);
    let my_cooldown_seconds = caller
        .and_then(|id| room.registry().cooldown_remaining(id, now))
        .map(ceil_seconds);

    Ok(StatusSnapshot {
        current_holder: active.map(|turn| turn.holder),
        current_nickname,
        seconds_remaining,
        queue: queued_participants(room, queue_limit),
        queue_length: room.queue().len(),
        draft: room.turn().draft().to_owned(),
        turn_number: room.turn().turn_number(),
        my_cooldown_seconds,
    })
}

/// The first `limit` queued participants with their nicknames.
pub fn queued_participants(room: &RoomState, limit: usize) -> Vec<QueuedParticipant> {
    room.queue()
        .iter()
        .take(limit)
        .map(|entry| QueuedParticipant {
            participant_id: entry.participant_id,
            nickname: room
                .registry()
                .nickname(entry.participant_id)
                .unwrap_or_default()
                .to_owned(),
        })
        .collect()
}
