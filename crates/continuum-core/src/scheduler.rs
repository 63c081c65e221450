//! The turn state machine.
//!
//! [`TurnScheduler`] decides every transition of a [`RoomState`]: expiring a
//! stale turn, applying the holder's cooldown, promoting the head of the
//! queue, and accepting or rejecting joins, leaves, draft edits, and
//! submissions. It holds no state of its own beyond the configured
//! [`TurnTimings`]; the room is passed in by the caller, which is expected to
//! hold the room's lock for the duration of one call.
//!
//! Each operation appends the [`Change`]s it made to a caller-supplied
//! vector. An empty vector after the call means the room is untouched, which
//! the engine uses to skip persistence and event fan-out.
//!
//! # Expiry
//!
//! A turn that began at `start` is expired at `now` when
//! `now - start >= turn`. The same test runs in [`TurnScheduler::reconcile`]
//! and in [`TurnScheduler::submit`], so a late submission is refused (and
//! costs the cooldown) even if nobody reconciled in between.

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use continuum_ledger::{EntryBuilder, LedgerError};
use continuum_types::{Entry, Participant, ParticipantId, TurnEndReason};

use crate::clock::{ceil_seconds, saturating_add};
use crate::error::TurnError;
use crate::room::RoomState;

/// Turn length, cooldown length, and text bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnTimings {
    /// How long a holder may keep the turn.
    pub turn: TimeDelta,
    /// How long a participant must wait after a turn before queueing again.
    pub cooldown: TimeDelta,
    /// Maximum draft length in characters.
    pub max_draft_chars: usize,
    /// Maximum submitted entry length in characters, after trimming.
    pub max_entry_chars: usize,
}

impl Default for TurnTimings {
    fn default() -> Self {
        Self {
            turn: TimeDelta::seconds(120),
            cooldown: TimeDelta::seconds(300),
            max_draft_chars: 5000,
            max_entry_chars: 5000,
        }
    }
}

/// One observable mutation of the room.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    /// A participant registered.
    Registered(Participant),
    /// A participant joined the back of the queue.
    Enqueued(ParticipantId),
    /// A participant left the queue voluntarily.
    Dequeued(ParticipantId),
    /// A turn ended and its holder's cooldown was set.
    TurnEnded {
        /// The former holder.
        participant: ParticipantId,
        /// Submission or expiry.
        reason: TurnEndReason,
        /// When the former holder may queue again.
        cooldown_until: DateTime<Utc>,
    },
    /// The head of the queue became the holder.
    Promoted {
        /// The new holder.
        participant: ParticipantId,
        /// Start of the new turn.
        at: DateTime<Utc>,
    },
    /// The turn was cleared with nobody waiting.
    Vacated,
    /// The holder replaced the draft.
    DraftUpdated,
    /// An entry was appended to the ledger.
    Submitted(Entry),
}

impl Change {
    /// Whether this change alters who holds the turn.
    pub const fn touches_turn(&self) -> bool {
        matches!(
            self,
            Self::TurnEnded { .. } | Self::Promoted { .. } | Self::Vacated
        )
    }

    /// Whether this change alters the queue contents.
    pub const fn touches_queue(&self) -> bool {
        matches!(
            self,
            Self::Enqueued(_) | Self::Dequeued(_) | Self::Promoted { .. }
        )
    }
}

/// Applies turn rules to a [`RoomState`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnScheduler {
    timings: TurnTimings,
}

impl TurnScheduler {
    /// Create a scheduler with the given timings.
    pub const fn new(timings: TurnTimings) -> Self {
        Self { timings }
    }

    /// The configured timings.
    pub const fn timings(&self) -> &TurnTimings {
        &self.timings
    }

    /// Whether a turn that started at `started_at` has run out at `now`.
    pub fn is_expired(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(started_at) >= self.timings.turn
    }

    /// Time left in a turn that started at `started_at`, never negative.
    pub fn remaining(&self, started_at: DateTime<Utc>, now: DateTime<Utc>) -> TimeDelta {
        let elapsed = now.signed_duration_since(started_at);
        self.timings
            .turn
            .checked_sub(&elapsed)
            .filter(|left| *left > TimeDelta::zero())
            .unwrap_or_else(TimeDelta::zero)
    }

    /// Whether [`reconcile`](Self::reconcile) would change anything at `now`.
    ///
    /// A room with broken turn timing also reports `true`, so the caller
    /// goes on to reconcile and surfaces the error.
    pub fn needs_reconcile(&self, room: &RoomState, now: DateTime<Utc>) -> bool {
        match room.turn.active() {
            Ok(Some(active)) => self.is_expired(active.started_at, now),
            Ok(None) => !room.queue.is_empty() || !room.turn.draft().is_empty(),
            Err(_) => true,
        }
    }

    /// Bring the room up to date with `now`.
    ///
    /// Ends an expired turn (setting the holder's cooldown to
    /// `now + cooldown`), then promotes the head of the queue if nobody holds
    /// the turn. Calling it again at the same instant changes nothing.
    ///
    /// # Errors
    ///
    /// [`TurnError::TurnTimingMissing`] if holder and start are out of step.
    pub fn reconcile(
        &self,
        room: &mut RoomState,
        now: DateTime<Utc>,
        changes: &mut Vec<Change>,
    ) -> Result<(), TurnError> {
        if let Some(active) = room.turn.active()? {
            if !self.is_expired(active.started_at, now) {
                return Ok(());
            }
            info!(
                participant = %active.holder,
                started_at = %active.started_at,
                "Turn expired"
            );
            self.finish_turn(room, active.holder, TurnEndReason::Expired, now, changes);
        }
        Self::promote(room, now, changes);
        Ok(())
    }

    /// Register a new participant.
    ///
    /// # Errors
    ///
    /// [`TurnError::InvalidNickname`] for a blank nickname.
    pub fn register(
        &self,
        room: &mut RoomState,
        nickname: &str,
        now: DateTime<Utc>,
        changes: &mut Vec<Change>,
    ) -> Result<Participant, TurnError> {
        let participant = room.registry.register(nickname, now)?;
        info!(
            participant = %participant.id,
            nickname = %participant.nickname,
            "Participant registered"
        );
        changes.push(Change::Registered(participant.clone()));
        Ok(participant)
    }

    /// Put `id` at the back of the queue, promoting it at once if the turn is
    /// free.
    ///
    /// # Errors
    ///
    /// [`TurnError::NotRegistered`], [`TurnError::CooldownActive`], or
    /// [`TurnError::AlreadyQueued`] (also returned to the current holder).
    pub fn join(
        &self,
        room: &mut RoomState,
        id: ParticipantId,
        now: DateTime<Utc>,
        changes: &mut Vec<Change>,
    ) -> Result<(), TurnError> {
        self.reconcile(room, now, changes)?;

        if !room.registry.contains(id) {
            return Err(TurnError::NotRegistered);
        }
        if let Some(left) = room.registry.cooldown_remaining(id, now) {
            return Err(TurnError::CooldownActive {
                remaining_seconds: ceil_seconds(left),
            });
        }
        if room.turn.is_holder(id) {
            return Err(TurnError::AlreadyQueued);
        }

        room.queue.push(id, now)?;
        info!(participant = %id, queue_length = room.queue.len(), "Participant queued");
        changes.push(Change::Enqueued(id));

        self.reconcile(room, now, changes)
    }

    /// Take `id` out of the queue. Leaving when not queued is a no-op, and
    /// an active turn is never affected.
    ///
    /// # Errors
    ///
    /// [`TurnError::NotRegistered`].
    pub fn leave(
        &self,
        room: &mut RoomState,
        id: ParticipantId,
        now: DateTime<Utc>,
        changes: &mut Vec<Change>,
    ) -> Result<(), TurnError> {
        self.reconcile(room, now, changes)?;

        if !room.registry.contains(id) {
            return Err(TurnError::NotRegistered);
        }
        if room.queue.remove(id) {
            info!(participant = %id, queue_length = room.queue.len(), "Participant left queue");
            changes.push(Change::Dequeued(id));
        } else {
            debug!(participant = %id, "Leave ignored, not queued");
        }
        Ok(())
    }

    /// Replace the holder's draft.
    ///
    /// # Errors
    ///
    /// [`TurnError::NotRegistered`], [`TurnError::NotYourTurn`], or
    /// [`TurnError::DraftTooLong`]; the previous draft is kept on error.
    pub fn update_draft(
        &self,
        room: &mut RoomState,
        id: ParticipantId,
        text: &str,
        now: DateTime<Utc>,
        changes: &mut Vec<Change>,
    ) -> Result<(), TurnError> {
        self.reconcile(room, now, changes)?;

        if !room.registry.contains(id) {
            return Err(TurnError::NotRegistered);
        }
        if !room.turn.is_holder(id) {
            return Err(TurnError::NotYourTurn);
        }
        let len = text.chars().count();
        if len > self.timings.max_draft_chars {
            return Err(TurnError::DraftTooLong {
                len,
                max: self.timings.max_draft_chars,
            });
        }

        if room.turn.draft() != text {
            room.turn.set_draft(text);
            debug!(participant = %id, chars = len, "Draft updated");
            changes.push(Change::DraftUpdated);
        }
        Ok(())
    }

    /// Accept the holder's text as the next ledger entry and pass the turn on.
    ///
    /// Does not reconcile first: the holder is checked against the room as it
    /// stands, and an expired turn is ended here. In that case the cooldown
    /// is applied, the next participant is promoted, and the call still
    /// fails with [`TurnError::TimeExpired`].
    ///
    /// # Errors
    ///
    /// In order of precedence: [`TurnError::NotRegistered`],
    /// [`TurnError::NoActiveTurn`], [`TurnError::NotYourTurn`],
    /// [`TurnError::TurnTimingMissing`], [`TurnError::TimeExpired`],
    /// [`TurnError::EmptyText`], [`TurnError::EntryTooLong`].
    pub fn submit(
        &self,
        room: &mut RoomState,
        id: ParticipantId,
        text: &str,
        now: DateTime<Utc>,
        changes: &mut Vec<Change>,
    ) -> Result<Entry, TurnError> {
        let nickname = room
            .registry
            .nickname(id)
            .map(str::to_owned)
            .ok_or(TurnError::NotRegistered)?;
        let holder = room.turn.holder().ok_or(TurnError::NoActiveTurn)?;
        if holder != id {
            return Err(TurnError::NotYourTurn);
        }
        let active = room.turn.active()?.ok_or(TurnError::TurnTimingMissing)?;

        if self.is_expired(active.started_at, now) {
            info!(participant = %id, started_at = %active.started_at, "Submission after turn expired");
            self.finish_turn(room, id, TurnEndReason::Expired, now, changes);
            Self::promote(room, now, changes);
            return Err(TurnError::TimeExpired);
        }

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(TurnError::EmptyText);
        }
        let len = trimmed.chars().count();
        if len > self.timings.max_entry_chars {
            return Err(TurnError::EntryTooLong {
                len,
                max: self.timings.max_entry_chars,
            });
        }

        let turn_number = room
            .turn
            .turn_number()
            .checked_add(1)
            .ok_or(LedgerError::Internal("turn counter overflow"))?;
        let entry = EntryBuilder::new(turn_number)
            .author(id, nickname)
            .text(trimmed)
            .created_at(now)
            .build(self.timings.max_entry_chars)?;
        let entry = room.ledger.append(entry)?.clone();
        room.turn.set_turn_number(turn_number);

        info!(
            participant = %id,
            turn_number,
            chars = len,
            "Entry accepted"
        );
        changes.push(Change::Submitted(entry.clone()));

        self.finish_turn(room, id, TurnEndReason::Submitted, now, changes);
        Self::promote(room, now, changes);
        Ok(entry)
    }

    fn finish_turn(
        &self,
        room: &mut RoomState,
        holder: ParticipantId,
        reason: TurnEndReason,
        now: DateTime<Utc>,
        changes: &mut Vec<Change>,
    ) {
        let cooldown_until = saturating_add(now, self.timings.cooldown);
        if !room.registry.apply_cooldown(holder, cooldown_until) {
            debug!(participant = %holder, "Cooldown skipped, holder not registered");
        }
        room.turn.end();
        changes.push(Change::TurnEnded {
            participant: holder,
            reason,
            cooldown_until,
        });
    }

    fn promote(room: &mut RoomState, now: DateTime<Utc>, changes: &mut Vec<Change>) {
        if room.turn.holder().is_some() {
            return;
        }
        if let Some(next) = room.queue.pop_front() {
            room.turn.begin(next.participant_id, now);
            info!(
                participant = %next.participant_id,
                queue_length = room.queue.len(),
                "Turn started"
            );
            changes.push(Change::Promoted {
                participant: next.participant_id,
                at: now,
            });
        } else if room.turn.end() {
            debug!("Turn vacated");
            changes.push(Change::Vacated);
        }
    }
}
