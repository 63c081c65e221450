//! The shared, lock-guarded entry point for every request.
//!
//! [`TurnEngine`] owns the one [`RoomState`] behind a `tokio::sync::Mutex`.
//! Each operation takes the lock, reads the clock, reconciles, acts,
//! persists, and publishes live events, all before the lock is released. Two
//! concurrent submissions from the same holder therefore serialize: the
//! second sees the turn already handed on and is refused.
//!
//! Mutations run against a working copy of the room. The copy replaces the
//! live state only after the store accepted it, so a failed save leaves both
//! memory and disk as they were.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::runtime::{Handle, RuntimeFlavor};
use tokio::sync::{broadcast, Mutex, MutexGuard};
use tracing::{error, info};

use continuum_types::{
    EndedTurn, Entry, EntryOrder, LiveEvent, Participant, ParticipantId, StatusSnapshot,
};

use crate::clock::Clock;
use crate::error::{EngineError, TurnError};
use crate::room::RoomState;
use crate::scheduler::{Change, TurnScheduler, TurnTimings};
use crate::status;
use crate::store::StateStore;

/// Capacity of the live event channel. Slow subscribers skip ahead.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Thread-safe facade over the scheduler, the room, and its store.
pub struct TurnEngine {
    room: Mutex<RoomState>,
    scheduler: TurnScheduler,
    clock: Arc<dyn Clock>,
    store: Arc<dyn StateStore>,
    events: broadcast::Sender<LiveEvent>,
    status_queue_limit: usize,
}

impl core::fmt::Debug for TurnEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TurnEngine")
            .field("scheduler", &self.scheduler)
            .field("clock", &self.clock)
            .field("status_queue_limit", &self.status_queue_limit)
            .finish_non_exhaustive()
    }
}

impl TurnEngine {
    /// Rehydrate from `store`, or start an empty room if it holds nothing.
    ///
    /// # Errors
    ///
    /// [`EngineError::Store`] if the snapshot cannot be read and
    /// [`EngineError::State`] if it fails integrity checks.
    pub fn open(
        timings: TurnTimings,
        clock: Arc<dyn Clock>,
        store: Arc<dyn StateStore>,
        status_queue_limit: usize,
    ) -> Result<Self, EngineError> {
        let room = match store.load()? {
            Some(room) => {
                room.validate()?;
                info!(
                    participants = room.registry().len(),
                    queued = room.queue().len(),
                    entries = room.ledger().len(),
                    holder = ?room.turn().holder(),
                    "Room rehydrated"
                );
                room
            }
            None => {
                info!("No saved room, starting empty");
                RoomState::new()
            }
        };

        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            room: Mutex::new(room),
            scheduler: TurnScheduler::new(timings),
            clock,
            store,
            events,
            status_queue_limit,
        })
    }

    /// The configured timings.
    pub const fn timings(&self) -> &TurnTimings {
        self.scheduler.timings()
    }

    /// Subscribe to live events. Events sent before this call are not seen.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.events.subscribe()
    }

    /// Register a participant.
    pub async fn register(&self, nickname: &str) -> Result<Participant, EngineError> {
        self.transact(|s, room, now, changes| s.register(room, nickname, now, changes))
            .await
    }

    /// Queue the caller; an idle turn is taken immediately.
    pub async fn join(&self, id: ParticipantId) -> Result<(), EngineError> {
        self.transact(|s, room, now, changes| s.join(room, id, now, changes))
            .await
    }

    /// Leave the queue if present.
    pub async fn leave(&self, id: ParticipantId) -> Result<(), EngineError> {
        self.transact(|s, room, now, changes| s.leave(room, id, now, changes))
            .await
    }

    /// Replace the holder's draft.
    pub async fn update_draft(&self, id: ParticipantId, text: &str) -> Result<(), EngineError> {
        self.transact(|s, room, now, changes| s.update_draft(room, id, text, now, changes))
            .await
    }

    /// Submit the holder's text as the next entry.
    pub async fn submit(&self, id: ParticipantId, text: &str) -> Result<Entry, EngineError> {
        self.transact(|s, room, now, changes| s.submit(room, id, text, now, changes))
            .await
    }

    /// Expire and promote as needed. Returns whether anything changed.
    pub async fn reconcile(&self) -> Result<bool, EngineError> {
        let guard = self.room.lock().await;
        let now = self.clock.now();
        if !self.scheduler.needs_reconcile(&guard, now) {
            return Ok(false);
        }
        self.commit(guard, now, |s, room, now, changes| {
            s.reconcile(room, now, changes)?;
            Ok(!changes.is_empty())
        })
    }

    /// The status snapshot for `caller` (anonymous when `None`).
    pub async fn status(&self, caller: Option<ParticipantId>) -> Result<StatusSnapshot, EngineError> {
        let (room, now) = self.reconciled().await?;
        Ok(status::project(
            &room,
            &self.scheduler,
            caller,
            now,
            self.status_queue_limit,
        )?)
    }

    /// The current draft (empty when nobody holds the turn).
    pub async fn draft(&self) -> Result<String, EngineError> {
        let (room, _) = self.reconciled().await?;
        Ok(room.turn().draft().to_owned())
    }

    /// Ledger entries in `order`, at most `limit` of them.
    pub async fn entries(&self, order: EntryOrder, limit: Option<usize>) -> Vec<Entry> {
        self.room.lock().await.ledger().page(order, limit)
    }

    /// Number of entries in the ledger.
    pub async fn entry_count(&self) -> usize {
        self.room.lock().await.ledger().len()
    }

    /// A registered participant.
    pub async fn participant(&self, id: ParticipantId) -> Option<Participant> {
        self.room.lock().await.registry().get(id).cloned()
    }

    /// How many ledger entries `id` has written.
    pub async fn authored_count(&self, id: ParticipantId) -> usize {
        self.room.lock().await.ledger().by_author(id).len()
    }

    /// A copy of the whole room, reconciled to now.
    pub async fn snapshot(&self) -> Result<RoomState, EngineError> {
        let (room, _) = self.reconciled().await?;
        Ok(room.clone())
    }

    /// Lock the room and reconcile it if due, keeping the lock.
    async fn reconciled(&self) -> Result<(MutexGuard<'_, RoomState>, DateTime<Utc>), EngineError> {
        let mut guard = self.room.lock().await;
        let now = self.clock.now();
        if self.scheduler.needs_reconcile(&guard, now) {
            let mut working = guard.clone();
            let mut changes = Vec::new();
            self.scheduler.reconcile(&mut working, now, &mut changes)?;
            if !changes.is_empty() {
                self.persist(&working)?;
                *guard = working;
                self.publish(&guard, &changes);
            }
        }
        Ok((guard, now))
    }

    async fn transact<T>(
        &self,
        op: impl FnOnce(
            &TurnScheduler,
            &mut RoomState,
            DateTime<Utc>,
            &mut Vec<Change>,
        ) -> Result<T, TurnError>,
    ) -> Result<T, EngineError> {
        let guard = self.room.lock().await;
        let now = self.clock.now();
        self.commit(guard, now, op)
    }

    /// Run `op` on a copy of the room and swap it in if it changed and was
    /// saved.
    ///
    /// A refused request keeps the changes it made before refusing (a
    /// reconcile, or the forfeited turn behind [`TurnError::TimeExpired`]).
    /// An internal error discards everything.
    fn commit<T>(
        &self,
        mut guard: MutexGuard<'_, RoomState>,
        now: DateTime<Utc>,
        op: impl FnOnce(
            &TurnScheduler,
            &mut RoomState,
            DateTime<Utc>,
            &mut Vec<Change>,
        ) -> Result<T, TurnError>,
    ) -> Result<T, EngineError> {
        let mut working = guard.clone();
        let mut changes = Vec::new();
        let result = op(&self.scheduler, &mut working, now, &mut changes);

        if let Some(e) = result.as_ref().err().filter(|e| e.is_internal()) {
            error!(error = %e, "Turn invariant violated, changes discarded");
            return Err(e.clone().into());
        }
        if !changes.is_empty() {
            self.persist(&working)?;
            *guard = working;
            self.publish(&guard, &changes);
        }
        result.map_err(EngineError::from)
    }

    /// Save `room` while the caller still holds the lock.
    ///
    /// On a multi-threaded runtime the save runs under `block_in_place`, so
    /// the file write and fsyncs do not stall other tasks on this worker.
    fn persist(&self, room: &RoomState) -> Result<(), EngineError> {
        let save = || self.store.save(room);
        let result = match Handle::try_current().map(|h| h.runtime_flavor()) {
            Ok(RuntimeFlavor::MultiThread) => tokio::task::block_in_place(save),
            _ => save(),
        };
        result.map_err(|e| {
            error!(error = %e, "Failed to save room, changes discarded");
            EngineError::from(e)
        })
    }

    fn publish(&self, room: &RoomState, changes: &[Change]) {
        for change in changes {
            if let Change::Submitted(entry) = change {
                self.send(LiveEvent::NewEntry {
                    entry: entry.clone(),
                });
            }
        }

        if changes.iter().any(Change::touches_turn) {
            let ended = changes.iter().find_map(|change| match change {
                Change::TurnEnded {
                    participant,
                    reason,
                    cooldown_until,
                } => Some(EndedTurn {
                    participant_id: *participant,
                    reason: *reason,
                    cooldown_until: *cooldown_until,
                }),
                _ => None,
            });
            let holder = room.turn().holder();
            self.send(LiveEvent::TurnUpdate {
                holder,
                nickname: holder
                    .and_then(|id| room.registry().nickname(id))
                    .map(str::to_owned),
                started_at: room.turn().started_at(),
                turn_seconds: u64::try_from(self.timings().turn.num_seconds()).unwrap_or(0),
                turn_number: room.turn().turn_number(),
                ended,
            });
        }

        if changes.iter().any(Change::touches_queue) {
            self.send(LiveEvent::QueueUpdate {
                queue: status::queued_participants(room, self.status_queue_limit),
            });
        }

        if changes.contains(&Change::DraftUpdated) {
            self.send(LiveEvent::DraftUpdate {
                draft: room.turn().draft().to_owned(),
            });
        }
    }

    /// Broadcast to live subscribers. Returns how many received it.
    fn send(&self, event: LiveEvent) -> usize {
        self.events.send(event).unwrap_or(0)
    }
}
