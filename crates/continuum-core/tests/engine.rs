//! Integration tests for the turn engine facade.
//!
//! Time is driven by a `ManualClock`; nothing sleeps. No background task
//! runs, so every transition here is triggered by a request alone.

#![allow(clippy::unwrap_used)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use continuum_core::clock::ManualClock;
use continuum_core::{
    EngineError, JsonFileStore, MemoryStore, RoomState, StateError, StateStore, StoreError,
    TurnEngine, TurnError, TurnTimings,
};
use continuum_types::{EntryOrder, LiveEvent, ParticipantId, TurnEndReason};

fn t0() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

fn engine_with(store: Arc<dyn StateStore>) -> (Arc<TurnEngine>, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(t0()));
    let engine = TurnEngine::open(TurnTimings::default(), clock.clone(), store, 50).unwrap();
    (Arc::new(engine), clock)
}

fn engine() -> (Arc<TurnEngine>, Arc<ManualClock>) {
    engine_with(Arc::new(MemoryStore::new()))
}

fn turn_err<T: core::fmt::Debug>(result: Result<T, EngineError>) -> TurnError {
    result.unwrap_err().as_turn().cloned().unwrap()
}

#[tokio::test]
async fn full_rotation_between_two_writers() {
    let (engine, clock) = engine();
    let a = engine.register("A").await.unwrap().id;
    let b = engine.register("B").await.unwrap().id;

    engine.join(a).await.unwrap();
    engine.join(b).await.unwrap();
    let status = engine.status(Some(b)).await.unwrap();
    assert_eq!(status.current_holder, Some(a));
    assert_eq!(status.queue_length, 1);
    assert_eq!(status.seconds_remaining, 120);

    clock.advance_secs(30);
    let entry = engine.submit(a, "hello").await.unwrap();
    assert_eq!(entry.turn_number, 1);
    assert_eq!(entry.author_id, a);

    let status = engine.status(Some(a)).await.unwrap();
    assert_eq!(status.current_holder, Some(b));
    assert_eq!(status.current_nickname.as_deref(), Some("B"));
    assert_eq!(status.draft, "");
    assert_eq!(status.my_cooldown_seconds, Some(300));
    assert_eq!(
        engine.participant(a).await.unwrap().cooldown_until,
        Some(t0() + TimeDelta::seconds(330))
    );
}

#[tokio::test]
async fn status_poll_expires_stale_turn() {
    let (engine, clock) = engine();
    let a = engine.register("A").await.unwrap().id;
    let b = engine.register("B").await.unwrap().id;
    engine.join(a).await.unwrap();
    engine.join(b).await.unwrap();

    clock.advance_secs(150);
    let status = engine.status(None).await.unwrap();

    assert_eq!(status.current_holder, Some(b));
    assert_eq!(status.seconds_remaining, 120);
    let room = engine.snapshot().await.unwrap();
    assert_eq!(room.turn().started_at(), Some(t0() + TimeDelta::seconds(150)));
    assert_eq!(
        room.registry().get(a).unwrap().cooldown_until,
        Some(t0() + TimeDelta::seconds(450))
    );
}

#[tokio::test]
async fn late_submit_is_refused_and_persisted() {
    let store = Arc::new(MemoryStore::new());
    let (engine, clock) = engine_with(store.clone());
    let a = engine.register("A").await.unwrap().id;
    engine.join(a).await.unwrap();

    clock.advance_secs(120);
    assert_eq!(
        turn_err(engine.submit(a, "made it?").await),
        TurnError::TimeExpired
    );

    let saved = store.load().unwrap().unwrap();
    assert_eq!(saved.turn().holder(), None);
    assert!(saved.registry().get(a).unwrap().cooldown_until.is_some());
    assert!(saved.ledger().is_empty());
    assert_eq!(
        turn_err(engine.join(a).await),
        TurnError::CooldownActive {
            remaining_seconds: 300
        }
    );
}

#[tokio::test]
async fn concurrent_double_submit_only_one_wins() {
    let (engine, _clock) = engine();
    let a = engine.register("A").await.unwrap().id;
    engine.join(a).await.unwrap();

    let first = tokio::spawn({
        let engine = engine.clone();
        async move { engine.submit(a, "one").await }
    });
    let second = tokio::spawn({
        let engine = engine.clone();
        async move { engine.submit(a, "two").await }
    });
    let results = [first.await.unwrap(), second.await.unwrap()];

    let wins = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(wins, 1);
    let loser = results.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert_eq!(loser.as_turn(), Some(&TurnError::NoActiveTurn));
    assert_eq!(engine.entry_count().await, 1);
}

#[tokio::test]
async fn concurrent_joins_never_duplicate() {
    let (engine, _clock) = engine();
    let a = engine.register("A").await.unwrap().id;
    let b = engine.register("B").await.unwrap().id;
    engine.join(a).await.unwrap();

    let mut handles = Vec::new();
    for _ in 0..8 {
        let engine = engine.clone();
        handles.push(tokio::spawn(async move { engine.join(b).await }));
    }
    let mut ok = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            ok += 1;
        }
    }

    assert_eq!(ok, 1);
    let room = engine.snapshot().await.unwrap();
    assert_eq!(room.queue().len(), 1);
    assert_eq!(room.validate(), Ok(()));
}

#[tokio::test]
async fn entries_page_in_both_orders() {
    let (engine, clock) = engine();
    let a = engine.register("A").await.unwrap().id;
    let b = engine.register("B").await.unwrap().id;
    for (who, text) in [(a, "first"), (b, "second")] {
        engine.join(who).await.unwrap();
        engine.submit(who, text).await.unwrap();
        clock.advance_secs(1);
    }
    clock.advance_secs(400);
    engine.join(a).await.unwrap();
    engine.submit(a, "third").await.unwrap();

    let asc: Vec<String> = engine
        .entries(EntryOrder::Asc, None)
        .await
        .into_iter()
        .map(|e| e.text)
        .collect();
    assert_eq!(asc, vec!["first", "second", "third"]);

    let desc: Vec<u64> = engine
        .entries(EntryOrder::Desc, Some(2))
        .await
        .into_iter()
        .map(|e| e.turn_number)
        .collect();
    assert_eq!(desc, vec![3, 2]);
}

#[tokio::test]
async fn live_events_follow_a_submission() {
    let (engine, _clock) = engine();
    let a = engine.register("A").await.unwrap().id;
    let b = engine.register("B").await.unwrap().id;
    engine.join(a).await.unwrap();
    engine.join(b).await.unwrap();

    let mut rx = engine.subscribe();
    engine.submit(a, "hello").await.unwrap();

    let event = rx.recv().await.unwrap();
    assert!(matches!(&event, LiveEvent::NewEntry { entry } if entry.text == "hello"));

    let event = rx.recv().await.unwrap();
    assert!(matches!(
        &event,
        LiveEvent::TurnUpdate { holder: Some(holder), ended: Some(ended), .. }
            if *holder == b
                && ended.participant_id == a
                && ended.reason == TurnEndReason::Submitted
    ));

    let event = rx.recv().await.unwrap();
    assert!(matches!(&event, LiveEvent::QueueUpdate { queue } if queue.is_empty()));
}

#[tokio::test]
async fn draft_is_visible_and_reset_on_promotion() {
    let (engine, _clock) = engine();
    let a = engine.register("A").await.unwrap().id;
    let b = engine.register("B").await.unwrap().id;
    engine.join(a).await.unwrap();
    engine.join(b).await.unwrap();

    engine.update_draft(a, "work in progress").await.unwrap();
    assert_eq!(engine.draft().await.unwrap(), "work in progress");
    assert_eq!(
        turn_err(engine.update_draft(b, "mine now").await),
        TurnError::NotYourTurn
    );

    engine.submit(a, "done").await.unwrap();
    assert_eq!(engine.draft().await.unwrap(), "");
}

#[tokio::test]
async fn state_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let (a, b) = {
        let (engine, clock) = engine_with(Arc::new(JsonFileStore::new(&path)));
        let a = engine.register("A").await.unwrap().id;
        let b = engine.register("B").await.unwrap().id;
        engine.join(a).await.unwrap();
        engine.join(b).await.unwrap();
        clock.advance_secs(10);
        engine.submit(a, "persisted").await.unwrap();
        (a, b)
    };

    let (engine, clock) = engine_with(Arc::new(JsonFileStore::new(&path)));
    clock.advance_secs(10);
    let status = engine.status(Some(a)).await.unwrap();

    assert_eq!(status.current_holder, Some(b));
    assert_eq!(status.turn_number, 1);
    assert_eq!(status.my_cooldown_seconds, Some(300));
    let book = engine.entries(EntryOrder::Asc, None).await;
    assert_eq!(book.len(), 1);
    assert_eq!(book.first().unwrap().author_nickname, "A");
}

#[tokio::test]
async fn corrupt_snapshot_is_refused_on_open() {
    let stranger = ParticipantId::new();
    let json = serde_json::json!({
        "version": 1,
        "room": {
            "registry": [],
            "queue": [{ "participant_id": stranger, "enqueued_at": t0() }],
            "turn": { "holder": null, "started_at": null },
            "ledger": []
        }
    });
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, json.to_string()).unwrap();

    let err = TurnEngine::open(
        TurnTimings::default(),
        Arc::new(ManualClock::new(t0())),
        Arc::new(JsonFileStore::new(&path)),
        50,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::State(StateError::UnknownQueued(id)) if id == stranger));
}

#[tokio::test]
async fn duplicate_participant_snapshot_is_refused_on_open() {
    let id = ParticipantId::new();
    let participant = |nickname: &str| {
        serde_json::json!({
            "id": id,
            "nickname": nickname,
            "cooldown_until": null,
            "created_at": t0(),
        })
    };
    let json = serde_json::json!({
        "version": 1,
        "room": {
            "registry": [participant("A"), participant("B")],
            "queue": [],
            "turn": { "holder": null, "started_at": null },
            "ledger": []
        }
    });
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    std::fs::write(&path, json.to_string()).unwrap();

    let err = TurnEngine::open(
        TurnTimings::default(),
        Arc::new(ManualClock::new(t0())),
        Arc::new(JsonFileStore::new(&path)),
        50,
    )
    .unwrap_err();
    assert!(matches!(err, EngineError::Store(StoreError::Deserialize(_))));
    assert!(err.to_string().contains("more than once"));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn file_store_saves_under_multi_thread_runtime() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("state.json");
    let (engine, clock) = engine_with(Arc::new(JsonFileStore::new(&path)));
    let a = engine.register("A").await.unwrap().id;
    let b = engine.register("B").await.unwrap().id;
    engine.join(a).await.unwrap();
    engine.join(b).await.unwrap();

    let drafts: Vec<_> = (0..8)
        .map(|i| {
            let engine = Arc::clone(&engine);
            tokio::spawn(async move { engine.update_draft(a, &format!("draft {i}")).await })
        })
        .collect();
    let poller = {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move { engine.status(Some(b)).await })
    };
    for task in drafts {
        task.await.unwrap().unwrap();
    }
    assert_eq!(poller.await.unwrap().unwrap().current_holder, Some(a));

    clock.advance_secs(5);
    engine.submit(a, "written under load").await.unwrap();

    let saved = JsonFileStore::new(&path).load().unwrap().unwrap();
    assert_eq!(saved.ledger().len(), 1);
    assert_eq!(saved.turn().holder(), Some(b));
    assert_eq!(saved, engine.snapshot().await.unwrap());
}

/// A store whose saves can be switched off.
#[derive(Debug, Default)]
struct FlakyStore {
    inner: MemoryStore,
    broken: AtomicBool,
}

impl StateStore for FlakyStore {
    fn load(&self) -> Result<Option<RoomState>, StoreError> {
        self.inner.load()
    }

    fn save(&self, room: &RoomState) -> Result<(), StoreError> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(StoreError::Io {
                context: "test save",
                source: std::io::Error::other("disk full"),
            });
        }
        self.inner.save(room)
    }
}

#[tokio::test]
async fn failed_save_leaves_state_untouched() {
    let store = Arc::new(FlakyStore::default());
    let (engine, _clock) = engine_with(store.clone());
    let a = engine.register("A").await.unwrap().id;
    engine.join(a).await.unwrap();
    let before = engine.snapshot().await.unwrap();

    store.broken.store(true, Ordering::SeqCst);
    let err = engine.submit(a, "lost").await.unwrap_err();
    assert!(matches!(err, EngineError::Store(_)));

    assert_eq!(engine.snapshot().await.unwrap(), before);
    assert_eq!(store.inner.load().unwrap(), Some(before));

    store.broken.store(false, Ordering::SeqCst);
    assert_eq!(engine.submit(a, "kept").await.unwrap().turn_number, 1);
}

#[tokio::test]
async fn reads_do_not_persist_when_nothing_changes() {
    let store = Arc::new(MemoryStore::new());
    let (engine, _clock) = engine_with(store.clone());
    let a = engine.register("A").await.unwrap().id;
    engine.join(a).await.unwrap();
    let saves = store.saves();

    engine.status(Some(a)).await.unwrap();
    engine.draft().await.unwrap();
    engine.leave(a).await.unwrap();
    assert!(!engine.reconcile().await.unwrap());

    assert_eq!(store.saves(), saves);
}
