//! Turn scheduling for the Continuum shared-writing service.
//!
//! One participant at a time holds the turn and may write. Everyone else
//! waits in a FIFO queue. A turn ends on submission or when its time runs
//! out, and the former holder then sits out a cooldown before queueing
//! again. All time-driven transitions happen in a reconcile step that runs at
//! the start of every request, so no timer is needed for correctness.
//!
//! # Modules
//!
//! - [`clock`] -- [`Clock`] trait, wall clock, and a manual clock for tests.
//! - [`config`] -- Loading `continuum-config.yaml` into typed structs.
//! - [`registry`] -- Registered participants and their cooldowns.
//! - [`queue`] -- The FIFO waiting line.
//! - [`turn`] -- Holder, turn start, draft, and completed-turn counter.
//! - [`room`] -- All of the above plus the ledger, as one persisted unit.
//! - [`scheduler`] -- The state machine: reconcile, join, leave, draft,
//!   submit.
//! - [`status`] -- Read-only status snapshots.
//! - [`store`] -- Snapshot persistence (JSON file or memory).
//! - [`engine`] -- The mutex-guarded facade used by request handlers.
//! - [`runner`] -- Optional periodic reconcile task.
//!
//! [`Clock`]: clock::Clock

pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod queue;
pub mod registry;
pub mod room;
pub mod runner;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod turn;

pub use engine::TurnEngine;
pub use error::{EngineError, TurnError};
pub use room::{RoomState, StateError};
pub use scheduler::{Change, TurnScheduler, TurnTimings};
pub use store::{JsonFileStore, MemoryStore, StateStore, StoreError};
