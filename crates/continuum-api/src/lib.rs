//! HTTP and `WebSocket` surface for the Continuum writing service.
//!
//! This crate provides an Axum server that exposes:
//!
//! - **REST endpoints** for registering, queueing, polling the turn status,
//!   saving drafts, submitting entries, and reading the ledger
//! - **`WebSocket` endpoint** (`/ws/events`) streaming live turn, queue,
//!   draft, and entry events via [`tokio::sync::broadcast`]
//! - **Minimal HTML status page** (`GET /`)
//!
//! # Architecture
//!
//! Handlers hold no state of their own. Each one extracts the caller's
//! identity (header or cookie, see [`session`]) and calls the shared
//! [`TurnEngine`], which serializes all turn logic behind one lock. Engine
//! errors become JSON error bodies through [`ApiError`].
//!
//! [`TurnEngine`]: continuum_core::TurnEngine

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod session;
pub mod state;
pub mod ws;

// Re-export primary types for convenience.
pub use error::ApiError;
pub use router::build_router;
pub use server::{start_server, ServerConfig, ServerError};
pub use state::AppState;
