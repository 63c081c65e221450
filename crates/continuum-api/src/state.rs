//! Shared application state for the writer API.
//!
//! [`AppState`] hands every handler the one [`TurnEngine`] plus the feed
//! paging limits. It is wrapped in [`Arc`] and injected via Axum's `State`
//! extractor; there is no other process-wide state.

use std::sync::Arc;

use continuum_core::config::FeedConfig;
use continuum_core::TurnEngine;
use continuum_types::LiveEvent;
use tokio::sync::broadcast;

/// Shared state for the Axum application.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The turn engine all requests go through.
    pub engine: Arc<TurnEngine>,
    /// Feed paging limits.
    pub feed: FeedConfig,
}

impl AppState {
    /// Create the state around an engine.
    pub const fn new(engine: Arc<TurnEngine>, feed: FeedConfig) -> Self {
        Self { engine, feed }
    }

    /// Subscribe to live events.
    ///
    /// Returns a receiver that yields every [`LiveEvent`] published after
    /// this call.
    pub fn subscribe(&self) -> broadcast::Receiver<LiveEvent> {
        self.engine.subscribe()
    }

    /// Clamp a caller-supplied entry limit to the configured maximum.
    pub fn clamp_limit(&self, requested: Option<usize>) -> usize {
        requested.map_or(self.feed.max_limit, |n| n.min(self.feed.max_limit))
    }
}
