//! Enumeration types shared between the engine and its clients.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Sort order for ledger reads.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EntryOrder {
    /// Oldest first, for reading the whole text like a book.
    #[default]
    Asc,
    /// Newest first, for polling feeds.
    Desc,
}

/// Why a turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum TurnEndReason {
    /// The holder submitted text within the turn window.
    Submitted,
    /// The turn window elapsed (with or without a late submission attempt).
    Expired,
}
