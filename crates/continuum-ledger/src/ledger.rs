//! The ledger: an append-only log of accepted submissions.
//!
//! The [`Ledger`] struct is the in-memory representation of the whole
//! written text. It holds every [`Entry`] in acceptance order and serves two
//! read patterns: chronological (reading the text like a book) and
//! recent-first (bounded feeds for polling clients).
//!
//! # Design
//!
//! - **Append-only**: entries are never modified or deleted.
//! - **Gapless numbering**: the `n`-th entry carries turn number `n`.
//! - **Pure reads**: no read method takes `&mut self`.

use serde::{Deserialize, Serialize};
use tracing::debug;

use continuum_types::{Entry, EntryOrder, ParticipantId};

use crate::LedgerError;
use crate::sequence::{SequenceResult, verify_sequence};

/// The append-only log of accepted submissions.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    /// All entries, in acceptance order.
    entries: Vec<Entry>,
}

impl Ledger {
    /// Create a new empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries in the ledger.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the ledger has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Turn number of the newest entry, or 0 for an empty ledger.
    pub fn last_turn_number(&self) -> u64 {
        self.entries.last().map_or(0, |e| e.turn_number)
    }

    /// Append an entry produced by the next successful submission.
    ///
    /// The entry must carry turn number `last_turn_number() + 1`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OutOfSequence`] if the turn number does not
    /// directly follow the last recorded one.
    pub fn append(&mut self, entry: Entry) -> Result<&Entry, LedgerError> {
        let last = self.last_turn_number();
        if last.checked_add(1) != Some(entry.turn_number) {
            return Err(LedgerError::OutOfSequence {
                last,
                got: entry.turn_number,
            });
        }

        debug!(
            turn_number = entry.turn_number,
            author = %entry.author_id,
            chars = entry.text.chars().count(),
            "Ledger entry appended"
        );
        self.entries.push(entry);

        self.entries.last().ok_or(LedgerError::Internal(
            "failed to retrieve entry after append",
        ))
    }

    /// All entries, oldest first.
    pub fn ascending(&self) -> &[Entry] {
        &self.entries
    }

    /// Up to `limit` entries, newest first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &Entry> {
        self.entries.iter().rev().take(limit)
    }

    /// Owned page of entries in the requested order.
    ///
    /// `limit = None` returns every entry.
    pub fn page(&self, order: EntryOrder, limit: Option<usize>) -> Vec<Entry> {
        let limit = limit.unwrap_or(self.entries.len());
        match order {
            EntryOrder::Asc => self.entries.iter().take(limit).cloned().collect(),
            EntryOrder::Desc => self.recent(limit).cloned().collect(),
        }
    }

    /// Entries written by one participant, oldest first.
    pub fn by_author(&self, author: ParticipantId) -> Vec<&Entry> {
        self.entries
            .iter()
            .filter(|e| e.author_id == author)
            .collect()
    }

    /// Check that entries are numbered `1..=len` in order.
    pub fn verify_sequence(&self) -> SequenceResult {
        verify_sequence(&self.entries)
    }
}
