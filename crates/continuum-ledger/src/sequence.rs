//! Turn-number sequence verification.
//!
//! A healthy ledger numbers its entries `1, 2, 3, ...` in insertion order.
//! [`Ledger::append`](crate::Ledger::append) guarantees this for entries
//! recorded in-process; this check exists for ledgers rehydrated from
//! storage, where the file could have been edited or truncated.

use continuum_types::Entry;

/// Where a ledger's numbering first goes wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequenceBreak {
    /// Zero-based position of the offending entry.
    pub position: usize,
    /// The turn number that should have been at `position`.
    pub expected: u64,
    /// The turn number actually found.
    pub found: u64,
}

impl core::fmt::Display for SequenceBreak {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "entry at position {} has turn number {}, expected {}",
            self.position, self.found, self.expected
        )
    }
}

/// The result of a sequence check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceResult {
    /// Turn numbers run `1..=len` without gaps or repeats.
    Contiguous,
    /// The first position where numbering diverges.
    Broken(SequenceBreak),
}

/// Verify that `entries` are numbered `1..=entries.len()` in order.
pub fn verify_sequence(entries: &[Entry]) -> SequenceResult {
    let mut expected: u64 = 1;
    for (position, entry) in entries.iter().enumerate() {
        if entry.turn_number != expected {
            return SequenceResult::Broken(SequenceBreak {
                position,
                expected,
                found: entry.turn_number,
            });
        }
        expected = expected.saturating_add(1);
    }
    SequenceResult::Contiguous
}
