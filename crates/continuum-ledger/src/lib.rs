//! Append-only entry log for the Continuum writing service.
//!
//! Every accepted submission is recorded here exactly once, numbered by the
//! turn that produced it. Entries are never modified or deleted, and turn
//! numbers are strictly increasing and gapless: entry `n` was produced by the
//! `n`-th successful submission.
//!
//! # Architecture
//!
//! The ledger crate provides three modules:
//!
//! - [`ledger`] -- The [`Ledger`] struct: append-only log with chronological
//!   and recent-first reads.
//! - [`entry`] -- The [`EntryBuilder`] for validated entry construction.
//! - [`sequence`] -- Turn-number sequence verification, used when a ledger
//!   is rehydrated from storage.
//!
//! # Usage
//!
//! ```
//! use chrono::Utc;
//! use continuum_ledger::{EntryBuilder, Ledger, SequenceResult};
//! use continuum_types::ParticipantId;
//!
//! let mut ledger = Ledger::new();
//! let author = ParticipantId::new();
//!
//! let entry = EntryBuilder::new(1)
//!     .author(author, "ada".to_owned())
//!     .text("It was a dark and stormy night.")
//!     .created_at(Utc::now())
//!     .build(5000);
//! assert!(entry.is_ok());
//!
//! if let Ok(entry) = entry {
//!     assert!(ledger.append(entry).is_ok());
//! }
//! assert_eq!(ledger.verify_sequence(), SequenceResult::Contiguous);
//! ```

pub mod entry;
pub mod ledger;
pub mod sequence;

// Re-export primary types at crate root.
pub use entry::EntryBuilder;
pub use ledger::Ledger;
pub use sequence::SequenceResult;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when building or recording ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Entry text was empty after trimming surrounding whitespace.
    #[error("entry text must not be empty")]
    EmptyText,

    /// Entry text exceeds the configured bound.
    #[error("entry text is {len} characters, maximum is {max}")]
    TextTooLong {
        /// Length of the rejected text, in characters.
        len: usize,
        /// The configured maximum.
        max: usize,
    },

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// Turn numbers start at 1.
    #[error("turn number must be at least 1")]
    ZeroTurnNumber,

    /// The appended entry does not carry the next turn number.
    #[error("turn number {got} does not follow the last recorded turn {last}")]
    OutOfSequence {
        /// Turn number of the last recorded entry (0 for an empty ledger).
        last: u64,
        /// Turn number of the rejected entry.
        got: u64,
    },

    /// An internal error that should not occur in normal operation.
    #[error("internal ledger error: {0}")]
    Internal(&'static str),
}
