//! Validated construction of ledger entries.
//!
//! [`EntryBuilder`] trims the submitted text and enforces the non-empty and
//! maximum-length rules before an [`Entry`] exists at all, so a malformed
//! entry can never reach the ledger.

use chrono::{DateTime, Utc};

use continuum_types::{Entry, EntryId, ParticipantId};

use crate::LedgerError;

/// Builder for constructing validated [`Entry`] values.
///
/// # Examples
///
/// ```
/// use chrono::Utc;
/// use continuum_ledger::EntryBuilder;
/// use continuum_types::ParticipantId;
///
/// let entry = EntryBuilder::new(3)
///     .author(ParticipantId::new(), "grace".to_owned())
///     .text("  and then the lights went out.  ")
///     .created_at(Utc::now())
///     .build(5000);
///
/// assert_eq!(entry.map(|e| e.text).ok().as_deref(), Some("and then the lights went out."));
/// ```
#[derive(Debug)]
pub struct EntryBuilder {
    turn_number: u64,
    author_id: Option<ParticipantId>,
    author_nickname: Option<String>,
    text: Option<String>,
    created_at: Option<DateTime<Utc>>,
}

impl EntryBuilder {
    /// Start building the entry for the given turn number.
    pub const fn new(turn_number: u64) -> Self {
        Self {
            turn_number,
            author_id: None,
            author_nickname: None,
            text: None,
            created_at: None,
        }
    }

    /// Set the author identity and the nickname captured at submit time.
    #[must_use]
    pub fn author(mut self, id: ParticipantId, nickname: String) -> Self {
        self.author_id = Some(id);
        self.author_nickname = Some(nickname);
        self
    }

    /// Set the submitted text. Surrounding whitespace is trimmed on build.
    #[must_use]
    pub fn text(mut self, text: &str) -> Self {
        self.text = Some(text.to_owned());
        self
    }

    /// Set the acceptance time.
    #[must_use]
    pub const fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    /// Validate inputs and produce an [`Entry`].
    ///
    /// `max_chars` bounds the trimmed text length, counted in characters.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingField`] if a required field is not set,
    /// [`LedgerError::ZeroTurnNumber`] for turn 0, [`LedgerError::EmptyText`]
    /// for blank text, and [`LedgerError::TextTooLong`] above `max_chars`.
    pub fn build(self, max_chars: usize) -> Result<Entry, LedgerError> {
        let author_id = self.author_id.ok_or(LedgerError::MissingField("author_id"))?;
        let author_nickname = self
            .author_nickname
            .ok_or(LedgerError::MissingField("author_nickname"))?;
        let raw = self.text.ok_or(LedgerError::MissingField("text"))?;
        let created_at = self.created_at.ok_or(LedgerError::MissingField("created_at"))?;

        if self.turn_number == 0 {
            return Err(LedgerError::ZeroTurnNumber);
        }

        let text = raw.trim();
        if text.is_empty() {
            return Err(LedgerError::EmptyText);
        }
        let len = text.chars().count();
        if len > max_chars {
            return Err(LedgerError::TextTooLong { len, max: max_chars });
        }

        Ok(Entry {
            id: EntryId::new(),
            author_id,
            author_nickname,
            text: text.to_owned(),
            turn_number: self.turn_number,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder(turn: u64, text: &str) -> EntryBuilder {
        EntryBuilder::new(turn)
            .author(ParticipantId::new(), "ada".to_owned())
            .text(text)
            .created_at(Utc::now())
    }

    #[test]
    fn valid_entry_builds() {
        let entry = builder(1, "hello").build(5000);
        assert!(entry.is_ok());
        let entry = entry.ok();
        assert_eq!(entry.as_ref().map(|e| e.turn_number), Some(1));
        assert_eq!(entry.map(|e| e.author_nickname).as_deref(), Some("ada"));
    }

    #[test]
    fn text_is_trimmed() {
        let entry = builder(1, "\n\t hello world \n").build(5000);
        assert_eq!(entry.map(|e| e.text).ok().as_deref(), Some("hello world"));
    }

    #[test]
    fn whitespace_only_text_rejected() {
        let result = builder(1, "   ").build(5000);
        assert_eq!(result.err(), Some(LedgerError::EmptyText));
    }

    #[test]
    fn overlong_text_rejected() {
        let text = "x".repeat(11);
        let result = builder(1, &text).build(10);
        assert_eq!(result.err(), Some(LedgerError::TextTooLong { len: 11, max: 10 }));
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        // Four characters, twelve bytes.
        let result = builder(1, "ünïç").build(4);
        assert!(result.is_ok());
    }

    #[test]
    fn missing_author_rejected() {
        let result = EntryBuilder::new(1)
            .text("hello")
            .created_at(Utc::now())
            .build(5000);
        assert_eq!(result.err(), Some(LedgerError::MissingField("author_id")));
    }

    #[test]
    fn turn_zero_rejected() {
        let result = builder(0, "hello").build(5000);
        assert_eq!(result.err(), Some(LedgerError::ZeroTurnNumber));
    }
}
