//! FIFO queue of participants waiting for a turn.
//!
//! Insertion order is the only ordering: the head is always the participant
//! who joined earliest. An identity appears at most once.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use continuum_types::{ParticipantId, QueueEntry};

use crate::error::TurnError;

/// Waiting participants in turn order.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TurnQueue {
    entries: VecDeque<QueueEntry>,
}

impl TurnQueue {
    /// Create an empty queue.
    pub const fn new() -> Self {
        Self {
            entries: VecDeque::new(),
        }
    }

    /// Number of waiting participants.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nobody is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Whether `id` is waiting.
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.entries.iter().any(|e| e.participant_id == id)
    }

    /// Zero-based position of `id`, if waiting.
    pub fn position(&self, id: ParticipantId) -> Option<usize> {
        self.entries.iter().position(|e| e.participant_id == id)
    }

    /// Append `id` to the tail.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::AlreadyQueued`] if `id` is already waiting.
    pub(crate) fn push(&mut self, id: ParticipantId, now: DateTime<Utc>) -> Result<(), TurnError> {
        if self.contains(id) {
            return Err(TurnError::AlreadyQueued);
        }
        self.entries.push_back(QueueEntry {
            participant_id: id,
            enqueued_at: now,
        });
        Ok(())
    }

    /// Remove `id` wherever it is. Returns whether it was present.
    pub(crate) fn remove(&mut self, id: ParticipantId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e.participant_id != id);
        self.entries.len() != before
    }

    /// Take the head of the queue.
    pub(crate) fn pop_front(&mut self) -> Option<QueueEntry> {
        self.entries.pop_front()
    }

    /// Waiting participants, head first.
    pub fn iter(&self) -> impl Iterator<Item = &QueueEntry> {
        self.entries.iter()
    }

    /// First identity that appears more than once, if any.
    pub fn first_duplicate(&self) -> Option<ParticipantId> {
        let mut seen = std::collections::BTreeSet::new();
        self.entries
            .iter()
            .map(|e| e.participant_id)
            .find(|id| !seen.insert(*id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order() {
        let mut queue = TurnQueue::new();
        let (a, b, c) = (ParticipantId::new(), ParticipantId::new(), ParticipantId::new());
        let now = Utc::now();
        assert!(queue.push(a, now).is_ok());
        assert!(queue.push(b, now).is_ok());
        assert!(queue.push(c, now).is_ok());

        assert_eq!(queue.position(b), Some(1));
        assert_eq!(queue.pop_front().map(|e| e.participant_id), Some(a));
        assert_eq!(queue.pop_front().map(|e| e.participant_id), Some(b));
        assert_eq!(queue.pop_front().map(|e| e.participant_id), Some(c));
        assert!(queue.pop_front().is_none());
    }

    #[test]
    fn duplicate_push_rejected() {
        let mut queue = TurnQueue::new();
        let a = ParticipantId::new();
        assert!(queue.push(a, Utc::now()).is_ok());
        assert_eq!(queue.push(a, Utc::now()).err(), Some(TurnError::AlreadyQueued));
        assert_eq!(queue.len(), 1);
        assert!(queue.first_duplicate().is_none());
    }

    #[test]
    fn remove_from_middle_keeps_order() {
        let mut queue = TurnQueue::new();
        let ids: Vec<ParticipantId> = (0..4).map(|_| ParticipantId::new()).collect();
        for id in &ids {
            let _ = queue.push(*id, Utc::now());
        }
        let removed = ids.get(1).copied().unwrap_or_default();
        assert!(queue.remove(removed));
        assert!(!queue.remove(removed));

        let remaining: Vec<ParticipantId> = queue.iter().map(|e| e.participant_id).collect();
        let expected: Vec<ParticipantId> =
            ids.iter().copied().filter(|id| *id != removed).collect();
        assert_eq!(remaining, expected);
    }

    #[test]
    fn duplicates_detected_in_loaded_queue() {
        let a = ParticipantId::new();
        let entry = QueueEntry {
            participant_id: a,
            enqueued_at: Utc::now(),
        };
        let json = serde_json::to_value(vec![entry.clone(), entry]).unwrap_or_default();
        let queue: TurnQueue = serde_json::from_value(json).unwrap_or_default();
        assert_eq!(queue.first_duplicate(), Some(a));
    }
}
