//! Participant registry: identity, nickname, and cooldown per writer.
//!
//! The registry is the only owner of cooldown timestamps. It never deletes a
//! participant; an expired cooldown simply lapses.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use continuum_types::{Participant, ParticipantId};

use crate::error::TurnError;

/// All registered participants, keyed by identity.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<Participant>", into = "Vec<Participant>")]
pub struct ParticipantRegistry {
    participants: BTreeMap<ParticipantId, Participant>,
}

impl ParticipantRegistry {
    /// Create an empty registry.
    pub const fn new() -> Self {
        Self {
            participants: BTreeMap::new(),
        }
    }

    /// Number of registered participants.
    pub fn len(&self) -> usize {
        self.participants.len()
    }

    /// Whether nobody has registered yet.
    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }

    /// Register a new participant with a trimmed nickname.
    ///
    /// Nicknames are not required to be unique.
    ///
    /// # Errors
    ///
    /// Returns [`TurnError::InvalidNickname`] if the nickname is blank.
    pub fn register(&mut self, nickname: &str, now: DateTime<Utc>) -> Result<Participant, TurnError> {
        let nickname = nickname.trim();
        if nickname.is_empty() {
            return Err(TurnError::InvalidNickname);
        }

        let participant = Participant {
            id: ParticipantId::new(),
            nickname: nickname.to_owned(),
            cooldown_until: None,
            created_at: now,
        };
        self.participants.insert(participant.id, participant.clone());
        Ok(participant)
    }

    /// Look up a participant.
    pub fn get(&self, id: ParticipantId) -> Option<&Participant> {
        self.participants.get(&id)
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: ParticipantId) -> bool {
        self.participants.contains_key(&id)
    }

    /// Nickname of a participant, if registered.
    pub fn nickname(&self, id: ParticipantId) -> Option<&str> {
        self.get(id).map(|p| p.nickname.as_str())
    }

    /// Time left on a participant's cooldown, if one is still running.
    pub fn cooldown_remaining(&self, id: ParticipantId, now: DateTime<Utc>) -> Option<TimeDelta> {
        let until = self.get(id)?.cooldown_until?;
        (until > now).then(|| until.signed_duration_since(now))
    }

    /// Set a participant's cooldown expiry. Returns `false` if the
    /// participant is unknown.
    pub(crate) fn apply_cooldown(&mut self, id: ParticipantId, until: DateTime<Utc>) -> bool {
        let Some(participant) = self.participants.get_mut(&id) else {
            return false;
        };
        participant.cooldown_until = Some(until);
        true
    }

    /// All participants in identity order (registration order, since IDs are
    /// UUID v7).
    pub fn iter(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }
}

/// A stored registry lists the same identity twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("participant {0} is registered more than once")]
pub struct DuplicateParticipant(pub ParticipantId);

impl TryFrom<Vec<Participant>> for ParticipantRegistry {
    type Error = DuplicateParticipant;

    fn try_from(list: Vec<Participant>) -> Result<Self, Self::Error> {
        let mut participants = BTreeMap::new();
        for participant in list {
            let id = participant.id;
            if participants.insert(id, participant).is_some() {
                return Err(DuplicateParticipant(id));
            }
        }
        Ok(Self { participants })
    }
}

impl From<ParticipantRegistry> for Vec<Participant> {
    fn from(registry: ParticipantRegistry) -> Self {
        registry.participants.into_values().collect()
    }
}
