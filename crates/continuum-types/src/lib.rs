//! Shared type definitions for the Continuum collaborative writing service.
//!
//! This crate is the single source of truth for the types that cross crate
//! and process boundaries. Types defined here flow downstream to `TypeScript`
//! via `ts-rs` for the browser client.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for participants and entries
//! - [`enums`] -- Read ordering and turn-end reasons
//! - [`structs`] -- Participants, queue entries, ledger entries, status snapshot
//! - [`events`] -- Live-update events for connected observers

pub mod enums;
pub mod events;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use enums::{EntryOrder, TurnEndReason};
pub use events::{EndedTurn, LiveEvent};
pub use ids::{EntryId, ParticipantId};
pub use structs::{Entry, Participant, QueueEntry, QueuedParticipant, StatusSnapshot};

#[cfg(test)]
mod tests {
    //! `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs writes the files to the `bindings/` directory relative to
        // the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::ParticipantId::export_all();
        let _ = crate::ids::EntryId::export_all();

        // Enums
        let _ = crate::enums::EntryOrder::export_all();
        let _ = crate::enums::TurnEndReason::export_all();

        // Structs
        let _ = crate::structs::Participant::export_all();
        let _ = crate::structs::QueueEntry::export_all();
        let _ = crate::structs::QueuedParticipant::export_all();
        let _ = crate::structs::Entry::export_all();
        let _ = crate::structs::StatusSnapshot::export_all();

        // Events
        let _ = crate::events::EndedTurn::export_all();
        let _ = crate::events::LiveEvent::export_all();
    }
}
