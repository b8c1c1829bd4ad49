// Roster model: composite slot records and the builder that owns them.

pub mod builder;
pub mod slot;

pub use builder::RosterBuilder;
pub use slot::{PhotoTicket, RosterSlot, SlotId, SlotUpdate, Touched};
