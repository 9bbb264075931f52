//! Event registry.
//!
//! Tracks which calendar events the assistant created, which of them own a
//! generated preparation series, and which IDs are occurrences of such a
//! series. The registry is plain data: it is loaded from and written back to
//! session state by the caller, and only [`EventRegistry::remove_parent`] and
//! [`EventRegistry::reconcile`] talk to the calendar.

pub mod record;
pub mod registry;
pub mod sync;

pub use {
    record::{Classification, EventKind, EventRecord, InvalidEventKind},
    registry::EventRegistry,
    sync::{ParentRemoval, delete_best_effort},
};
