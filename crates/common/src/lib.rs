//! Shared error-context helpers and the status-tagged outcome used across all cadence crates.

pub mod error;
pub mod outcome;

pub use {
    error::FromMessage,
    outcome::{Outcome, Status},
};
