//! Preparation-plan generation.
//!
//! [`PlanOrchestrator`] turns a registered parent event and a start date into
//! seven weekly recurring events and attaches their occurrences to the
//! registry. What each day contains is delegated to the collaborators in
//! [`collaborators`]; [`llm::LlmClient`] implements them against an
//! OpenAI-compatible endpoint.

pub mod collaborators;
pub mod dates;
pub mod error;
pub mod llm;
pub mod orchestrator;

pub use {
    collaborators::{
        Collaborators, DayEventGenerator, DayEventRequest, PlanResearcher, SummaryGenerator,
    },
    dates::{anchor_sunday, normalize_date_string, parse_datetime},
    error::{Error, Result},
    llm::LlmClient,
    orchestrator::{PlanOrchestrator, PlanOutcome, PlanRequest, parse_event_body},
};
