//! Text-generation collaborators used while building a plan.

use std::sync::Arc;

use {
    async_trait::async_trait,
    chrono::{NaiveDate, Weekday},
};

use crate::error::Result;

/// Condenses the user's request and the parent event into a research topic.
#[async_trait]
pub trait SummaryGenerator: Send + Sync {
    async fn summarize(&self, user_input: &str, parent_summary: &str) -> Result<String>;
}

/// Drafts a free-text weekly outline for a topic.
#[async_trait]
pub trait PlanResearcher: Send + Sync {
    async fn research_plan(
        &self,
        topic: &str,
        profile: &str,
        extra_requirements: Option<&str>,
    ) -> Result<String>;
}

/// Everything the day-event generator is told about one weekday.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayEventRequest {
    pub weekday: Weekday,
    pub date: NaiveDate,
    /// The user's stored schedule/availability profile.
    pub availability: String,
    pub plan: String,
    /// Series end date, `YYYYMMDD`.
    pub until_date: String,
    pub timezone: String,
}

/// Produces the JSON body of one weekly recurring event. The reply may be
/// wrapped in a fenced code block.
#[async_trait]
pub trait DayEventGenerator: Send + Sync {
    async fn generate_day_event(&self, request: &DayEventRequest) -> Result<String>;
}

/// The three collaborators bundled for the orchestrator.
#[derive(Clone)]
pub struct Collaborators {
    pub summarizer: Arc<dyn SummaryGenerator>,
    pub researcher: Arc<dyn PlanResearcher>,
    pub day_events: Arc<dyn DayEventGenerator>,
}

impl Collaborators {
    /// Use one implementation for all three roles.
    pub fn from_shared<T>(inner: Arc<T>) -> Self
    where
        T: SummaryGenerator + PlanResearcher + DayEventGenerator + 'static,
    {
        Self {
            summarizer: Arc::clone(&inner) as Arc<dyn SummaryGenerator>,
            researcher: Arc::clone(&inner) as Arc<dyn PlanResearcher>,
            day_events: inner,
        }
    }
}
