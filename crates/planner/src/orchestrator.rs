//! Weekly preparation-plan generation.
//!
//! A plan is seven weekly recurring events, one per weekday, laid out on the
//! Sunday-to-Saturday week that contains the start date and ending on the
//! parent event's date. Occurrences that would fall before the start date are
//! removed, and every remaining occurrence ID is attached to the parent's
//! registry record.
//!
//! Nothing is rolled back when a later weekday fails: series created for
//! earlier weekdays stay in the calendar and the registry is not updated.

use {
    cadence_calendar::{
        CalendarGateway, EventBody, SharedCalendarConnector, SharedCalendarGateway,
    },
    cadence_config::PlannerConfig,
    cadence_registry::EventRegistry,
    chrono::{Days, NaiveDate},
    tracing::{debug, info, warn},
};

use crate::{
    collaborators::{Collaborators, DayEventRequest},
    dates::{CANONICAL_DATE_FORMAT, WEEK, anchor_sunday, normalize_date_string, weekday_name},
    error::{Context, Error, Result},
};

/// Inputs for one plan.
#[derive(Debug, Clone, Default)]
pub struct PlanRequest {
    pub parent_event_id: String,
    /// Start date in any accepted layout.
    pub start_date: String,
    pub user_requirements: Option<String>,
    /// Latest free-text message from the user.
    pub user_input: String,
    /// Stored schedule/availability profile.
    pub profile: String,
    pub access_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOutcome {
    /// Topic produced by the summary collaborator.
    pub topic: String,
    /// Start date in canonical `MM-DD-YYYY` form.
    pub start_date: String,
    /// One series ID per weekday, Sunday first.
    pub series_ids: Vec<String>,
    /// Flattened occurrence IDs across all series.
    pub instance_ids: Vec<String>,
    /// Occurrences deleted for falling before the start date.
    pub trimmed_ids: Vec<String>,
}

pub struct PlanOrchestrator {
    connector: SharedCalendarConnector,
    collaborators: Collaborators,
    timezone: String,
    until_time: String,
}

impl PlanOrchestrator {
    pub fn new(
        connector: SharedCalendarConnector,
        collaborators: Collaborators,
        config: &PlannerConfig,
    ) -> Self {
        Self {
            connector,
            collaborators,
            timezone: config.timezone.clone(),
            until_time: config.until_time.clone(),
        }
    }

    /// Open the calendar for `access_token`, rejecting a missing token.
    pub fn calendar(&self, access_token: Option<&str>) -> Result<SharedCalendarGateway> {
        let token = access_token
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::MissingCredential)?;
        Ok(self.connector.connect(token)?)
    }

    /// Build the plan and attach its occurrences to the parent's record.
    pub async fn generate_plan(
        &self,
        registry: &mut EventRegistry,
        request: &PlanRequest,
    ) -> Result<PlanOutcome> {
        let calendar = self.calendar(request.access_token.as_deref())?;
        if registry.record(&request.parent_event_id).is_none() {
            return Err(Error::NotRegistered {
                event_id: request.parent_event_id.clone(),
            });
        }

        let start_date = normalize_date_string(&request.start_date);
        let start = NaiveDate::parse_from_str(&start_date, CANONICAL_DATE_FORMAT).map_err(|_| {
            Error::InvalidDate {
                value: request.start_date.clone(),
            }
        })?;
        let anchor = anchor_sunday(start);

        let (parent_summary, until_date) =
            parent_details(calendar.as_ref(), &request.parent_event_id).await?;
        info!(
            parent = %request.parent_event_id,
            %start,
            %anchor,
            until = %until_date,
            "generating preparation plan"
        );

        let topic = self
            .collaborators
            .summarizer
            .summarize(&request.user_input, &parent_summary)
            .await?;
        let plan = self
            .collaborators
            .researcher
            .research_plan(
                &topic,
                &request.profile,
                request.user_requirements.as_deref(),
            )
            .await?;

        let mut series_ids = Vec::with_capacity(WEEK.len());
        let mut instance_ids = Vec::new();
        let mut trimmed_ids = Vec::new();

        for (offset, weekday) in (0u64..).zip(WEEK) {
            let date = anchor + Days::new(offset);
            let day_request = DayEventRequest {
                weekday,
                date,
                availability: request.profile.clone(),
                plan: plan.clone(),
                until_date: until_date.clone(),
                timezone: self.timezone.clone(),
            };
            let raw = self
                .collaborators
                .day_events
                .generate_day_event(&day_request)
                .await?;
            let mut body = parse_event_body(&raw)?;
            body.recurrence = vec![self.recurrence_rule(&until_date)];

            let created = calendar.insert(&body).await?;
            debug!(day = weekday_name(weekday), series = %created.id, "series created");

            let occurrences = calendar.list_instances(&created.id).await?;
            if let Some(first) = occurrences.first()
                && first.start.local_date().is_some_and(|d| d < start)
            {
                calendar.delete(&first.id).await?;
                debug!(event_id = %first.id, "removed occurrence before start date");
                trimmed_ids.push(first.id.clone());
            }

            instance_ids.extend(
                calendar
                    .list_instances(&created.id)
                    .await?
                    .into_iter()
                    .map(|e| e.id),
            );
            series_ids.push(created.id);
        }

        if !registry.attach_instances(&request.parent_event_id, instance_ids.clone()) {
            warn!(
                parent = %request.parent_event_id,
                "parent is not registered, occurrences were not attached"
            );
        }
        info!(
            parent = %request.parent_event_id,
            series = series_ids.len(),
            occurrences = instance_ids.len(),
            trimmed = trimmed_ids.len(),
            "preparation plan created"
        );

        Ok(PlanOutcome {
            topic,
            start_date,
            series_ids,
            instance_ids,
            trimmed_ids,
        })
    }

    fn recurrence_rule(&self, until_date: &str) -> String {
        format!("RRULE:FREQ=WEEKLY;UNTIL={until_date}{}", self.until_time)
    }
}

/// Parent summary and its date as `YYYYMMDD`.
async fn parent_details(
    calendar: &dyn CalendarGateway,
    event_id: &str,
) -> Result<(String, String)> {
    let parent = match calendar.get(event_id).await {
        Ok(event) => event,
        Err(e) if e.is_not_found() => {
            return Err(Error::ParentNotFound {
                event_id: event_id.to_string(),
            });
        },
        Err(e) => return Err(e.into()),
    };
    let date = parent
        .start
        .local_date()
        .with_context(|| format!("parent event {event_id} has no start date"))?;
    let summary = parent.summary.unwrap_or_else(|| "Untitled".to_string());
    Ok((summary, date.format("%Y%m%d").to_string()))
}

/// Parse a generated event body, tolerating a surrounding code fence.
pub fn parse_event_body(raw: &str) -> Result<EventBody> {
    let cleaned = raw.replace("```json", "").replace("```", "");
    serde_json::from_str(cleaned.trim()).map_err(Error::malformed)
}
