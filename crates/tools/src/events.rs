//! Creating and listing calendar events.

use std::sync::Arc;

use {
    anyhow::Result as AnyResult,
    async_trait::async_trait,
    cadence_calendar::{CalendarEvent, EventBody, EventDateTime, TimeRange, format_event_time},
    cadence_common::Outcome,
    cadence_planner::parse_datetime,
    cadence_registry::EventRegistry,
    chrono::{NaiveDate, Utc},
    serde::Serialize,
    serde_json::{Value, json},
    tracing::{debug, info},
};

use crate::{
    context::{ToolContext, optional_str, required_str, session_key},
    error::Result,
    tool_registry::AgentTool,
};

pub const INVALID_DATETIME: &str = "Invalid date/time format. Please use YYYY-MM-DD HH:MM format.";

/// Listing row for one event, annotated with its registry role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRow {
    pub id: String,
    pub summary: String,
    pub start: String,
    pub end: String,
    pub location: String,
    pub description: String,
    pub attendees: Vec<String>,
    pub link: String,
    pub event_type: String,
}

impl EventRow {
    pub fn new(event: &CalendarEvent, registry: &EventRegistry) -> Self {
        Self {
            id: event.id.clone(),
            summary: event
                .summary
                .clone()
                .unwrap_or_else(|| "Untitled Event".into()),
            start: format_event_time(&event.start),
            end: format_event_time(&event.end),
            location: event.location.clone().unwrap_or_default(),
            description: event.description.clone().unwrap_or_default(),
            attendees: event
                .attendees
                .iter()
                .filter_map(|a| a.email.clone())
                .collect(),
            link: event.html_link.clone().unwrap_or_default(),
            event_type: registry.classify(&event.id).kind.or_single().to_string(),
        }
    }
}

pub struct CreateEventTool {
    ctx: Arc<ToolContext>,
}

impl CreateEventTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn create(
        &self,
        user_id: &str,
        summary: &str,
        start_time: &str,
        end_time: &str,
        location: Option<&str>,
    ) -> Result<Outcome> {
        let mut state = self.ctx.session(user_id).await?;
        let calendar = self.ctx.calendar(&state)?;

        let (Some(start), Some(end)) = (parse_datetime(start_time), parse_datetime(end_time)) else {
            return Ok(Outcome::error(INVALID_DATETIME));
        };

        let timezone = match calendar.timezone().await {
            Ok(tz) => tz,
            Err(e) => {
                debug!(error = %e, "calendar timezone unavailable, using default");
                self.ctx.calendar_config().default_timezone.clone()
            },
        };

        let body = EventBody {
            summary: summary.to_string(),
            location: location.map(String::from),
            start: EventDateTime::timed(start, timezone.clone()),
            end: EventDateTime::timed(end, timezone),
            ..EventBody::default()
        };
        let created = calendar.insert(&body).await?;
        info!(event_id = %created.id, summary, "event created");

        state.user_events.register_created(summary, created.id.clone());
        self.ctx.save_registry(user_id, &state).await?;

        Ok(Outcome::success("Event created successfully").with("event_id", created.id))
    }
}

#[async_trait]
impl AgentTool for CreateEventTool {
    fn name(&self) -> &str {
        "create_event"
    }

    fn description(&self) -> &str {
        "Create a new calendar event and remember it as created by the assistant."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["summary", "start_time", "end_time"],
            "properties": {
                "summary": { "type": "string", "description": "Event title" },
                "start_time": {
                    "type": "string",
                    "description": "Start time, e.g. \"2025-06-18 14:00\""
                },
                "end_time": {
                    "type": "string",
                    "description": "End time, e.g. \"2025-06-18 15:00\""
                },
                "location": { "type": "string", "description": "Optional location" }
            }
        })
    }

    async fn execute(&self, params: Value) -> AnyResult<Value> {
        let user_id = session_key(&params)?;
        let summary = required_str(&params, "summary")?;
        let start_time = required_str(&params, "start_time")?;
        let end_time = required_str(&params, "end_time")?;
        let location = optional_str(&params, "location");

        let outcome = self
            .create(user_id, summary, start_time, end_time, location)
            .await
            .unwrap_or_else(|e| e.into_outcome("Error creating event"));
        Ok(outcome.into_value())
    }
}

pub struct ListEventsTool {
    ctx: Arc<ToolContext>,
}

impl ListEventsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn list(&self, user_id: &str, start_date: Option<&str>, days: i64) -> Result<Outcome> {
        let state = self.ctx.session(user_id).await?;
        let calendar = self.ctx.calendar(&state)?;

        let start = match start_date {
            None => Utc::now(),
            Some(raw) => match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
                Ok(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
                Err(_) => {
                    return Ok(Outcome::error(format!(
                        "Invalid date format: {raw}. Use YYYY-MM-DD format."
                    ))
                    .with("events", Vec::<EventRow>::new()));
                },
            },
        };
        let range = TimeRange::days_from(
            start,
            days.max(1),
            self.ctx.calendar_config().list_max_results,
        );

        let rows: Vec<EventRow> = calendar
            .list(&range)
            .await?
            .iter()
            .map(|e| EventRow::new(e, &state.user_events))
            .collect();
        debug!(user_id, count = rows.len(), "events listed");

        let message = if rows.is_empty() {
            "No upcoming events found.".to_string()
        } else {
            format!("Found {} event(s).", rows.len())
        };
        Ok(Outcome::success(message).with("events", rows))
    }
}

#[async_trait]
impl AgentTool for ListEventsTool {
    fn name(&self) -> &str {
        "list_events"
    }

    fn description(&self) -> &str {
        "List calendar events in a date range, each tagged with its event type."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start_date": {
                    "type": "string",
                    "description": "Start date as YYYY-MM-DD. Empty means now."
                },
                "days": {
                    "type": "integer",
                    "description": "Days to look ahead. 1 for today, 7 for a week."
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> AnyResult<Value> {
        let user_id = session_key(&params)?;
        let start_date = optional_str(&params, "start_date");
        let days = params.get("days").and_then(Value::as_i64).unwrap_or(1);

        let outcome = self
            .list(user_id, start_date, days)
            .await
            .unwrap_or_else(|e| {
                e.into_outcome("Error fetching events")
                    .with("events", Vec::<EventRow>::new())
            });
        Ok(outcome.into_value())
    }
}
