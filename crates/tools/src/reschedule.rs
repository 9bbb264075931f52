//! Moving events in time or space.
//!
//! Occurrences of a preparation plan go through
//! [`RescheduleRecurrentEventTool`], which refuses to create an overlap unless
//! told to. Parent and single events go through [`RescheduleEventTool`].

use std::sync::Arc;

use {
    anyhow::Result as AnyResult,
    async_trait::async_trait,
    cadence_calendar::{CalendarEvent, CalendarGateway, EventBody, EventDateTime, TimeRange},
    cadence_common::Outcome,
    cadence_planner::parse_datetime,
    cadence_registry::{EventKind, EventRegistry},
    chrono::Duration,
    serde_json::{Value, json},
    tracing::{debug, info},
};

use crate::{
    context::{ToolContext, optional_str, required_str, session_key},
    error::{Error, Result},
    events::EventRow,
    tool_registry::AgentTool,
};

pub const CONFLICT_OPTIONS: [&str; 2] = ["delete_conflicting_event", "adjust_planning"];

/// Requested edits. `None` keeps the current value.
#[derive(Debug, Clone, Copy, Default)]
struct Changes<'a> {
    start_time: Option<&'a str>,
    end_time: Option<&'a str>,
    location: Option<&'a str>,
}

impl<'a> Changes<'a> {
    fn from_params(params: &'a Value) -> Self {
        Self {
            start_time: optional_str(params, "start_time"),
            end_time: optional_str(params, "end_time"),
            location: optional_str(params, "location"),
        }
    }

    /// Build the update body, keeping the event's own timezone.
    ///
    /// A new start without a new end moves the whole event and keeps its
    /// length. The result must still end after it starts.
    fn apply(&self, event: &CalendarEvent, fallback_timezone: &str) -> Result<EventBody> {
        let timezone = event
            .start
            .time_zone
            .clone()
            .unwrap_or_else(|| fallback_timezone.to_string());
        let start = self
            .start_time
            .map(|raw| {
                parse_datetime(raw).ok_or_else(|| {
                    Error::invalid("Invalid start time format. Please use YYYY-MM-DD HH:MM format.")
                })
            })
            .transpose()?;
        let end = self
            .end_time
            .map(|raw| {
                parse_datetime(raw).ok_or_else(|| {
                    Error::invalid("Invalid end time format. Please use YYYY-MM-DD HH:MM format.")
                })
            })
            .transpose()?;
        let end = end.or_else(|| {
            let length = event.end.to_utc()? - event.start.to_utc()?;
            start.map(|start| start + length)
        });

        let mut body = event.to_body();
        if let Some(start) = start {
            body.start = EventDateTime::timed(start, timezone.clone());
        }
        if let Some(end) = end {
            body.end = EventDateTime::timed(end, timezone);
        }
        if let (Some(start), Some(end)) = (body.start.to_utc(), body.end.to_utc())
            && end <= start
        {
            return Err(Error::invalid("End time must be after start time."));
        }
        if let Some(location) = self.location {
            body.location = Some(location.to_string());
        }
        Ok(body)
    }
}

async fn fetch(calendar: &dyn CalendarGateway, event_id: &str) -> Result<CalendarEvent> {
    match calendar.get(event_id).await {
        Ok(event) => Ok(event),
        Err(e) if e.is_not_found() => Err(Error::invalid(format!(
            "Event with ID {event_id} not found in primary calendar."
        ))),
        Err(e) => Err(e.into()),
    }
}

/// Other events overlapping the body's time window.
async fn find_conflicts(
    calendar: &dyn CalendarGateway,
    event_id: &str,
    body: &EventBody,
    registry: &EventRegistry,
    max_results: u32,
) -> Result<Vec<EventRow>> {
    let (Some(start), Some(end)) = (body.start.to_utc(), body.end.to_utc()) else {
        return Ok(Vec::new());
    };
    // Listing matches on start time, so look back far enough to catch
    // events that began earlier and are still running.
    let range = TimeRange::new(start - Duration::days(1), end, max_results);
    let conflicts = calendar
        .list(&range)
        .await?
        .iter()
        .filter(|e| e.id != event_id)
        .filter(|e| {
            let starts_before_end = e.start.to_utc().is_some_and(|s| s < end);
            let ends_after_start = e.end.to_utc().is_some_and(|t| t > start);
            starts_before_end && ends_after_start
        })
        .map(|e| EventRow::new(e, registry))
        .collect();
    Ok(conflicts)
}

pub struct RescheduleEventTool {
    ctx: Arc<ToolContext>,
}

impl RescheduleEventTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn reschedule(
        &self,
        user_id: &str,
        event_id: &str,
        event_type: &str,
        changes: Changes<'_>,
    ) -> Result<Outcome> {
        let state = self.ctx.session(user_id).await?;
        let calendar = self.ctx.calendar(&state)?;
        let event = fetch(calendar.as_ref(), event_id).await?;

        let kind: EventKind = event_type
            .parse()
            .map_err(|e: cadence_registry::InvalidEventKind| Error::invalid(e.to_string()))?;
        let message = match kind {
            EventKind::SingleEvent | EventKind::Unknown => "Single Event updated successfully",
            EventKind::ParentEvent => {
                "Parent Event updated successfully. Proceed using 'adjust_planning' tool to update recurrent events."
            },
            EventKind::RecurrentEvent => {
                return Ok(Outcome::error(format!(
                    "Event {event_id} is an occurrence of a preparation plan. Use 'reschedule_recurrent_event' instead."
                )));
            },
        };

        let body = changes.apply(&event, &self.ctx.calendar_config().reschedule_timezone)?;
        let updated = calendar.update(event_id, &body).await?;
        info!(event_id = %updated.id, kind = %kind, "event rescheduled");
        Ok(Outcome::success(message).with("event_id", updated.id))
    }
}

#[async_trait]
impl AgentTool for RescheduleEventTool {
    fn name(&self) -> &str {
        "reschedule_event"
    }

    fn description(&self) -> &str {
        "Change the time or location of a single or parent event. Empty fields \
         stay unchanged. After moving a parent event, call adjust_planning."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["event_id", "event_type"],
            "properties": {
                "event_id": { "type": "string" },
                "start_time": { "type": "string", "description": "New start, e.g. \"2025-06-18 14:00\"" },
                "end_time": { "type": "string", "description": "New end, e.g. \"2025-06-18 15:00\"" },
                "location": { "type": "string" },
                "event_type": {
                    "type": "string",
                    "enum": ["single_event", "parent_event"]
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> AnyResult<Value> {
        let user_id = session_key(&params)?;
        let event_id = required_str(&params, "event_id")?;
        let event_type = required_str(&params, "event_type")?;
        let changes = Changes::from_params(&params);

        let outcome = self
            .reschedule(user_id, event_id, event_type, changes)
            .await
            .unwrap_or_else(|e| e.into_outcome("Error updating event"));
        Ok(outcome.into_value())
    }
}

pub struct RescheduleRecurrentEventTool {
    ctx: Arc<ToolContext>,
}

impl RescheduleRecurrentEventTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn reschedule(
        &self,
        user_id: &str,
        event_id: &str,
        changes: Changes<'_>,
        ignore_conflicts: bool,
    ) -> Result<Outcome> {
        let state = self.ctx.session(user_id).await?;
        let calendar = self.ctx.calendar(&state)?;
        let event = fetch(calendar.as_ref(), event_id).await?;
        let config = self.ctx.calendar_config();

        let body = changes.apply(&event, &config.reschedule_timezone)?;

        if !ignore_conflicts {
            let conflicts = find_conflicts(
                calendar.as_ref(),
                event_id,
                &body,
                &state.user_events,
                config.list_max_results,
            )
            .await?;
            if !conflicts.is_empty() {
                debug!(event_id, conflicts = conflicts.len(), "reschedule blocked by overlap");
                return Ok(Outcome::error(format!(
                    "The new time overlaps with {} other event(s). Ask the user whether to \
                     delete the conflicting event or adjust the whole plan.",
                    conflicts.len()
                ))
                .with("conflicts", conflicts)
                .with("options", CONFLICT_OPTIONS));
            }
        }

        let updated = calendar.update(event_id, &body).await?;
        info!(event_id = %updated.id, "occurrence rescheduled");
        Ok(Outcome::success("Event updated successfully").with("event_id", updated.id))
    }
}

#[async_trait]
impl AgentTool for RescheduleRecurrentEventTool {
    fn name(&self) -> &str {
        "reschedule_recurrent_event"
    }

    fn description(&self) -> &str {
        "Move one occurrence of a preparation plan. Fails with the overlapping \
         events listed when the new time collides with another event, unless \
         ignore_conflicts is set."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["event_id"],
            "properties": {
                "event_id": { "type": "string" },
                "start_time": { "type": "string" },
                "end_time": { "type": "string" },
                "location": { "type": "string" },
                "ignore_conflicts": { "type": "boolean", "default": false }
            }
        })
    }

    async fn execute(&self, params: Value) -> AnyResult<Value> {
        let user_id = session_key(&params)?;
        let event_id = required_str(&params, "event_id")?;
        let changes = Changes::from_params(&params);
        let ignore_conflicts = params
            .get("ignore_conflicts")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let outcome = self
            .reschedule(user_id, event_id, changes, ignore_conflicts)
            .await
            .unwrap_or_else(|e| e.into_outcome("Error updating event"));
        Ok(outcome.into_value())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::context::testing::Fixture,
        cadence_registry::EventRecord,
        chrono::NaiveDateTime,
    };

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    async fn seed(fx: &Fixture, id: &str, start: &str, end: &str) {
        fx.calendar
            .put(CalendarEvent {
                id: id.into(),
                summary: Some(id.into()),
                start: EventDateTime::timed(at(start), "America/Mexico_City"),
                end: EventDateTime::timed(at(end), "America/Mexico_City"),
                ..CalendarEvent::default()
            })
            .await;
    }

    fn registry() -> EventRegistry {
        EventRegistry::from(vec![
            EventRecord {
                alias: "5K Run".into(),
                parent_event_id: "p1".into(),
                instances: vec!["i1".into()],
            },
            EventRecord::new("Dentist", "s1"),
        ])
    }

    #[tokio::test]
    async fn single_event_keeps_timezone_and_untouched_fields() {
        let fx = Fixture::logged_in("u1", registry()).await;
        seed(&fx, "s1", "2025-07-01 09:00", "2025-07-01 10:00").await;

        let out = RescheduleEventTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "event_id": "s1",
                "start_time": "2025-07-02 09:00",
                "end_time": "",
                "location": "Clinic",
                "event_type": "single_event"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "success");
        assert_eq!(out["message"], "Single Event updated successfully");

        let event = fx.calendar.get("s1").await.unwrap();
        assert_eq!(event.start.date_time.as_deref(), Some("2025-07-02T09:00:00"));
        assert_eq!(event.start.time_zone.as_deref(), Some("America/Mexico_City"));
        assert_eq!(event.end.date_time.as_deref(), Some("2025-07-02T10:00:00"));
        assert_eq!(event.location.as_deref(), Some("Clinic"));
    }

    #[tokio::test]
    async fn new_end_must_follow_start() {
        let fx = Fixture::logged_in("u1", registry()).await;
        seed(&fx, "s1", "2025-07-01 09:00", "2025-07-01 10:30").await;
        let tool = RescheduleEventTool::new(Arc::clone(&fx.ctx));

        let out = tool
            .execute(json!({
                "_session_key": "u1",
                "event_id": "s1",
                "end_time": "2025-07-01 08:00",
                "event_type": "single_event"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "error");
        assert_eq!(out["message"], "End time must be after start time.");
        let event = fx.calendar.get("s1").await.unwrap();
        assert_eq!(event.end.date_time.as_deref(), Some("2025-07-01T10:30:00"));

        let out = tool
            .execute(json!({
                "_session_key": "u1",
                "event_id": "s1",
                "start_time": "2025-07-01 16:00",
                "event_type": "single_event"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "success");
        let event = fx.calendar.get("s1").await.unwrap();
        assert_eq!(event.start.date_time.as_deref(), Some("2025-07-01T16:00:00"));
        assert_eq!(event.end.date_time.as_deref(), Some("2025-07-01T17:30:00"));
    }

    #[tokio::test]
    async fn parent_event_points_to_adjust_planning() {
        let fx = Fixture::logged_in("u1", registry()).await;
        seed(&fx, "p1", "2025-07-13 08:00", "2025-07-13 09:00").await;

        let out = RescheduleEventTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "event_id": "p1",
                "start_time": "2025-07-20 08:00",
                "event_type": "parent_event"
            }))
            .await
            .unwrap();
        assert!(
            out["message"]
                .as_str()
                .unwrap()
                .contains("'adjust_planning'")
        );
    }

    #[tokio::test]
    async fn missing_event_names_the_id() {
        let fx = Fixture::logged_in("u1", registry()).await;
        let out = RescheduleEventTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "event_id": "ghost",
                "event_type": "single_event"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "error");
        assert_eq!(
            out["message"],
            "Event with ID ghost not found in primary calendar."
        );
    }

    #[tokio::test]
    async fn bad_start_time_is_rejected() {
        let fx = Fixture::logged_in("u1", registry()).await;
        seed(&fx, "i1", "2025-07-01 07:00", "2025-07-01 08:00").await;

        let out = RescheduleRecurrentEventTool::new(Arc::clone(&fx.ctx))
            .execute(json!({ "_session_key": "u1", "event_id": "i1", "start_time": "noonish" }))
            .await
            .unwrap();
        assert_eq!(
            out["message"],
            "Invalid start time format. Please use YYYY-MM-DD HH:MM format."
        );
    }

    #[tokio::test]
    async fn overlap_blocks_occurrence_move() {
        let fx = Fixture::logged_in("u1", registry()).await;
        seed(&fx, "i1", "2025-07-01 07:00", "2025-07-01 08:00").await;
        seed(&fx, "s1", "2025-07-02 08:30", "2025-07-02 09:30").await;
        let tool = RescheduleRecurrentEventTool::new(Arc::clone(&fx.ctx));
        let params = json!({
            "_session_key": "u1",
            "event_id": "i1",
            "start_time": "2025-07-02 08:00",
            "end_time": "2025-07-02 09:00"
        });

        let out = tool.execute(params.clone()).await.unwrap();
        assert_eq!(out["status"], "error");
        assert_eq!(out["conflicts"][0]["id"], "s1");
        assert_eq!(out["conflicts"][0]["event_type"], "single_event");
        assert_eq!(out["options"], json!(CONFLICT_OPTIONS));
        assert_eq!(
            fx.calendar.get("i1").await.unwrap().start.date_time.as_deref(),
            Some("2025-07-01T07:00:00")
        );

        let mut forced = params;
        forced["ignore_conflicts"] = json!(true);
        let out = tool.execute(forced).await.unwrap();
        assert_eq!(out["status"], "success");
        assert_eq!(
            fx.calendar.get("i1").await.unwrap().start.date_time.as_deref(),
            Some("2025-07-02T08:00:00")
        );
    }

    #[tokio::test]
    async fn adjacent_events_do_not_conflict() {
        let fx = Fixture::logged_in("u1", registry()).await;
        seed(&fx, "i1", "2025-07-01 07:00", "2025-07-01 08:00").await;
        seed(&fx, "s1", "2025-07-02 09:00", "2025-07-02 10:00").await;

        let out = RescheduleRecurrentEventTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "event_id": "i1",
                "start_time": "2025-07-02 08:00",
                "end_time": "2025-07-02 09:00"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "success");
        assert_eq!(out["message"], "Event updated successfully");
    }

    #[tokio::test]
    async fn occurrence_is_redirected_from_generic_reschedule() {
        let fx = Fixture::logged_in("u1", registry()).await;
        seed(&fx, "i1", "2025-07-01 07:00", "2025-07-01 08:00").await;

        let out = RescheduleEventTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "event_id": "i1",
                "event_type": "recurrent_event"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "error");
        assert!(
            out["message"]
                .as_str()
                .unwrap()
                .contains("reschedule_recurrent_event")
        );
    }
}
