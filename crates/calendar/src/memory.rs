//! In-process calendar.
//!
//! Behaves like the remote service where the assistant depends on it: weekly
//! series expand into occurrence events with IDs `<series>_<YYYYMMDD>`,
//! deleting an occurrence leaves it behind with status `cancelled`, and
//! deleting something that is already gone is not an error.

use std::{
    collections::{BTreeMap, HashSet},
    sync::Arc,
};

use {
    async_trait::async_trait,
    chrono::{DateTime, NaiveDate, Utc},
    tokio::sync::RwLock,
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    gateway::{CalendarConnector, CalendarGateway, SharedCalendarGateway},
    types::{CalendarEvent, EventBody, EventStatus, TimeRange},
};

/// Cap for series without `UNTIL` or `COUNT`.
const MAX_OCCURRENCES: usize = 52;

#[derive(Default)]
struct State {
    events: BTreeMap<String, CalendarEvent>,
    failing: HashSet<String>,
    deleted: Vec<String>,
}

pub struct MemoryCalendar {
    state: RwLock<State>,
    timezone: String,
}

impl Default for MemoryCalendar {
    fn default() -> Self {
        Self::new("UTC")
    }
}

impl MemoryCalendar {
    pub fn new(timezone: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            timezone: timezone.into(),
        }
    }

    /// Store an event as-is, replacing any event with the same ID.
    pub async fn put(&self, event: CalendarEvent) {
        self.state
            .write()
            .await
            .events
            .insert(event.id.clone(), event);
    }

    /// Change the status of a stored event, as an edit made outside the
    /// assistant would.
    pub async fn set_status(&self, event_id: &str, status: EventStatus) {
        if let Some(event) = self.state.write().await.events.get_mut(event_id) {
            event.status = status;
        }
    }

    /// Make every later call touching `event_id` fail with a transient error.
    pub async fn fail_on(&self, event_id: &str) {
        self.state.write().await.failing.insert(event_id.to_string());
    }

    /// IDs passed to `delete`, in call order, including failed attempts.
    pub async fn deleted_ids(&self) -> Vec<String> {
        self.state.read().await.deleted.clone()
    }

    /// Current stored copy, cancelled events included.
    pub async fn snapshot(&self, event_id: &str) -> Option<CalendarEvent> {
        self.state.read().await.events.get(event_id).cloned()
    }

    /// Events inserted directly, excluding expanded occurrences.
    pub async fn series_count(&self) -> usize {
        self.state
            .read()
            .await
            .events
            .values()
            .filter(|e| e.recurring_event_id.is_none() && !e.recurrence.is_empty())
            .count()
    }
}

fn transient(event_id: &str) -> Error {
    Error::Transient {
        status: 503,
        message: format!("injected failure for {event_id}"),
    }
}

fn check_failing(state: &State, event_id: &str) -> Result<()> {
    if state.failing.contains(event_id) {
        return Err(transient(event_id));
    }
    Ok(())
}

/// Weekly rule bounds parsed from `RRULE:FREQ=WEEKLY;...` lines.
struct WeeklyRule {
    until: Option<DateTime<Utc>>,
    count: Option<usize>,
}

fn weekly_rule(recurrence: &[String]) -> Result<Option<WeeklyRule>> {
    let Some(line) = recurrence.iter().find(|l| l.starts_with("RRULE:")) else {
        return Ok(None);
    };
    let mut weekly = false;
    let mut rule = WeeklyRule {
        until: None,
        count: None,
    };
    for part in line.trim_start_matches("RRULE:").split(';') {
        match part.split_once('=') {
            Some(("FREQ", freq)) => weekly = freq == "WEEKLY",
            Some(("UNTIL", until)) => rule.until = Some(parse_until(until)?),
            Some(("COUNT", count)) => {
                rule.count = Some(
                    count
                        .parse()
                        .map_err(|_| Error::invalid(format!("bad COUNT in {line}")))?,
                );
            },
            _ => {},
        }
    }
    if !weekly {
        return Err(Error::invalid(format!("unsupported recurrence {line}")));
    }
    Ok(Some(rule))
}

fn parse_until(value: &str) -> Result<DateTime<Utc>> {
    let date = value
        .get(..8)
        .and_then(|d| NaiveDate::parse_from_str(d, "%Y%m%d").ok())
        .ok_or_else(|| Error::invalid(format!("bad UNTIL value {value}")))?;
    let time = value
        .get(9..15)
        .and_then(|t| chrono::NaiveTime::parse_from_str(t, "%H%M%S").ok())
        .unwrap_or(chrono::NaiveTime::MIN);
    Ok(date.and_time(time).and_utc())
}

fn expand(master: &CalendarEvent, rule: &WeeklyRule) -> Result<Vec<CalendarEvent>> {
    let first = master
        .start
        .to_utc()
        .ok_or_else(|| Error::invalid("recurring event needs a start time"))?;
    let limit = rule.count.unwrap_or(MAX_OCCURRENCES).min(MAX_OCCURRENCES);

    let mut out = Vec::new();
    for week in 0..limit {
        let offset = i64::try_from(week).unwrap_or(i64::MAX) * 7;
        if let Some(until) = rule.until
            && first + chrono::Duration::days(offset) > until
        {
            break;
        }
        let start = master.start.shifted(offset);
        let day = start
            .local_date()
            .ok_or_else(|| Error::invalid("recurring event needs a start date"))?;
        out.push(CalendarEvent {
            id: format!("{}_{}", master.id, day.format("%Y%m%d")),
            status: EventStatus::Confirmed,
            start,
            end: master.end.shifted(offset),
            recurrence: Vec::new(),
            recurring_event_id: Some(master.id.clone()),
            ..master.clone()
        });
    }
    Ok(out)
}

fn sort_key(event: &CalendarEvent) -> Option<DateTime<Utc>> {
    event.start.to_utc()
}

#[async_trait]
impl CalendarGateway for MemoryCalendar {
    async fn get(&self, event_id: &str) -> Result<CalendarEvent> {
        let state = self.state.read().await;
        check_failing(&state, event_id)?;
        state
            .events
            .get(event_id)
            .cloned()
            .ok_or_else(|| Error::not_found(event_id))
    }

    async fn insert(&self, body: &EventBody) -> Result<CalendarEvent> {
        if body.start.to_utc().is_none() {
            return Err(Error::invalid("start needs dateTime or date"));
        }
        let id = uuid::Uuid::new_v4().simple().to_string();
        let master = CalendarEvent {
            id: id.clone(),
            status: EventStatus::Confirmed,
            summary: Some(body.summary.clone()),
            description: body.description.clone(),
            location: body.location.clone(),
            start: body.start.clone(),
            end: body.end.clone(),
            recurrence: body.recurrence.clone(),
            html_link: Some(format!("memory://events/{id}")),
            ..CalendarEvent::default()
        };
        let occurrences = match weekly_rule(&body.recurrence)? {
            Some(rule) => expand(&master, &rule)?,
            None => Vec::new(),
        };

        let mut state = self.state.write().await;
        debug!(event_id = %id, occurrences = occurrences.len(), "memory event inserted");
        for occurrence in occurrences {
            state.events.insert(occurrence.id.clone(), occurrence);
        }
        state.events.insert(id, master.clone());
        Ok(master)
    }

    async fn update(&self, event_id: &str, body: &EventBody) -> Result<CalendarEvent> {
        let mut state = self.state.write().await;
        check_failing(&state, event_id)?;
        let event = state
            .events
            .get_mut(event_id)
            .ok_or_else(|| Error::not_found(event_id))?;
        event.summary = Some(body.summary.clone());
        event.description = body.description.clone();
        event.location = body.location.clone();
        event.start = body.start.clone();
        event.end = body.end.clone();
        if event.recurring_event_id.is_none() {
            event.recurrence = body.recurrence.clone();
        }
        Ok(event.clone())
    }

    async fn delete(&self, event_id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.deleted.push(event_id.to_string());
        check_failing(&state, event_id)?;

        let Some(event) = state.events.get_mut(event_id) else {
            return Ok(());
        };
        event.status = EventStatus::Cancelled;
        if !event.recurrence.is_empty() {
            for occurrence in state
                .events
                .values_mut()
                .filter(|e| e.recurring_event_id.as_deref() == Some(event_id))
            {
                occurrence.status = EventStatus::Cancelled;
            }
        }
        Ok(())
    }

    async fn list_instances(&self, series_id: &str) -> Result<Vec<CalendarEvent>> {
        let state = self.state.read().await;
        check_failing(&state, series_id)?;
        if !state.events.contains_key(series_id) {
            return Err(Error::not_found(series_id));
        }
        let mut items: Vec<CalendarEvent> = state
            .events
            .values()
            .filter(|e| e.recurring_event_id.as_deref() == Some(series_id) && !e.is_cancelled())
            .cloned()
            .collect();
        items.sort_by_key(sort_key);
        Ok(items)
    }

    async fn list(&self, range: &TimeRange) -> Result<Vec<CalendarEvent>> {
        let state = self.state.read().await;
        let mut items: Vec<CalendarEvent> = state
            .events
            .values()
            .filter(|e| !e.is_cancelled() && e.recurrence.is_empty())
            .filter(|e| sort_key(e).is_some_and(|start| range.contains(start)))
            .cloned()
            .collect();
        items.sort_by_key(sort_key);
        items.truncate(usize::try_from(range.max_results).unwrap_or(usize::MAX));
        Ok(items)
    }

    async fn timezone(&self) -> Result<String> {
        Ok(self.timezone.clone())
    }
}

/// Hands out the same shared calendar for every token.
pub struct MemoryConnector {
    calendar: Arc<MemoryCalendar>,
}

impl MemoryConnector {
    pub fn new(calendar: Arc<MemoryCalendar>) -> Self {
        Self { calendar }
    }
}

impl CalendarConnector for MemoryConnector {
    fn connect(&self, _access_token: &str) -> Result<SharedCalendarGateway> {
        Ok(Arc::clone(&self.calendar) as SharedCalendarGateway)
    }
}
