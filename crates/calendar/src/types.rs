//! Event resources as exchanged with the remote calendar.
//!
//! Field names follow the Google Calendar v3 JSON representation so bodies can
//! be sent and received without an intermediate mapping layer.

use {
    chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc},
    chrono_tz::Tz,
    serde::{Deserialize, Serialize},
};

/// Lifecycle state reported by the calendar for an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventStatus {
    #[default]
    Confirmed,
    Tentative,
    Cancelled,
}

/// Start or end of an event. Timed events carry `dateTime`, all-day events
/// carry `date`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    #[must_use]
    pub fn timed(date_time: NaiveDateTime, time_zone: impl Into<String>) -> Self {
        Self {
            date_time: Some(date_time.format("%Y-%m-%dT%H:%M:%S").to_string()),
            date: None,
            time_zone: Some(time_zone.into()),
        }
    }

    #[must_use]
    pub fn all_day(date: NaiveDate) -> Self {
        Self {
            date_time: None,
            date: Some(date.format("%Y-%m-%d").to_string()),
            time_zone: None,
        }
    }

    /// Calendar date as written in the event's own offset or zone.
    pub fn local_date(&self) -> Option<NaiveDate> {
        if let Some(dt) = &self.date_time {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(dt) {
                return Some(parsed.date_naive());
            }
            return parse_naive(dt).map(|n| n.date());
        }
        self.date
            .as_deref()
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
    }

    /// Absolute instant. Naive timestamps are placed in `time_zone`, or UTC
    /// when the zone is missing or unknown.
    pub fn to_utc(&self) -> Option<DateTime<Utc>> {
        if let Some(dt) = &self.date_time {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(dt) {
                return Some(parsed.with_timezone(&Utc));
            }
            let naive = parse_naive(dt)?;
            return Some(localize(naive, self.time_zone.as_deref()));
        }
        let date = self.local_date()?;
        Some(localize(date.and_hms_opt(0, 0, 0)?, self.time_zone.as_deref()))
    }

    /// Same wall-clock shape shifted by `days`.
    #[must_use]
    pub fn shifted(&self, days: i64) -> Self {
        let delta = chrono::Duration::days(days);
        let mut out = self.clone();
        if let Some(dt) = &self.date_time {
            out.date_time = Some(match DateTime::parse_from_rfc3339(dt) {
                Ok(parsed) => (parsed + delta).to_rfc3339(),
                Err(_) => match parse_naive(dt) {
                    Some(naive) => (naive + delta).format("%Y-%m-%dT%H:%M:%S").to_string(),
                    None => dt.clone(),
                },
            });
        }
        if let Some(date) = self.date.as_deref().and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()) {
            out.date = Some((date + delta).format("%Y-%m-%d").to_string());
        }
        out
    }
}

fn parse_naive(value: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M"))
        .ok()
}

fn localize(naive: NaiveDateTime, zone: Option<&str>) -> DateTime<Utc> {
    match zone.and_then(|z| z.parse::<Tz>().ok()) {
        Some(tz) => tz
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&naive)),
        None => Utc.from_utc_datetime(&naive),
    }
}

/// Human-readable rendering used in event listings.
///
/// Timed events render as `YYYY-MM-DD HH:MM AM/PM`, all-day events as
/// `YYYY-MM-DD (All day)`.
pub fn format_event_time(time: &EventDateTime) -> String {
    if let Some(dt) = &time.date_time {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(dt) {
            return parsed.format("%Y-%m-%d %I:%M %p").to_string();
        }
        if let Some(naive) = parse_naive(dt) {
            return naive.format("%Y-%m-%d %I:%M %p").to_string();
        }
        return dt.clone();
    }
    if let Some(date) = &time.date {
        return format!("{date} (All day)");
    }
    "Unknown time format".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Body sent on insert and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub start: EventDateTime,
    pub end: EventDateTime,
    /// RFC 5545 lines, e.g. `RRULE:FREQ=WEEKLY;UNTIL=20250615T050000Z`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
}

/// Event as returned by the calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    pub id: String,
    #[serde(default)]
    pub status: EventStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default)]
    pub start: EventDateTime,
    #[serde(default)]
    pub end: EventDateTime,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub recurrence: Vec<String>,
    /// Series this occurrence belongs to, for expanded recurring events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attendees: Vec<Attendee>,
}

impl CalendarEvent {
    pub fn is_cancelled(&self) -> bool {
        self.status == EventStatus::Cancelled
    }

    /// Build an update body that keeps every editable field of this event.
    #[must_use]
    pub fn to_body(&self) -> EventBody {
        EventBody {
            summary: self.summary.clone().unwrap_or_default(),
            description: self.description.clone(),
            location: self.location.clone(),
            start: self.start.clone(),
            end: self.end.clone(),
            recurrence: self.recurrence.clone(),
        }
    }
}

/// Window for `list`, half-open `[time_min, time_max)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub time_min: DateTime<Utc>,
    pub time_max: DateTime<Utc>,
    pub max_results: u32,
}

impl TimeRange {
    #[must_use]
    pub fn new(time_min: DateTime<Utc>, time_max: DateTime<Utc>, max_results: u32) -> Self {
        Self {
            time_min,
            time_max,
            max_results,
        }
    }

    /// `days` days starting at `start`.
    #[must_use]
    pub fn days_from(start: DateTime<Utc>, days: i64, max_results: u32) -> Self {
        Self::new(start, start + chrono::Duration::days(days), max_results)
    }

    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.time_min && instant < self.time_max
    }
}
