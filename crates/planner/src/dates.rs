//! Date parsing and week anchoring.

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime, Weekday};

/// Input layouts accepted for a plan start date, tried in order.
const START_DATE_FORMATS: &[&str] = &[
    "%m-%d-%Y", "%Y-%m-%d", "%d-%m-%Y", "%Y/%m/%d", "%m/%d/%Y", "%d/%m/%Y",
];

/// Canonical start-date layout.
pub const CANONICAL_DATE_FORMAT: &str = "%m-%d-%Y";

/// Layouts accepted for event start/end times, tried in order.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d %I:%M %p",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y %I:%M %p",
    "%B %d, %Y %H:%M",
    "%B %d, %Y %I:%M %p",
];

/// Date-only layouts for event times, read as midnight.
const DATE_ONLY_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%B %d, %Y"];

/// Week template order.
pub const WEEK: [Weekday; 7] = [
    Weekday::Sun,
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
];

/// chrono's `%Y` also reads one to three digit years; only full years count.
fn full_year(date: &NaiveDate) -> bool {
    (1000..=9999).contains(&date.year())
}

/// Rewrite a date in any accepted layout as `MM-DD-YYYY`.
///
/// Strings matching no layout are returned unchanged.
pub fn normalize_date_string(value: &str) -> String {
    START_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok().filter(full_year))
        .map(|d| d.format(CANONICAL_DATE_FORMAT).to_string())
        .unwrap_or_else(|| value.to_string())
}

/// The Sunday on or before `date`.
pub fn anchor_sunday(date: NaiveDate) -> NaiveDate {
    // Monday=0..Sunday=6, so Sunday maps to 0 days back.
    let days_back = (date.weekday().num_days_from_monday() + 1) % 7;
    date - Days::new(u64::from(days_back))
}

/// Parse a user-supplied event time.
pub fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| {
            NaiveDateTime::parse_from_str(value, fmt)
                .ok()
                .filter(|dt| full_year(&dt.date()))
        })
        .or_else(|| {
            DATE_ONLY_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok().filter(full_year))
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Lowercase English weekday name.
pub fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}
