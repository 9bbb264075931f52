//! Remote calendar access.
//!
//! [`CalendarGateway`] is the narrow contract the registry and planner depend
//! on. [`GoogleCalendarClient`] talks to Google Calendar v3; [`MemoryCalendar`]
//! is an in-process stand-in used by tests and offline runs.

pub mod error;
pub mod gateway;
pub mod google;
pub mod memory;
pub mod types;

pub use {
    error::{Error, Result},
    gateway::{
        CalendarConnector, CalendarGateway, SharedCalendarConnector, SharedCalendarGateway,
    },
    google::{GoogleCalendarClient, GoogleConnector},
    memory::{MemoryCalendar, MemoryConnector},
    types::{
        Attendee, CalendarEvent, EventBody, EventDateTime, EventStatus, TimeRange,
        format_event_time,
    },
};
