use std::sync::Arc;

use async_trait::async_trait;

use crate::{
    error::Result,
    types::{CalendarEvent, EventBody, TimeRange},
};

/// Operations the assistant needs from a remote calendar.
///
/// Every call may fail with [`crate::Error::NotFound`] or a transient error.
/// `delete` treats an already-removed event as success.
#[async_trait]
pub trait CalendarGateway: Send + Sync {
    async fn get(&self, event_id: &str) -> Result<CalendarEvent>;

    async fn insert(&self, body: &EventBody) -> Result<CalendarEvent>;

    async fn update(&self, event_id: &str, body: &EventBody) -> Result<CalendarEvent>;

    async fn delete(&self, event_id: &str) -> Result<()>;

    /// Occurrences of a recurring series, ordered by start, cancelled ones
    /// excluded.
    async fn list_instances(&self, series_id: &str) -> Result<Vec<CalendarEvent>>;

    /// Single events and expanded occurrences in `range`, ordered by start.
    async fn list(&self, range: &TimeRange) -> Result<Vec<CalendarEvent>>;

    /// IANA timezone configured on the calendar.
    async fn timezone(&self) -> Result<String>;
}

pub type SharedCalendarGateway = Arc<dyn CalendarGateway>;

/// Opens a gateway acting on behalf of one user's access token.
pub trait CalendarConnector: Send + Sync {
    fn connect(&self, access_token: &str) -> Result<SharedCalendarGateway>;
}

pub type SharedCalendarConnector = Arc<dyn CalendarConnector>;
