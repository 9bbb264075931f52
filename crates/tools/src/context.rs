//! Shared state handed to every calendar tool.

use std::sync::Arc;

use {
    cadence_calendar::{SharedCalendarConnector, SharedCalendarGateway},
    cadence_config::CalendarConfig,
    cadence_planner::PlanOrchestrator,
    cadence_sessions::{SessionState, SessionStore},
    serde_json::Value,
};

use crate::error::{Error, Result};

pub struct ToolContext {
    sessions: SessionStore,
    connector: SharedCalendarConnector,
    planner: Arc<PlanOrchestrator>,
    calendar: CalendarConfig,
}

impl ToolContext {
    pub fn new(
        sessions: SessionStore,
        connector: SharedCalendarConnector,
        planner: Arc<PlanOrchestrator>,
        calendar: CalendarConfig,
    ) -> Self {
        Self {
            sessions,
            connector,
            planner,
            calendar,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn planner(&self) -> &PlanOrchestrator {
        &self.planner
    }

    pub fn calendar_config(&self) -> &CalendarConfig {
        &self.calendar
    }

    /// Load the caller's session.
    pub async fn session(&self, user_id: &str) -> Result<SessionState> {
        self.sessions
            .load(user_id)
            .await?
            .ok_or_else(|| Error::NoSession {
                user_id: user_id.to_string(),
            })
    }

    /// Open the calendar with the session's access token.
    pub fn calendar(&self, state: &SessionState) -> Result<SharedCalendarGateway> {
        let token = state
            .access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::MissingCredential)?;
        self.connector.connect(token).map_err(|e| match e {
            cadence_calendar::Error::Unauthorized { .. } => Error::Unauthorized,
            other => Error::Calendar(other),
        })
    }

    /// Persist the registry after a tool changed it.
    pub async fn save_registry(&self, user_id: &str, state: &SessionState) -> Result<()> {
        self.sessions
            .save_user_events(user_id, &state.user_events)
            .await?;
        Ok(())
    }
}

pub(crate) fn session_key(params: &Value) -> anyhow::Result<&str> {
    params
        .get("_session_key")
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing session context"))
}

pub(crate) fn required_str<'a>(params: &'a Value, name: &str) -> anyhow::Result<&'a str> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .ok_or_else(|| anyhow::anyhow!("missing '{name}' parameter"))
}

/// Optional string parameter. Empty strings mean "not provided".
pub(crate) fn optional_str<'a>(params: &'a Value, name: &str) -> Option<&'a str> {
    params
        .get(name)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
}
