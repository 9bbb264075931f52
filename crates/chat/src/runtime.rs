//! Per-user chat lifecycle.
//!
//! A turn runs to completion before its state is persisted: the router picks
//! tool calls, the tools mutate the registry, and the resulting registry is
//! reconciled against the calendar before being written to both the session
//! and the user directory.

use {
    cadence_calendar::{SharedCalendarConnector, SharedCalendarGateway, TimeRange},
    cadence_config::CalendarConfig,
    cadence_registry::EventRegistry,
    cadence_sessions::{Interaction, SessionState, SessionStore, UserDirectory},
    cadence_tools::{EventRow, ToolRegistry},
    chrono::Utc,
    serde::Serialize,
    serde_json::{Value, json},
    tracing::{debug, info, warn},
};

use crate::{
    error::{Error, Result},
    router::{RouteRequest, SharedIntentRouter},
};

/// Reply used when the router finds nothing to do.
pub const NO_ACTION_REPLY: &str = "I couldn't match that request to a calendar action.";

/// One executed tool call and what it returned.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolResult {
    pub name: String,
    pub output: Value,
}

impl ToolResult {
    pub fn is_success(&self) -> bool {
        self.output.get("status").and_then(Value::as_str) == Some("success")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TurnReport {
    pub reply: String,
    pub results: Vec<ToolResult>,
    /// Registry as persisted at the end of the turn.
    pub user_events: EventRegistry,
    /// False when no credential was available and the registry was kept as-is.
    pub reconciled: bool,
}

pub struct ChatService {
    sessions: SessionStore,
    directory: UserDirectory,
    tools: ToolRegistry,
    router: SharedIntentRouter,
    connector: SharedCalendarConnector,
    calendar: CalendarConfig,
}

impl ChatService {
    pub fn new(
        sessions: SessionStore,
        directory: UserDirectory,
        tools: ToolRegistry,
        router: SharedIntentRouter,
        connector: SharedCalendarConnector,
        calendar: CalendarConfig,
    ) -> Self {
        Self {
            sessions,
            directory,
            tools,
            router,
            connector,
            calendar,
        }
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// Start a session from what the user directory holds.
    pub async fn login(&self, user_id: &str) -> Result<SessionState> {
        let user_id = require_user(user_id)?;
        let state = SessionState::new(
            self.directory.user_events(user_id).await?,
            self.directory.profile_data(user_id).await?,
            self.directory.access_token(user_id).await?,
        );
        self.sessions.save(user_id, &state).await?;
        info!(
            user_id,
            events = state.user_events.len(),
            has_token = state.access_token.is_some(),
            "session started"
        );
        Ok(state)
    }

    pub async fn logout(&self, user_id: &str) -> Result<bool> {
        let user_id = require_user(user_id)?;
        let existed = self.sessions.clear(user_id).await?;
        info!(user_id, existed, "session ended");
        Ok(existed)
    }

    pub async fn session(&self, user_id: &str) -> Result<SessionState> {
        self.sessions
            .load(user_id)
            .await?
            .ok_or_else(|| Error::NotLoggedIn {
                user_id: user_id.to_string(),
            })
    }

    /// Handle one chat message.
    pub async fn turn(&self, user_id: &str, message: &str) -> Result<TurnReport> {
        let user_id = require_user(user_id)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(Error::EmptyMessage);
        }

        let mut state = self.session(user_id).await?;
        state.user_input = message.to_string();
        state.interaction_history.push(Interaction::user_query(message));
        self.sessions.save(user_id, &state).await?;

        let schemas = self.tools.list_schemas();
        let calls = self
            .router
            .route(&RouteRequest {
                message,
                session: &state,
                tools: &schemas,
            })
            .await?;
        debug!(user_id, calls = calls.len(), "message routed");

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let output = match self
                .tools
                .execute(&call.name, user_id, call.arguments)
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    warn!(user_id, tool = %call.name, error = %e, "tool call rejected");
                    json!({ "status": "error", "message": e.to_string() })
                },
            };
            results.push(ToolResult {
                name: call.name,
                output,
            });
        }

        // Tools wrote the registry back; pick up their changes.
        let mut state = self.session(user_id).await?;
        let reconciled = match self.calendar_for(&state) {
            Some(calendar) => {
                state.user_events = state.user_events.reconcile(calendar.as_ref()).await;
                true
            },
            None => false,
        };

        let reply = compose_reply(&results);
        state
            .interaction_history
            .push(Interaction::assistant_reply(reply.clone()));
        self.sessions.save(user_id, &state).await?;
        self.directory
            .save_user_events(user_id, &state.user_events)
            .await?;
        info!(
            user_id,
            tools = results.len(),
            events = state.user_events.len(),
            reconciled,
            "turn complete"
        );

        Ok(TurnReport {
            reply,
            results,
            user_events: state.user_events,
            reconciled,
        })
    }

    /// Events in the next `upcoming_days` days, tagged with their registry
    /// role. Works without an active session by falling back to the user
    /// directory.
    pub async fn upcoming_events(&self, user_id: &str) -> Result<Vec<EventRow>> {
        let user_id = require_user(user_id)?;
        let (registry, token) = match self.sessions.load(user_id).await? {
            Some(state) => (state.user_events, state.access_token),
            None => (
                self.directory.user_events(user_id).await?,
                self.directory.access_token(user_id).await?,
            ),
        };
        let token = token
            .filter(|t| !t.trim().is_empty())
            .ok_or(Error::MissingCredential)?;
        let calendar = self.connector.connect(&token)?;

        let range = TimeRange::days_from(
            Utc::now(),
            self.calendar.upcoming_days,
            self.calendar.upcoming_max_results,
        );
        let rows = calendar
            .list(&range)
            .await?
            .iter()
            .map(|e| EventRow::new(e, &registry))
            .collect();
        Ok(rows)
    }

    fn calendar_for(&self, state: &SessionState) -> Option<SharedCalendarGateway> {
        let token = state
            .access_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())?;
        match self.connector.connect(token) {
            Ok(calendar) => Some(calendar),
            Err(e) => {
                warn!(error = %e, "calendar unavailable, skipping reconciliation");
                None
            },
        }
    }
}

fn require_user(user_id: &str) -> Result<&str> {
    let user_id = user_id.trim();
    if user_id.is_empty() {
        return Err(Error::MissingUserId);
    }
    Ok(user_id)
}

fn compose_reply(results: &[ToolResult]) -> String {
    if results.is_empty() {
        return NO_ACTION_REPLY.to_string();
    }
    results
        .iter()
        .map(|r| {
            r.output
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("done")
                .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_joins_tool_messages() {
        let results = vec![
            ToolResult {
                name: "create_event".into(),
                output: json!({ "status": "success", "message": "Event created successfully" }),
            },
            ToolResult {
                name: "list_events".into(),
                output: json!({ "status": "error" }),
            },
        ];
        assert_eq!(compose_reply(&results), "Event created successfully\ndone");
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert_eq!(compose_reply(&[]), NO_ACTION_REPLY);
    }

    #[test]
    fn blank_user_is_rejected() {
        assert!(matches!(require_user("  "), Err(Error::MissingUserId)));
        assert_eq!(require_user(" u1 ").unwrap(), "u1");
    }
}
