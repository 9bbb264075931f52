use std::sync::Arc;

use {
    anyhow::Result as AnyResult,
    async_trait::async_trait,
    cadence_common::Outcome,
    cadence_registry::EventKind,
    serde_json::{Value, json},
    tracing::{info, warn},
};

use crate::{
    context::{ToolContext, required_str, session_key},
    error::{Error, Result},
    tool_registry::AgentTool,
};

pub struct DeleteEventTool {
    ctx: Arc<ToolContext>,
}

impl DeleteEventTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn delete(&self, user_id: &str, event_id: &str, event_type: &str) -> Result<Outcome> {
        let mut state = self.ctx.session(user_id).await?;
        let calendar = self.ctx.calendar(&state)?;
        let kind: EventKind = event_type
            .parse()
            .map_err(|e: cadence_registry::InvalidEventKind| Error::invalid(e.to_string()))?;

        let mut outcome = Outcome::success(format!("Event {event_id} has been deleted successfully"))
            .with("event_id", event_id);
        match kind {
            EventKind::SingleEvent => {
                calendar.delete(event_id).await?;
                state.user_events.remove_single(event_id);
            },
            EventKind::RecurrentEvent => {
                calendar.delete(event_id).await?;
                state.user_events.remove_instance(event_id);
            },
            EventKind::ParentEvent => {
                let removal = state
                    .user_events
                    .remove_parent(event_id, calendar.as_ref())
                    .await?;
                if !removal.failed_instances.is_empty() {
                    warn!(
                        event_id,
                        failed = removal.failed_instances.len(),
                        "some occurrences could not be deleted"
                    );
                    outcome = outcome.with("failed_instances", removal.failed_instances);
                }
            },
            EventKind::Unknown => {},
        }
        self.ctx.save_registry(user_id, &state).await?;
        info!(event_id, kind = %kind, "event deleted");
        Ok(outcome)
    }
}

#[async_trait]
impl AgentTool for DeleteEventTool {
    fn name(&self) -> &str {
        "delete_event"
    }

    fn description(&self) -> &str {
        "Delete an event. Deleting a parent event also deletes every occurrence \
         of its preparation plan. Check the event type first."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["event_id", "event_type"],
            "properties": {
                "event_id": { "type": "string", "description": "Calendar event ID" },
                "event_type": {
                    "type": "string",
                    "enum": ["single_event", "parent_event", "recurrent_event"],
                    "description": "Type reported by check_event_type"
                }
            }
        })
    }

    async fn execute(&self, params: Value) -> AnyResult<Value> {
        let user_id = session_key(&params)?;
        let event_id = required_str(&params, "event_id")?;
        let event_type = required_str(&params, "event_type")?;

        let outcome = self
            .delete(user_id, event_id, event_type)
            .await
            .unwrap_or_else(|e| e.into_outcome("Error deleting event"));
        Ok(outcome.into_value())
    }
}
