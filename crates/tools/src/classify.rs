use std::sync::Arc;

use {
    anyhow::Result as AnyResult,
    async_trait::async_trait,
    cadence_common::Outcome,
    cadence_registry::EventKind,
    serde_json::{Value, json},
};

use crate::{
    context::{ToolContext, required_str, session_key},
    error::Result,
    tool_registry::AgentTool,
};

pub struct CheckEventTypeTool {
    ctx: Arc<ToolContext>,
}

impl CheckEventTypeTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn check(&self, user_id: &str, event_id: &str) -> Result<Outcome> {
        let state = self.ctx.session(user_id).await?;
        if state.user_events.is_empty() {
            return Ok(Outcome::error("No user events found in memory."));
        }

        let found = state.user_events.classify(event_id);
        if found.kind == EventKind::Unknown {
            return Ok(Outcome::success(
                "Event not found in user events memory. Event was not created by this agent.",
            )
            .with("type", EventKind::SingleEvent));
        }

        let mut outcome = Outcome::success(format!("Event {event_id} is a {}.", found.kind))
            .with("type", found.kind)
            .with("alias", &found.alias);
        if let Some(parent_alias) = &found.parent_event_alias {
            outcome = outcome
                .with("parent_event_alias", parent_alias)
                .with("parent_event_id", &found.parent_event_id);
        }
        Ok(outcome)
    }
}

#[async_trait]
impl AgentTool for CheckEventTypeTool {
    fn name(&self) -> &str {
        "check_event_type"
    }

    fn description(&self) -> &str {
        "Tell whether an event is a single event, a parent event with a \
         preparation plan, or one occurrence of such a plan."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "required": ["event_id"],
            "properties": {
                "event_id": { "type": "string", "description": "Calendar event ID" }
            }
        })
    }

    async fn execute(&self, params: Value) -> AnyResult<Value> {
        let user_id = session_key(&params)?;
        let event_id = required_str(&params, "event_id")?;

        let outcome = self
            .check(user_id, event_id)
            .await
            .unwrap_or_else(|e| e.into_outcome("Error checking event type"));
        Ok(outcome.into_value())
    }
}
