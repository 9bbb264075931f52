//! Generating and regenerating preparation plans for a parent event.

use std::sync::Arc;

use {
    anyhow::Result as AnyResult,
    async_trait::async_trait,
    cadence_common::Outcome,
    cadence_planner::{PlanOutcome, PlanRequest},
    cadence_registry::{EventKind, delete_best_effort},
    cadence_sessions::SessionState,
    serde_json::{Value, json},
    tracing::{info, warn},
};

use crate::{
    context::{ToolContext, optional_str, required_str, session_key},
    error::{Error, Result},
    tool_registry::AgentTool,
};

const CREATE_CONTEXT: &str = "Error creating recurrent events";

fn plan_schema() -> Value {
    json!({
        "type": "object",
        "required": ["parent_event_id", "start_date"],
        "properties": {
            "parent_event_id": {
                "type": "string",
                "description": "ID of the event the plan prepares for"
            },
            "start_date": {
                "type": "string",
                "description": "First day of the plan, e.g. 06-18-2025 or 2025-06-18"
            },
            "user_requirements": {
                "type": "string",
                "description": "Extra constraints from the user"
            }
        }
    })
}

/// Run the planner on the session's registry and persist the result.
async fn run_plan(
    ctx: &ToolContext,
    user_id: &str,
    state: &mut SessionState,
    parent_event_id: &str,
    start_date: &str,
    user_requirements: Option<&str>,
) -> Result<PlanOutcome> {
    let request = PlanRequest {
        parent_event_id: parent_event_id.to_string(),
        start_date: start_date.to_string(),
        user_requirements: user_requirements.map(String::from),
        user_input: state.user_input.clone(),
        profile: state.profile_data.clone(),
        access_token: state.access_token.clone(),
    };
    let plan = ctx
        .planner()
        .generate_plan(&mut state.user_events, &request)
        .await?;
    ctx.save_registry(user_id, state).await?;
    Ok(plan)
}

pub struct CreateRecurrentEventsTool {
    ctx: Arc<ToolContext>,
}

impl CreateRecurrentEventsTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn create(
        &self,
        user_id: &str,
        parent_event_id: &str,
        start_date: &str,
        user_requirements: Option<&str>,
    ) -> Result<Outcome> {
        let mut state = self.ctx.session(user_id).await?;
        let found = state.user_events.classify(parent_event_id);
        match (found.kind, found.parent_event_id) {
            (EventKind::SingleEvent, _) => {},
            (EventKind::ParentEvent, _) => {
                return Err(Error::invalid(format!(
                    "Event {parent_event_id} already has a preparation plan. Use adjust_planning to replace it."
                )));
            },
            (EventKind::RecurrentEvent, parent) => {
                return Err(Error::invalid(format!(
                    "Event {parent_event_id} is an occurrence of the plan for '{}' ({}). Use adjust_planning to change that plan.",
                    found.parent_event_alias.unwrap_or_default(),
                    parent.unwrap_or_default()
                )));
            },
            (EventKind::Unknown, _) => {
                return Err(Error::invalid(format!(
                    "Event {parent_event_id} is not tracked. Create it with create_event or pick one from list_events."
                )));
            },
        }

        let plan = run_plan(
            &self.ctx,
            user_id,
            &mut state,
            parent_event_id,
            start_date,
            user_requirements,
        )
        .await?;
        Ok(Outcome::success(format!(
            "Recurrent events '{}' created from {}",
            plan.topic, plan.start_date
        ))
        .with("instances", plan.instance_ids.len()))
    }
}

#[async_trait]
impl AgentTool for CreateRecurrentEventsTool {
    fn name(&self) -> &str {
        "create_recurrent_events"
    }

    fn description(&self) -> &str {
        "Research and schedule a weekly preparation plan leading up to a parent \
         event, starting on the given date. The event must be tracked and have \
         no plan yet; use adjust_planning to replace an existing plan."
    }

    fn parameters_schema(&self) -> Value {
        plan_schema()
    }

    async fn execute(&self, params: Value) -> AnyResult<Value> {
        let user_id = session_key(&params)?;
        let parent_event_id = required_str(&params, "parent_event_id")?;
        let start_date = required_str(&params, "start_date")?;
        let requirements = optional_str(&params, "user_requirements");

        let outcome = self
            .create(user_id, parent_event_id, start_date, requirements)
            .await
            .unwrap_or_else(|e| e.into_outcome(CREATE_CONTEXT));
        Ok(outcome.into_value())
    }
}

pub struct AdjustPlanningTool {
    ctx: Arc<ToolContext>,
}

impl AdjustPlanningTool {
    pub fn new(ctx: Arc<ToolContext>) -> Self {
        Self { ctx }
    }

    async fn adjust(
        &self,
        user_id: &str,
        event_id: &str,
        start_date: &str,
        user_requirements: Option<&str>,
    ) -> Result<Outcome> {
        let mut state = self.ctx.session(user_id).await?;
        let calendar = self.ctx.calendar(&state)?;

        let found = state.user_events.classify(event_id);
        let parent_event_id = match (found.kind, found.parent_event_id) {
            (EventKind::ParentEvent, _) => event_id.to_string(),
            (EventKind::RecurrentEvent, Some(parent)) => parent,
            _ => {
                return Err(Error::invalid(
                    "Invalid parent event ID. Ask the user to provide a valid parent event",
                ));
            },
        };

        let instances = state.user_events.clear_instances(&parent_event_id);
        let failed = delete_best_effort(calendar.as_ref(), &instances).await;
        if !failed.is_empty() {
            warn!(parent = %parent_event_id, failed = failed.len(), "old occurrences left behind");
        }
        self.ctx.save_registry(user_id, &state).await?;
        info!(parent = %parent_event_id, removed = instances.len(), "old plan cleared");

        match run_plan(
            &self.ctx,
            user_id,
            &mut state,
            &parent_event_id,
            start_date,
            user_requirements,
        )
        .await
        {
            Ok(plan) => Ok(Outcome::success(format!(
                "Planning adjusted successfully for parent event {parent_event_id}."
            ))
            .with("instances", plan.instance_ids.len())),
            Err(e) => Ok(Outcome::error(format!(
                "Failed to adjust planning: {}",
                e.into_outcome(CREATE_CONTEXT).message
            ))),
        }
    }
}

#[async_trait]
impl AgentTool for AdjustPlanningTool {
    fn name(&self) -> &str {
        "adjust_planning"
    }

    fn description(&self) -> &str {
        "Replace the preparation plan of a parent event: delete its current \
         occurrences and generate a new plan. Accepts the parent ID or the ID \
         of any of its occurrences."
    }

    fn parameters_schema(&self) -> Value {
        plan_schema()
    }

    async fn execute(&self, params: Value) -> AnyResult<Value> {
        let user_id = session_key(&params)?;
        let event_id = required_str(&params, "parent_event_id")?;
        let start_date = required_str(&params, "start_date")?;
        let requirements = optional_str(&params, "user_requirements");

        let outcome = self
            .adjust(user_id, event_id, start_date, requirements)
            .await
            .unwrap_or_else(|e| e.into_outcome("Error adjusting planning from parent event ID"));
        Ok(outcome.into_value())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {
        super::*,
        crate::context::testing::Fixture,
        cadence_calendar::{CalendarEvent, EventDateTime},
        cadence_registry::{EventRecord, EventRegistry},
        chrono::NaiveDateTime,
    };

    async fn seed(fx: &Fixture, id: &str, start: &str) {
        let at = NaiveDateTime::parse_from_str(start, "%Y-%m-%d %H:%M").unwrap();
        fx.calendar
            .put(CalendarEvent {
                id: id.into(),
                summary: Some("5K Run".into()),
                start: EventDateTime::timed(at, "America/Mexico_City"),
                end: EventDateTime::timed(at + chrono::Duration::hours(1), "America/Mexico_City"),
                ..CalendarEvent::default()
            })
            .await;
    }

    #[tokio::test]
    async fn create_attaches_occurrences_to_parent() {
        let fx = Fixture::logged_in("u1", EventRegistry::from(vec![EventRecord::new("5K Run", "p1")]))
            .await;
        seed(&fx, "p1", "2025-07-13 08:00").await;

        let out = CreateRecurrentEventsTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "parent_event_id": "p1",
                "start_date": "2025-06-18"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "success");
        assert_eq!(
            out["message"],
            "Recurrent events '5K Run prep' created from 06-18-2025"
        );
        assert_eq!(out["instances"], 25);

        let registry = fx.registry("u1").await;
        assert_eq!(registry.classify("p1").kind, EventKind::ParentEvent);
        assert_eq!(registry.record("p1").unwrap().instances.len(), 25);
        assert_eq!(fx.calendar.series_count().await, 7);
    }

    #[tokio::test]
    async fn create_reports_missing_parent() {
        let fx = Fixture::logged_in("u1", EventRegistry::from(vec![EventRecord::new("5K Run", "p1")]))
            .await;

        let out = CreateRecurrentEventsTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "parent_event_id": "p1",
                "start_date": "06-18-2025"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "error");
        assert!(
            out["message"]
                .as_str()
                .unwrap()
                .starts_with("Error creating recurrent events: ")
        );
        assert_eq!(fx.calendar.series_count().await, 0);
    }

    #[tokio::test]
    async fn create_rejects_untracked_event() {
        let fx = Fixture::logged_in("u1", EventRegistry::from(vec![EventRecord::new("Dentist", "s1")]))
            .await;
        seed(&fx, "ext1", "2025-07-20 08:00").await;

        let out = CreateRecurrentEventsTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "parent_event_id": "ext1",
                "start_date": "2025-06-18"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "error");
        assert!(out["message"].as_str().unwrap().contains("is not tracked"));
        assert_eq!(fx.calendar.series_count().await, 0);
        assert_eq!(fx.registry("u1").await.len(), 1);
    }

    #[tokio::test]
    async fn create_sends_planned_events_to_adjust() {
        let registry = EventRegistry::from(vec![EventRecord {
            alias: "5K Run".into(),
            parent_event_id: "p1".into(),
            instances: vec!["old1".into()],
        }]);
        let fx = Fixture::logged_in("u1", registry).await;
        seed(&fx, "p1", "2025-07-13 08:00").await;
        seed(&fx, "old1", "2025-06-01 07:00").await;
        let tool = CreateRecurrentEventsTool::new(Arc::clone(&fx.ctx));

        for (id, expected) in [
            ("p1", "already has a preparation plan"),
            ("old1", "occurrence of the plan for '5K Run' (p1)"),
        ] {
            let out = tool
                .execute(json!({
                    "_session_key": "u1",
                    "parent_event_id": id,
                    "start_date": "2025-06-18"
                }))
                .await
                .unwrap();
            assert_eq!(out["status"], "error");
            let message = out["message"].as_str().unwrap();
            assert!(message.contains(expected), "{message}");
            assert!(message.contains("adjust_planning"), "{message}");
        }
        assert_eq!(fx.calendar.series_count().await, 0);
        assert_eq!(fx.registry("u1").await.record("p1").unwrap().instances, ["old1"]);
    }

    #[tokio::test]
    async fn adjust_redirects_occurrence_to_parent() {
        let registry = EventRegistry::from(vec![EventRecord {
            alias: "5K Run".into(),
            parent_event_id: "p1".into(),
            instances: vec!["old1".into(), "old2".into()],
        }]);
        let fx = Fixture::logged_in("u1", registry).await;
        seed(&fx, "p1", "2025-07-13 08:00").await;
        seed(&fx, "old1", "2025-06-01 07:00").await;
        seed(&fx, "old2", "2025-06-08 07:00").await;

        let out = AdjustPlanningTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "parent_event_id": "old2",
                "start_date": "2025-06-15"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "success");
        assert_eq!(
            out["message"],
            "Planning adjusted successfully for parent event p1."
        );
        assert_eq!(fx.calendar.deleted_ids().await[..2], ["old1", "old2"]);

        let instances = fx.registry("u1").await.record("p1").unwrap().instances.clone();
        assert!(!instances.is_empty());
        assert!(!instances.iter().any(|i| i.starts_with("old")));
    }

    #[tokio::test]
    async fn adjust_rejects_single_event() {
        let fx = Fixture::logged_in("u1", EventRegistry::from(vec![EventRecord::new("Dentist", "s1")]))
            .await;

        let out = AdjustPlanningTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "parent_event_id": "s1",
                "start_date": "2025-06-15"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "error");
        assert_eq!(
            out["message"],
            "Invalid parent event ID. Ask the user to provide a valid parent event"
        );
        assert!(fx.calendar.deleted_ids().await.is_empty());
    }

    #[tokio::test]
    async fn adjust_failure_keeps_cleared_registry() {
        let registry = EventRegistry::from(vec![EventRecord {
            alias: "5K Run".into(),
            parent_event_id: "p1".into(),
            instances: vec!["old1".into()],
        }]);
        let fx = Fixture::logged_in("u1", registry).await;
        seed(&fx, "p1", "2025-07-13 08:00").await;

        let out = AdjustPlanningTool::new(Arc::clone(&fx.ctx))
            .execute(json!({
                "_session_key": "u1",
                "parent_event_id": "p1",
                "start_date": "someday"
            }))
            .await
            .unwrap();
        assert_eq!(out["status"], "error");
        assert!(
            out["message"]
                .as_str()
                .unwrap()
                .starts_with("Failed to adjust planning: ")
        );
        let registry = fx.registry("u1").await;
        assert_eq!(registry.classify("p1").kind, EventKind::SingleEvent);
    }
}
