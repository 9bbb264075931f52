//! Calendar operations exposed to the conversational router.
//!
//! Every tool reads the caller's session via the injected `_session_key`,
//! acts on the calendar, writes the updated registry back, and reports a
//! status-tagged [`cadence_common::Outcome`]. Only malformed parameters are
//! returned as `Err`.

pub mod classify;
pub mod context;
pub mod delete;
pub mod error;
pub mod events;
pub mod planning;
pub mod reschedule;
pub mod tool_registry;

use std::sync::Arc;

pub use {
    classify::CheckEventTypeTool,
    context::ToolContext,
    delete::DeleteEventTool,
    error::{Error, Result},
    events::{CreateEventTool, EventRow, ListEventsTool},
    planning::{AdjustPlanningTool, CreateRecurrentEventsTool},
    reschedule::{RescheduleEventTool, RescheduleRecurrentEventTool},
    tool_registry::{AgentTool, ToolRegistry},
};

/// Registry holding every calendar tool.
pub fn calendar_tools(ctx: Arc<ToolContext>) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(Box::new(CreateEventTool::new(Arc::clone(&ctx))));
    registry.register(Box::new(ListEventsTool::new(Arc::clone(&ctx))));
    registry.register(Box::new(CheckEventTypeTool::new(Arc::clone(&ctx))));
    registry.register(Box::new(DeleteEventTool::new(Arc::clone(&ctx))));
    registry.register(Box::new(RescheduleEventTool::new(Arc::clone(&ctx))));
    registry.register(Box::new(RescheduleRecurrentEventTool::new(Arc::clone(&ctx))));
    registry.register(Box::new(CreateRecurrentEventsTool::new(Arc::clone(&ctx))));
    registry.register(Box::new(AdjustPlanningTool::new(ctx)));
    registry
}
