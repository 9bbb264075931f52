//! Chat runtime for the calendar assistant.
//!
//! [`ChatService`] owns the per-user lifecycle (login, turn, logout) and
//! delegates intent routing to an [`IntentRouter`].

pub mod error;
pub mod router;
pub mod runtime;

pub use {
    error::{Error, Result},
    router::{
        CommandRouter, FixtureRouter, IntentFixture, IntentRouter, RouteRequest,
        SharedIntentRouter, ToolCall,
    },
    runtime::{ChatService, NO_ACTION_REPLY, ToolResult, TurnReport},
};
