//! Mapping a chat message to tool calls.
//!
//! Understanding free text is outside this crate. A router only has to turn a
//! message into an ordered list of typed tool invocations;
//! [`CommandRouter`] reads them from an explicit `/tool {json}` syntax and
//! [`FixtureRouter`] from a table of known phrasings.

use std::sync::Arc;

use {
    async_trait::async_trait,
    cadence_sessions::SessionState,
    serde::{Deserialize, Serialize},
    serde_json::Value,
    tracing::debug,
};

use crate::error::{Context, Result};

/// One tool invocation chosen by a router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub name: String,
    #[serde(default = "empty_object")]
    pub arguments: Value,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

impl ToolCall {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

/// What a router sees for one turn.
pub struct RouteRequest<'a> {
    pub message: &'a str,
    pub session: &'a SessionState,
    /// `{name, description, parameters}` for each available tool.
    pub tools: &'a [Value],
}

#[async_trait]
pub trait IntentRouter: Send + Sync {
    async fn route(&self, request: &RouteRequest<'_>) -> Result<Vec<ToolCall>>;
}

pub type SharedIntentRouter = Arc<dyn IntentRouter>;

/// Routes messages of the form `/tool_name {"arg": "value"}`.
///
/// Several commands may be given on separate lines. Lines that are not
/// commands produce no calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct CommandRouter;

impl CommandRouter {
    fn parse_line(line: &str) -> Result<Option<ToolCall>> {
        let Some(command) = line.trim().strip_prefix('/') else {
            return Ok(None);
        };
        let (name, rest) = command
            .split_once(char::is_whitespace)
            .unwrap_or((command, ""));
        if name.is_empty() {
            return Ok(None);
        }
        let arguments = match rest.trim() {
            "" => empty_object(),
            raw => serde_json::from_str(raw).with_context(|| format!("bad arguments for /{name}"))?,
        };
        Ok(Some(ToolCall::new(name, arguments)))
    }
}

#[async_trait]
impl IntentRouter for CommandRouter {
    async fn route(&self, request: &RouteRequest<'_>) -> Result<Vec<ToolCall>> {
        let mut calls = Vec::new();
        for line in request.message.lines() {
            if let Some(call) = Self::parse_line(line)? {
                calls.push(call);
            }
        }
        Ok(calls)
    }
}

/// A known phrasing and the calls it maps to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentFixture {
    /// Matched case-insensitively as a substring of the message.
    pub pattern: String,
    pub calls: Vec<ToolCall>,
}

/// Table-driven router. The first matching fixture wins; unmatched messages
/// fall through to [`CommandRouter`].
#[derive(Debug, Clone, Default)]
pub struct FixtureRouter {
    fixtures: Vec<IntentFixture>,
}

impl FixtureRouter {
    pub fn new(fixtures: Vec<IntentFixture>) -> Self {
        Self { fixtures }
    }

    /// Load fixtures from a YAML list of `{pattern, calls}` entries.
    pub fn from_yaml(raw: &str) -> Result<Self> {
        Ok(Self::new(serde_yaml::from_str(raw)?))
    }

    pub fn len(&self) -> usize {
        self.fixtures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixtures.is_empty()
    }
}

#[async_trait]
impl IntentRouter for FixtureRouter {
    async fn route(&self, request: &RouteRequest<'_>) -> Result<Vec<ToolCall>> {
        let message = request.message.to_lowercase();
        if let Some(fixture) = self
            .fixtures
            .iter()
            .find(|f| message.contains(&f.pattern.to_lowercase()))
        {
            debug!(pattern = %fixture.pattern, calls = fixture.calls.len(), "fixture matched");
            return Ok(fixture.calls.clone());
        }
        CommandRouter.route(request).await
    }
}
