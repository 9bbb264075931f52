use {
    serde::{Deserialize, Serialize},
    std::{fmt, str::FromStr},
};

/// One user-created event, optionally owning a generated recurring series.
///
/// Serialized with the same field names the session state has always used,
/// so persisted registries load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event summary at creation time.
    pub alias: String,
    pub parent_event_id: String,
    /// Occurrence IDs of the preparation series. Empty means a single event.
    #[serde(default)]
    pub instances: Vec<String>,
}

impl EventRecord {
    pub fn new(alias: impl Into<String>, parent_event_id: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            parent_event_id: parent_event_id.into(),
            instances: Vec::new(),
        }
    }

    pub fn is_parent(&self) -> bool {
        !self.instances.is_empty()
    }
}

/// Role of an event ID with respect to the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SingleEvent,
    ParentEvent,
    RecurrentEvent,
    /// Not created through the assistant. Callers treat it as a single event.
    Unknown,
}

impl EventKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::SingleEvent => "single_event",
            Self::ParentEvent => "parent_event",
            Self::RecurrentEvent => "recurrent_event",
            Self::Unknown => "unknown",
        }
    }

    /// Collapse `Unknown` into `SingleEvent`.
    #[must_use]
    pub fn or_single(self) -> Self {
        match self {
            Self::Unknown => Self::SingleEvent,
            other => other,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidEventKind(pub String);

impl fmt::Display for InvalidEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid event type: {}. Must be one of 'single_event', 'parent_event', or 'recurrent_event'.",
            self.0
        )
    }
}

impl std::error::Error for InvalidEventKind {}

/// Parses the three kinds a caller may act on. `unknown` is not accepted.
impl FromStr for EventKind {
    type Err = InvalidEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "single_event" => Ok(Self::SingleEvent),
            "parent_event" => Ok(Self::ParentEvent),
            "recurrent_event" => Ok(Self::RecurrentEvent),
            other => Err(InvalidEventKind(other.to_string())),
        }
    }
}

/// Result of classifying an event ID.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub kind: EventKind,
    /// Alias of the owning record.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    /// For occurrences, the owning record's parent ID.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_event_id: Option<String>,
    /// For occurrences, the owning record's alias.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_event_alias: Option<String>,
}

impl Classification {
    pub(crate) fn unknown() -> Self {
        Self {
            kind: EventKind::Unknown,
            alias: None,
            parent_event_id: None,
            parent_event_alias: None,
        }
    }
}
