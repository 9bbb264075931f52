use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("event {event_id} not found")]
    NotFound { event_id: String },

    #[error("calendar rejected the credential: {message}")]
    Unauthorized { message: String },

    #[error("calendar temporarily unavailable (HTTP {status}): {message}")]
    Transient { status: u16, message: String },

    #[error("calendar API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid event: {message}")]
    Invalid { message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    #[must_use]
    pub fn not_found(event_id: impl Into<String>) -> Self {
        Self::NotFound {
            event_id: event_id.into(),
        }
    }

    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Whether the event is gone from the remote calendar.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
