use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Access token is missing. Please authenticate first.")]
    MissingCredential,

    #[error("invalid start date '{value}', expected MM-DD-YYYY")]
    InvalidDate { value: String },

    #[error("parent event {event_id} not found in calendar")]
    ParentNotFound { event_id: String },

    #[error("event {event_id} is not a registered parent event")]
    NotRegistered { event_id: String },

    #[error("generated event body is malformed: {message}")]
    MalformedEventBody { message: String },

    #[error(transparent)]
    Calendar(#[from] cadence_calendar::Error),

    #[error("{context}: {message}")]
    Collaborator { context: String, message: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn collaborator(context: impl Into<String>, message: impl std::fmt::Display) -> Self {
        Self::Collaborator {
            context: context.into(),
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn malformed(message: impl std::fmt::Display) -> Self {
        Self::MalformedEventBody {
            message: message.to_string(),
        }
    }
}

impl cadence_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

cadence_common::impl_context!();
