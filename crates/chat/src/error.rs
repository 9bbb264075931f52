use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("No user ID provided.")]
    MissingUserId,

    #[error("No message provided.")]
    EmptyMessage,

    #[error("user {user_id} is not logged in")]
    NotLoggedIn { user_id: String },

    #[error("Access token is missing. Please authenticate first.")]
    MissingCredential,

    #[error(transparent)]
    Sessions(#[from] cadence_sessions::Error),

    #[error(transparent)]
    Calendar(#[from] cadence_calendar::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error("{message}")]
    Message { message: String },
}

impl cadence_common::FromMessage for Error {
    fn from_message(message: String) -> Self {
        Self::Message { message }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

cadence_common::impl_context!();
