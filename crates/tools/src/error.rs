use {cadence_common::Outcome, thiserror::Error};

#[derive(Debug, Error)]
pub enum Error {
    #[error("No active session for user {user_id}. Please log in first.")]
    NoSession { user_id: String },

    #[error("Access token is missing. Please authenticate first.")]
    MissingCredential,

    #[error("Failed to authenticate with Google Calendar. Please check credentials.")]
    Unauthorized,

    /// User-facing validation failure, reported verbatim.
    #[error("{message}")]
    Invalid { message: String },

    #[error(transparent)]
    Calendar(#[from] cadence_calendar::Error),

    #[error(transparent)]
    Planner(#[from] cadence_planner::Error),

    #[error(transparent)]
    Sessions(#[from] cadence_sessions::Error),
}

impl Error {
    #[must_use]
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            message: message.into(),
        }
    }

    /// Render as an error outcome.
    ///
    /// Session, credential and validation problems keep their own message.
    /// Anything else is prefixed with `context`.
    #[must_use]
    pub fn into_outcome(self, context: &str) -> Outcome {
        match self {
            Self::NoSession { .. }
            | Self::MissingCredential
            | Self::Unauthorized
            | Self::Invalid { .. }
            | Self::Planner(
                cadence_planner::Error::MissingCredential | cadence_planner::Error::InvalidDate { .. },
            )
            | Self::Calendar(cadence_calendar::Error::Unauthorized { .. }) => {
                Outcome::error(self.to_string())
            },
            other => Outcome::error(format!("{context}: {other}")),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_errors_are_not_prefixed() {
        let outcome = Error::MissingCredential.into_outcome("Error creating event");
        assert_eq!(
            outcome.message,
            "Access token is missing. Please authenticate first."
        );
    }

    #[test]
    fn other_errors_carry_context() {
        let outcome = Error::Calendar(cadence_calendar::Error::Transient {
            status: 503,
            message: "backend unavailable".into(),
        })
        .into_outcome("Error deleting event");
        assert!(!outcome.is_success());
        assert!(outcome.message.starts_with("Error deleting event: "));
    }
}
