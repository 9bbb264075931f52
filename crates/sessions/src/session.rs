//! Typed view over a user's chat-session state.
//!
//! Each field lives under its own key in the `session` namespace, so the
//! state written at the end of a turn is exactly what the next turn reads.

use {
    cadence_registry::EventRegistry,
    chrono::{DateTime, Local},
    serde::{Deserialize, Serialize, de::DeserializeOwned},
    tracing::debug,
};

use crate::{
    error::{Error, Result},
    state_store::SharedStateStore,
};

pub const SESSION_NAMESPACE: &str = "session";

pub const KEY_USER_EVENTS: &str = "user_events";
pub const KEY_ACCESS_TOKEN: &str = "access_token";
pub const KEY_PROFILE_DATA: &str = "profile_data";
pub const KEY_INTERACTION_HISTORY: &str = "interaction_history";
pub const KEY_TODAY_DATE: &str = "today_date";
pub const KEY_USER_INPUT: &str = "user_input";

/// Fallback profile text when the user never stored one.
pub const NO_PROFILE: &str = "No general info provided";

/// Clock snapshot taken at login.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TodayDate {
    /// `YYYY-MM-DD HH:MM:SS`
    pub current_time: String,
    /// `MM-DD-YYYY`
    pub formatted_date: String,
}

impl TodayDate {
    pub fn at(now: DateTime<Local>) -> Self {
        Self {
            current_time: now.format("%Y-%m-%d %H:%M:%S").to_string(),
            formatted_date: now.format("%m-%d-%Y").to_string(),
        }
    }

    pub fn now() -> Self {
        Self::at(Local::now())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Interaction {
    pub action: String,
    pub text: String,
    pub time: String,
}

impl Interaction {
    pub fn user_query(text: impl Into<String>) -> Self {
        Self {
            action: "user_query".into(),
            text: text.into(),
            time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }

    pub fn assistant_reply(text: impl Into<String>) -> Self {
        Self {
            action: "assistant_reply".into(),
            text: text.into(),
            time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user_events: EventRegistry,
    pub access_token: Option<String>,
    pub profile_data: String,
    pub interaction_history: Vec<Interaction>,
    pub today_date: TodayDate,
    pub user_input: String,
}

impl SessionState {
    pub fn new(
        user_events: EventRegistry,
        profile_data: Option<String>,
        access_token: Option<String>,
    ) -> Self {
        Self {
            user_events,
            access_token,
            profile_data: profile_data.unwrap_or_else(|| NO_PROFILE.to_string()),
            interaction_history: Vec::new(),
            today_date: TodayDate::now(),
            user_input: String::new(),
        }
    }
}

/// Reads and writes [`SessionState`] for one user at a time.
#[derive(Clone)]
pub struct SessionStore {
    store: SharedStateStore,
}

impl SessionStore {
    pub fn new(store: SharedStateStore) -> Self {
        Self { store }
    }

    /// Load a user's session, or `None` when they are not logged in.
    pub async fn load(&self, user_id: &str) -> Result<Option<SessionState>> {
        let Some(today) = self.get_json::<TodayDate>(user_id, KEY_TODAY_DATE).await? else {
            return Ok(None);
        };
        Ok(Some(SessionState {
            user_events: self
                .get_json(user_id, KEY_USER_EVENTS)
                .await?
                .unwrap_or_default(),
            access_token: self.get_text(user_id, KEY_ACCESS_TOKEN).await?,
            profile_data: self
                .get_text(user_id, KEY_PROFILE_DATA)
                .await?
                .unwrap_or_else(|| NO_PROFILE.to_string()),
            interaction_history: self
                .get_json(user_id, KEY_INTERACTION_HISTORY)
                .await?
                .unwrap_or_default(),
            today_date: today,
            user_input: self
                .get_text(user_id, KEY_USER_INPUT)
                .await?
                .unwrap_or_default(),
        }))
    }

    pub async fn save(&self, user_id: &str, state: &SessionState) -> Result<()> {
        self.set_json(user_id, KEY_USER_EVENTS, &state.user_events)
            .await?;
        match &state.access_token {
            Some(token) => self.set_text(user_id, KEY_ACCESS_TOKEN, token).await?,
            None => {
                self.store
                    .delete(user_id, SESSION_NAMESPACE, KEY_ACCESS_TOKEN)
                    .await?;
            },
        }
        self.set_text(user_id, KEY_PROFILE_DATA, &state.profile_data)
            .await?;
        self.set_json(user_id, KEY_INTERACTION_HISTORY, &state.interaction_history)
            .await?;
        self.set_json(user_id, KEY_TODAY_DATE, &state.today_date)
            .await?;
        self.set_text(user_id, KEY_USER_INPUT, &state.user_input)
            .await?;
        debug!(user_id, events = state.user_events.len(), "session saved");
        Ok(())
    }

    /// Write only the registry, leaving the rest of the session as-is.
    pub async fn save_user_events(&self, user_id: &str, registry: &EventRegistry) -> Result<()> {
        self.set_json(user_id, KEY_USER_EVENTS, registry).await
    }

    /// Drop all session keys. Returns whether a session existed.
    pub async fn clear(&self, user_id: &str) -> Result<bool> {
        Ok(self.store.delete_all(user_id, SESSION_NAMESPACE).await? > 0)
    }

    async fn get_text(&self, user_id: &str, key: &str) -> Result<Option<String>> {
        self.store.get(user_id, SESSION_NAMESPACE, key).await
    }

    async fn set_text(&self, user_id: &str, key: &str, value: &str) -> Result<()> {
        self.store.set(user_id, SESSION_NAMESPACE, key, value).await
    }

    async fn get_json<T: DeserializeOwned>(&self, user_id: &str, key: &str) -> Result<Option<T>> {
        match self.get_text(user_id, key).await? {
            Some(raw) => serde_json::from_str(&raw)
                .map(Some)
                .map_err(|e| Error::corrupt(key, e)),
            None => Ok(None),
        }
    }

    async fn set_json<T: Serialize + ?Sized>(&self, user_id: &str, key: &str, value: &T) -> Result<()> {
        let raw = serde_json::to_string(value)?;
        self.set_text(user_id, key, &raw).await
    }
}
