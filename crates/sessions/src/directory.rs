//! Per-user data that outlives a chat session: the event registry, the
//! schedule profile, and the calendar access token.

use {cadence_registry::EventRegistry, tracing::debug};

use crate::{
    error::{Error, Result},
    state_store::SharedStateStore,
};

pub const USER_NAMESPACE: &str = "user";

const KEY_EVENTS: &str = "user_events";
const KEY_PROFILE: &str = "profile_data";
const KEY_TOKEN: &str = "access_token";

#[derive(Clone)]
pub struct UserDirectory {
    store: SharedStateStore,
}

impl UserDirectory {
    pub fn new(store: SharedStateStore) -> Self {
        Self { store }
    }

    pub async fn user_events(&self, user_id: &str) -> Result<EventRegistry> {
        match self.store.get(user_id, USER_NAMESPACE, KEY_EVENTS).await? {
            Some(raw) => serde_json::from_str(&raw).map_err(|e| Error::corrupt(KEY_EVENTS, e)),
            None => Ok(EventRegistry::new()),
        }
    }

    pub async fn save_user_events(&self, user_id: &str, registry: &EventRegistry) -> Result<()> {
        let raw = serde_json::to_string(registry)?;
        self.store
            .set(user_id, USER_NAMESPACE, KEY_EVENTS, &raw)
            .await?;
        debug!(user_id, events = registry.len(), "user events persisted");
        Ok(())
    }

    pub async fn profile_data(&self, user_id: &str) -> Result<Option<String>> {
        self.store.get(user_id, USER_NAMESPACE, KEY_PROFILE).await
    }

    pub async fn set_profile_data(&self, user_id: &str, profile: &str) -> Result<()> {
        self.store
            .set(user_id, USER_NAMESPACE, KEY_PROFILE, profile)
            .await
    }

    pub async fn access_token(&self, user_id: &str) -> Result<Option<String>> {
        self.store.get(user_id, USER_NAMESPACE, KEY_TOKEN).await
    }

    pub async fn set_access_token(&self, user_id: &str, token: &str) -> Result<()> {
        self.store
            .set(user_id, USER_NAMESPACE, KEY_TOKEN, token)
            .await
    }
}
