//! Key-value state scoped to `(owner, namespace, key)`.
//!
//! [`SessionStateStore`] persists to SQLite; [`MemoryStateStore`] keeps
//! everything in process for tests and throwaway runs.

use std::{
    collections::BTreeMap,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use {async_trait::async_trait, tokio::sync::RwLock};

use crate::error::Result;

/// Storage port for per-user state.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn get(&self, owner: &str, namespace: &str, key: &str) -> Result<Option<String>>;

    /// Insert or overwrite.
    async fn set(&self, owner: &str, namespace: &str, key: &str, value: &str) -> Result<()>;

    async fn delete(&self, owner: &str, namespace: &str, key: &str) -> Result<bool>;

    /// Delete every key in a namespace for one owner.
    async fn delete_all(&self, owner: &str, namespace: &str) -> Result<u64>;
}

pub type SharedStateStore = Arc<dyn StateStore>;

/// SQLite-backed state store.
pub struct SessionStateStore {
    pool: sqlx::SqlitePool,
}

fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}

impl SessionStateStore {
    pub fn new(pool: sqlx::SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StateStore for SessionStateStore {
    async fn get(&self, owner: &str, namespace: &str, key: &str) -> Result<Option<String>> {
        let row = sqlx::query_scalar::<_, String>(
            "SELECT value FROM session_state WHERE session_key = ? AND namespace = ? AND key = ?",
        )
        .bind(owner)
        .bind(namespace)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn set(&self, owner: &str, namespace: &str, key: &str, value: &str) -> Result<()> {
        sqlx::query(
            r#"INSERT INTO session_state (session_key, namespace, key, value, updated_at)
               VALUES (?, ?, ?, ?, ?)
               ON CONFLICT(session_key, namespace, key) DO UPDATE SET
                 value = excluded.value,
                 updated_at = excluded.updated_at"#,
        )
        .bind(owner)
        .bind(namespace)
        .bind(key)
        .bind(value)
        .bind(now_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, owner: &str, namespace: &str, key: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM session_state WHERE session_key = ? AND namespace = ? AND key = ?",
        )
        .bind(owner)
        .bind(namespace)
        .bind(key)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_all(&self, owner: &str, namespace: &str) -> Result<u64> {
        let result =
            sqlx::query("DELETE FROM session_state WHERE session_key = ? AND namespace = ?")
                .bind(owner)
                .bind(namespace)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }
}

type Scope = (String, String);

/// In-process state store.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: RwLock<BTreeMap<Scope, BTreeMap<String, String>>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn scope(owner: &str, namespace: &str) -> Scope {
    (owner.to_string(), namespace.to_string())
}

#[async_trait]
impl StateStore for MemoryStateStore {
    async fn get(&self, owner: &str, namespace: &str, key: &str) -> Result<Option<String>> {
        Ok(self
            .entries
            .read()
            .await
            .get(&scope(owner, namespace))
            .and_then(|m| m.get(key).cloned()))
    }

    async fn set(&self, owner: &str, namespace: &str, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .entry(scope(owner, namespace))
            .or_default()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn delete(&self, owner: &str, namespace: &str, key: &str) -> Result<bool> {
        Ok(self
            .entries
            .write()
            .await
            .get_mut(&scope(owner, namespace))
            .and_then(|m| m.remove(key))
            .is_some())
    }

    async fn delete_all(&self, owner: &str, namespace: &str) -> Result<u64> {
        Ok(self
            .entries
            .write()
            .await
            .remove(&scope(owner, namespace))
            .map_or(0, |m| m.len() as u64))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    async fn sqlite_store() -> SessionStateStore {
        let pool = sqlx::SqlitePool::connect("sqlite::memory:").await.unwrap();
        crate::run_migrations(&pool).await.unwrap();
        SessionStateStore::new(pool)
    }

    async fn exercise(store: &dyn StateStore) {
        assert!(store.get("u1", "session", "k").await.unwrap().is_none());

        store.set("u1", "session", "k", "v1").await.unwrap();
        store.set("u1", "session", "k", "v2").await.unwrap();
        store.set("u1", "user", "k", "kept").await.unwrap();
        store.set("u2", "session", "k", "other").await.unwrap();
        assert_eq!(
            store.get("u1", "session", "k").await.unwrap().as_deref(),
            Some("v2")
        );

        store.set("u1", "session", "k2", "x").await.unwrap();
        assert_eq!(store.delete_all("u1", "session").await.unwrap(), 2);
        assert!(store.get("u1", "session", "k").await.unwrap().is_none());
        assert_eq!(
            store.get("u1", "user", "k").await.unwrap().as_deref(),
            Some("kept")
        );
        assert_eq!(
            store.get("u2", "session", "k").await.unwrap().as_deref(),
            Some("other")
        );

        assert!(store.delete("u2", "session", "k").await.unwrap());
        assert!(!store.delete("u2", "session", "k").await.unwrap());
    }

    #[tokio::test]
    async fn sqlite_store_scopes_by_owner_and_namespace() {
        let store = sqlite_store().await;
        exercise(&store).await;
    }

    #[tokio::test]
    async fn memory_store_scopes_by_owner_and_namespace() {
        exercise(&MemoryStateStore::new()).await;
    }
}
