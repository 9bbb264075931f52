//! Session state and user persistence.
//!
//! Both live in one `session_state` table keyed by `(owner, namespace, key)`:
//! the `session` namespace holds the live chat session and the `user`
//! namespace holds what is kept between logins.

pub mod directory;
pub mod error;
pub mod session;
pub mod state_store;

pub use {
    directory::UserDirectory,
    error::{Error, Result},
    session::{Interaction, SessionState, SessionStore, TodayDate},
    state_store::{MemoryStateStore, SessionStateStore, SharedStateStore, StateStore},
};

/// Run database migrations for the sessions crate.
///
/// Creates the `session_state` table. Call once at startup before building a
/// [`SessionStateStore`].
pub async fn run_migrations(pool: &sqlx::SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}
