use std::path::{Path, PathBuf};

use {cadence_config::CadenceConfig, clap::Subcommand};

use crate::app::{open_pool, sqlite_file};

#[derive(Subcommand)]
pub enum DbAction {
    /// Delete the session database file completely.
    Reset,
    /// Clear all stored state but keep the schema intact.
    Clear,
    /// Run all pending database migrations.
    Migrate,
}

pub async fn handle_db(action: DbAction, config: &CadenceConfig) -> anyhow::Result<()> {
    let url = config.sessions.resolved_database_url();
    match action {
        DbAction::Reset => {
            let Some(path) = sqlite_file(&url) else {
                anyhow::bail!("{url} is not a file database");
            };
            let deleted = reset_database(path)?;
            if deleted.is_empty() {
                println!("No database files found.");
            } else {
                for path in &deleted {
                    println!("Deleted: {}", path.display());
                }
                println!("Database files deleted. Run `cadence db migrate` to recreate them.");
            }
        },
        DbAction::Clear => {
            let pool = open_pool(&url).await?;
            let cleared = sqlx::query("DELETE FROM session_state")
                .execute(&pool)
                .await?
                .rows_affected();
            pool.close().await;
            println!("Cleared {cleared} stored value(s).");
        },
        DbAction::Migrate => {
            let pool = open_pool(&url).await?;
            pool.close().await;
            println!("All migrations complete.");
        },
    }
    Ok(())
}

/// Delete the database and the WAL/SHM files SQLite may have left next to it.
fn reset_database(db: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut deleted = Vec::new();
    for suffix in ["", "-wal", "-shm"] {
        let mut name = db.as_os_str().to_owned();
        name.push(suffix);
        let path = PathBuf::from(name);
        if path.exists() {
            std::fs::remove_file(&path)?;
            deleted.push(path);
        }
    }
    Ok(deleted)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tempfile::TempDir};

    #[test]
    fn reset_deletes_wal_and_shm() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("cadence.db");
        for name in ["cadence.db", "cadence.db-wal", "cadence.db-shm", "other.db"] {
            std::fs::write(temp.path().join(name), "test").unwrap();
        }

        let deleted = reset_database(&db).unwrap();
        assert_eq!(deleted.len(), 3);
        assert!(!db.exists());
        assert!(temp.path().join("other.db").exists());
        assert!(reset_database(&db).unwrap().is_empty());
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let temp = TempDir::new().unwrap();
        let url = format!("sqlite://{}?mode=rwc", temp.path().join("cadence.db").display());

        open_pool(&url).await.unwrap().close().await;
        let pool = open_pool(&url).await.unwrap();
        let _: (i64,) = sqlx::query_as("SELECT count(*) FROM session_state")
            .fetch_one(&pool)
            .await
            .unwrap();
        pool.close().await;
    }
}
