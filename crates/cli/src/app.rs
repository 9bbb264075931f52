//! Wiring: config → stores, calendar, planner, tools, chat runtime.

use std::{path::Path, sync::Arc, time::Duration};

use {
    anyhow::Context,
    async_trait::async_trait,
    cadence_calendar::{
        GoogleConnector, MemoryCalendar, MemoryConnector, SharedCalendarConnector,
    },
    cadence_chat::{ChatService, CommandRouter, FixtureRouter, SharedIntentRouter},
    cadence_config::CadenceConfig,
    cadence_planner::{
        Collaborators, DayEventGenerator, DayEventRequest, LlmClient, PlanOrchestrator,
        PlanResearcher, SummaryGenerator,
    },
    cadence_sessions::{
        MemoryStateStore, SessionStateStore, SessionStore, SharedStateStore, UserDirectory,
    },
    cadence_tools::{ToolContext, calendar_tools},
    tracing::{info, warn},
};

/// How the binary should be assembled.
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    /// In-process calendar and session state; nothing leaves the process.
    pub offline: bool,
    /// YAML intent fixtures for the router.
    pub intents: Option<std::path::PathBuf>,
}

pub struct App {
    pub chat: ChatService,
    pub directory: UserDirectory,
    pool: Option<sqlx::SqlitePool>,
}

impl App {
    pub async fn build(config: &CadenceConfig, options: &AppOptions) -> anyhow::Result<Self> {
        let pool = if options.offline {
            None
        } else {
            Some(open_pool(&config.sessions.resolved_database_url()).await?)
        };
        let store: SharedStateStore = match &pool {
            Some(pool) => Arc::new(SessionStateStore::new(pool.clone())),
            None => Arc::new(MemoryStateStore::new()),
        };

        let connector: SharedCalendarConnector = if options.offline {
            let calendar = Arc::new(MemoryCalendar::new(
                config.calendar.default_timezone.clone(),
            ));
            Arc::new(MemoryConnector::new(calendar))
        } else {
            Arc::new(GoogleConnector::new(
                config.calendar.base_url.clone(),
                config.calendar.calendar_id.clone(),
                Duration::from_secs(config.calendar.timeout_seconds),
            )?)
        };

        let collaborators = match LlmClient::from_config(&config.llm) {
            Ok(client) => Collaborators::from_shared(Arc::new(client)),
            Err(e) => {
                warn!(error = %e, "plan generation disabled");
                Collaborators::from_shared(Arc::new(Unconfigured))
            },
        };
        let planner = Arc::new(PlanOrchestrator::new(
            Arc::clone(&connector),
            collaborators,
            &config.planner,
        ));

        let sessions = SessionStore::new(Arc::clone(&store));
        let directory = UserDirectory::new(store);
        let ctx = Arc::new(ToolContext::new(
            sessions.clone(),
            Arc::clone(&connector),
            planner,
            config.calendar.clone(),
        ));
        let router = load_router(options.intents.as_deref())?;

        let chat = ChatService::new(
            sessions,
            directory.clone(),
            calendar_tools(ctx),
            router,
            connector,
            config.calendar.clone(),
        );
        info!(offline = options.offline, "cadence ready");

        Ok(Self {
            chat,
            directory,
            pool,
        })
    }

    pub async fn close(self) {
        if let Some(pool) = self.pool {
            pool.close().await;
        }
    }
}

/// Connect to SQLite and bring the schema up to date.
pub async fn open_pool(database_url: &str) -> anyhow::Result<sqlx::SqlitePool> {
    if let Some(path) = sqlite_file(database_url)
        && let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let pool = sqlx::SqlitePool::connect(database_url)
        .await
        .with_context(|| format!("failed to open {database_url}"))?;
    cadence_sessions::run_migrations(&pool)
        .await
        .context("sessions migrations failed")?;
    Ok(pool)
}

/// File path behind a `sqlite:` URL, if it names one.
pub fn sqlite_file(database_url: &str) -> Option<&Path> {
    let rest = database_url
        .strip_prefix("sqlite://")
        .or_else(|| database_url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path == ":memory:" {
        return None;
    }
    Some(Path::new(path))
}

fn load_router(intents: Option<&Path>) -> anyhow::Result<SharedIntentRouter> {
    let Some(path) = intents else {
        return Ok(Arc::new(CommandRouter));
    };
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let router = FixtureRouter::from_yaml(&raw)
        .with_context(|| format!("invalid intent fixtures in {}", path.display()))?;
    info!(path = %path.display(), fixtures = router.len(), "intent fixtures loaded");
    Ok(Arc::new(router))
}

/// Stand-in collaborators used when no LLM is configured.
struct Unconfigured;

fn unconfigured() -> cadence_planner::Error {
    cadence_planner::Error::collaborator("llm", "llm.api_key is not configured")
}

#[async_trait]
impl SummaryGenerator for Unconfigured {
    async fn summarize(&self, _: &str, _: &str) -> cadence_planner::Result<String> {
        Err(unconfigured())
    }
}

#[async_trait]
impl PlanResearcher for Unconfigured {
    async fn research_plan(
        &self,
        _: &str,
        _: &str,
        _: Option<&str>,
    ) -> cadence_planner::Result<String> {
        Err(unconfigured())
    }
}

#[async_trait]
impl DayEventGenerator for Unconfigured {
    async fn generate_day_event(&self, _: &DayEventRequest) -> cadence_planner::Result<String> {
        Err(unconfigured())
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, tempfile::TempDir};

    #[test]
    fn sqlite_file_strips_scheme_and_query() {
        assert_eq!(
            sqlite_file("sqlite:///tmp/c/cadence.db?mode=rwc"),
            Some(Path::new("/tmp/c/cadence.db"))
        );
        assert_eq!(
            sqlite_file("sqlite:cadence.db"),
            Some(Path::new("cadence.db"))
        );
        assert_eq!(sqlite_file("sqlite::memory:"), None);
        assert_eq!(sqlite_file("postgres://x"), None);
    }

    #[tokio::test]
    async fn open_pool_creates_missing_directories() {
        let temp = TempDir::new().unwrap();
        let db = temp.path().join("nested").join("cadence.db");
        let url = format!("sqlite://{}?mode=rwc", db.display());

        let pool = open_pool(&url).await.unwrap();
        let _: (i64,) = sqlx::query_as("SELECT count(*) FROM session_state")
            .fetch_one(&pool)
            .await
            .unwrap();
        pool.close().await;
        assert!(db.exists());
    }

    #[tokio::test]
    async fn offline_app_runs_a_turn() {
        let app = App::build(&CadenceConfig::default(), &AppOptions {
            offline: true,
            intents: None,
        })
        .await
        .unwrap();
        app.directory.set_access_token("u1", "tok").await.unwrap();
        app.chat.login("u1").await.unwrap();

        let turn = app
            .chat
            .turn(
                "u1",
                r#"/create_event {"summary": "Dentist", "start_time": "2025-07-01 09:00", "end_time": "2025-07-01 10:00"}"#,
            )
            .await
            .unwrap();
        assert_eq!(turn.reply, "Event created successfully");
        assert_eq!(turn.user_events.len(), 1);
    }

    #[tokio::test]
    async fn missing_llm_key_reports_plan_failure() {
        let app = App::build(&CadenceConfig::default(), &AppOptions {
            offline: true,
            intents: None,
        })
        .await
        .unwrap();
        app.directory.set_access_token("u1", "tok").await.unwrap();
        app.chat.login("u1").await.unwrap();
        app.chat
            .turn(
                "u1",
                r#"/create_event {"summary": "5K Run", "start_time": "2025-07-13 08:00", "end_time": "2025-07-13 09:00"}"#,
            )
            .await
            .unwrap();
        let parent = app.directory.user_events("u1").await.unwrap().records()[0]
            .parent_event_id
            .clone();

        let turn = app
            .chat
            .turn(
                "u1",
                &format!(
                    "/create_recurrent_events {{\"parent_event_id\": \"{parent}\", \"start_date\": \"2025-06-18\"}}"
                ),
            )
            .await
            .unwrap();
        assert!(!turn.results[0].is_success());
        assert!(turn.reply.contains("llm.api_key is not configured"), "{}", turn.reply);
    }

    #[tokio::test]
    async fn intent_fixtures_are_loaded_from_yaml() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("intents.yaml");
        std::fs::write(
            &path,
            "- pattern: what's next\n  calls:\n    - name: list_events\n      arguments: { days: 7 }\n",
        )
        .unwrap();
        assert!(load_router(Some(&path)).is_ok());

        std::fs::write(&path, "pattern: [").unwrap();
        assert!(load_router(Some(&path)).is_err());
        assert!(load_router(Some(&temp.path().join("missing.yaml"))).is_err());
    }
}
