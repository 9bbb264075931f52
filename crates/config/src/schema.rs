/// Config schema types (calendar, llm, planner, sessions).
use {
    secrecy::{ExposeSecret, Secret},
    serde::{Deserialize, Serialize},
};

pub const GOOGLE_CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    pub calendar: CalendarConfig,
    pub llm: LlmConfig,
    pub planner: PlannerConfig,
    pub sessions: SessionsConfig,
}

/// Remote calendar settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CalendarConfig {
    /// Calendar operated on. Defaults to "primary".
    pub calendar_id: String,
    /// Calendar API root. Overridable for tests and proxies.
    pub base_url: String,
    /// Timezone used for new events when the calendar settings can't be read.
    pub default_timezone: String,
    /// Timezone used when rescheduling an event that carries none.
    pub reschedule_timezone: String,
    /// Page size for `list_events`.
    pub list_max_results: u32,
    /// Look-ahead window for the upcoming-events view.
    pub upcoming_days: i64,
    pub upcoming_max_results: u32,
    /// HTTP request timeout in seconds.
    pub timeout_seconds: u64,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            calendar_id: "primary".into(),
            base_url: GOOGLE_CALENDAR_BASE_URL.into(),
            default_timezone: "America/New_York".into(),
            reschedule_timezone: "America/Mexico_City".into(),
            list_max_results: 100,
            upcoming_days: 30,
            upcoming_max_results: 10,
            timeout_seconds: 30,
        }
    }
}

/// OpenAI-compatible completion endpoint used by the planning collaborators.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    #[serde(
        default,
        serialize_with = "serialize_option_secret",
        skip_serializing_if = "Option::is_none"
    )]
    pub api_key: Option<Secret<String>>,
    pub timeout_seconds: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: OPENAI_BASE_URL.into(),
            model: "gpt-4.1".into(),
            api_key: None,
            timeout_seconds: 120,
        }
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// Preparation-plan generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Timezone written into generated event bodies.
    pub timezone: String,
    /// Time-of-day suffix appended to the `UNTIL` date of generated series.
    pub until_time: String,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            timezone: "America/Mexico_City".into(),
            until_time: "T050000Z".into(),
        }
    }
}

/// Session persistence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// SQLite URL. `None` means `<data_dir>/cadence.db`.
    pub database_url: Option<String>,
}

impl SessionsConfig {
    /// Resolve the database URL, falling back to the default data directory.
    #[must_use]
    pub fn resolved_database_url(&self) -> String {
        if let Some(url) = &self.database_url {
            return url.clone();
        }
        let path = crate::loader::data_dir().join("cadence.db");
        format!("sqlite://{}?mode=rwc", path.display())
    }
}

fn serialize_option_secret<S: serde::Serializer>(
    secret: &Option<Secret<String>>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match secret {
        Some(s) => serializer.serialize_some(s.expose_secret()),
        None => serializer.serialize_none(),
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_primary_calendar() {
        let cfg = CadenceConfig::default();
        assert_eq!(cfg.calendar.calendar_id, "primary");
        assert_eq!(cfg.calendar.list_max_results, 100);
        assert_eq!(cfg.planner.until_time, "T050000Z");
        assert_eq!(cfg.llm.model, "gpt-4.1");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let cfg: CadenceConfig = toml::from_str(
            r#"
            [calendar]
            default_timezone = "Europe/Madrid"

            [llm]
            api_key = "sk-test"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.calendar.default_timezone, "Europe/Madrid");
        assert_eq!(cfg.calendar.calendar_id, "primary");
        assert_eq!(cfg.llm.api_key.unwrap().expose_secret(), "sk-test");
    }

    #[test]
    fn debug_redacts_api_key() {
        let cfg = LlmConfig {
            api_key: Some(Secret::new("sk-very-secret".into())),
            ..Default::default()
        };
        let rendered = format!("{cfg:?}");
        assert!(!rendered.contains("sk-very-secret"));
        assert!(rendered.contains("[REDACTED]"));
    }

    #[test]
    fn explicit_database_url_wins() {
        let cfg = SessionsConfig {
            database_url: Some("sqlite::memory:".into()),
        };
        assert_eq!(cfg.resolved_database_url(), "sqlite::memory:");
    }
}
