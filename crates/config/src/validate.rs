//! Semantic checks on a loaded configuration.
//!
//! Parsing already guarantees the shape; this catches values that parse but
//! would fail at runtime (bad timezone names, empty model ids, ...).

use {chrono_tz::Tz, secrecy::ExposeSecret};

use crate::schema::CadenceConfig;

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "planner.timezone"
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    fn push(&mut self, severity: Severity, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            severity,
            path: path.to_string(),
            message: message.into(),
        });
    }
}

/// Validate a configuration.
#[must_use]
pub fn validate(config: &CadenceConfig) -> ValidationResult {
    let mut result = ValidationResult::default();

    for (path, tz) in [
        ("calendar.default_timezone", &config.calendar.default_timezone),
        (
            "calendar.reschedule_timezone",
            &config.calendar.reschedule_timezone,
        ),
        ("planner.timezone", &config.planner.timezone),
    ] {
        if tz.parse::<Tz>().is_err() {
            result.push(
                Severity::Error,
                path,
                format!("unknown IANA timezone '{tz}'"),
            );
        }
    }

    if config.calendar.calendar_id.trim().is_empty() {
        result.push(Severity::Error, "calendar.calendar_id", "must not be empty");
    }

    if config.calendar.list_max_results == 0 {
        result.push(
            Severity::Error,
            "calendar.list_max_results",
            "must be at least 1",
        );
    }

    if config.llm.model.trim().is_empty() {
        result.push(Severity::Error, "llm.model", "must not be empty");
    }

    match &config.llm.api_key {
        None => result.push(
            Severity::Warning,
            "llm.api_key",
            "not set; preparation plans cannot be generated",
        ),
        Some(key) if key.expose_secret().starts_with("${") => result.push(
            Severity::Warning,
            "llm.api_key",
            "looks like an unresolved environment placeholder",
        ),
        Some(_) => {},
    }

    if !is_until_time(&config.planner.until_time) {
        result.push(
            Severity::Error,
            "planner.until_time",
            "expected the form THHMMSSZ, e.g. T050000Z",
        );
    }

    result
}

fn is_until_time(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 8
        && bytes[0] == b'T'
        && bytes[7] == b'Z'
        && bytes[1..7].iter().all(u8::is_ascii_digit)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use {super::*, secrecy::Secret};

    #[test]
    fn default_config_only_warns_about_api_key() {
        let result = validate(&CadenceConfig::default());
        assert!(!result.has_errors());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].path, "llm.api_key");
    }

    #[test]
    fn bad_timezone_is_an_error() {
        let mut cfg = CadenceConfig::default();
        cfg.planner.timezone = "Mars/Olympus".into();
        cfg.llm.api_key = Some(Secret::new("sk".into()));
        let result = validate(&cfg);
        assert!(result.has_errors());
        assert_eq!(result.diagnostics[0].path, "planner.timezone");
    }

    #[test]
    fn until_time_shape() {
        assert!(is_until_time("T050000Z"));
        assert!(!is_until_time("050000Z"));
        assert!(!is_until_time("T05:00Z"));
    }

    #[test]
    fn unresolved_placeholder_warns() {
        let mut cfg = CadenceConfig::default();
        cfg.llm.api_key = Some(Secret::new("${OPENAI_API_KEY}".into()));
        let result = validate(&cfg);
        assert!(!result.has_errors());
        assert!(result.diagnostics[0].message.contains("placeholder"));
    }
}
