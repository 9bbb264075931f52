use std::path::Path;

use {
    anyhow::Result,
    cadence_config::{
        CadenceConfig, find_or_default_config_path,
        validate::{self, Severity},
    },
    clap::Subcommand,
};

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Validate the configuration and report errors/warnings.
    Check,
    /// Print the effective configuration as TOML (secrets redacted).
    Show,
    /// Print the path of the config file in use.
    Path,
}

pub fn handle_config(
    action: ConfigAction,
    explicit: Option<&Path>,
    config: &CadenceConfig,
) -> Result<()> {
    match action {
        ConfigAction::Check => {
            eprintln!("Checking {}\n", config_path(explicit).display());
            let report = render_diagnostics(config);
            eprintln!("{}", report.text);
            if report.errors > 0 {
                std::process::exit(1);
            }
            Ok(())
        },
        ConfigAction::Show => {
            println!("{}", toml::to_string_pretty(&redacted(config))?);
            Ok(())
        },
        ConfigAction::Path => {
            println!("{}", config_path(explicit).display());
            Ok(())
        },
    }
}

fn config_path(explicit: Option<&Path>) -> std::path::PathBuf {
    explicit
        .map(Path::to_path_buf)
        .unwrap_or_else(find_or_default_config_path)
}

fn redacted(config: &CadenceConfig) -> CadenceConfig {
    let mut config = config.clone();
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some(secrecy::Secret::new("***".to_string()));
    }
    config
}

/// ANSI color codes.
const RED: &str = "\x1b[31m";
const YELLOW: &str = "\x1b[33m";
const BOLD: &str = "\x1b[1m";
const RESET: &str = "\x1b[0m";

struct Report {
    text: String,
    errors: usize,
}

fn render_diagnostics(config: &CadenceConfig) -> Report {
    let result = validate::validate(config);
    let mut lines = Vec::new();
    for d in &result.diagnostics {
        let color = match d.severity {
            Severity::Error => RED,
            Severity::Warning => YELLOW,
        };
        lines.push(format!(
            "  {BOLD}{color}{}{RESET} {}: {}",
            d.severity, d.path, d.message
        ));
    }

    let count = |s: Severity| {
        result
            .diagnostics
            .iter()
            .filter(|d| d.severity == s)
            .count()
    };
    let errors = count(Severity::Error);
    let warnings = count(Severity::Warning);

    if !lines.is_empty() {
        lines.push(String::new());
    }
    if errors == 0 && warnings == 0 {
        lines.push("No issues found.".into());
    } else {
        lines.push(format!("{errors} error(s), {warnings} warning(s)"));
    }
    Report {
        text: lines.join("\n"),
        errors,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bad_timezone_is_an_error() {
        let mut config = CadenceConfig::default();
        config.planner.timezone = "Mars/Olympus".into();
        let report = render_diagnostics(&config);
        assert_eq!(report.errors, 1);
        assert!(report.text.contains("planner.timezone"));
        assert!(report.text.contains("unknown IANA timezone 'Mars/Olympus'"));
    }

    #[test]
    fn show_hides_api_key() {
        let mut config = CadenceConfig::default();
        config.llm.api_key = Some(secrecy::Secret::new("sk-live".into()));
        let text = toml::to_string_pretty(&redacted(&config)).unwrap();
        assert!(!text.contains("sk-live"));
        assert!(text.contains("***"));
    }

    #[test]
    fn explicit_path_wins() {
        assert_eq!(
            config_path(Some(Path::new("/etc/cadence.toml"))),
            Path::new("/etc/cadence.toml")
        );
    }
}
