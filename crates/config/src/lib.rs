//! Configuration loading, validation, and env substitution.
//!
//! Config files: `cadence.toml`, `cadence.yaml`, or `cadence.json`
//! Searched in `./` then `~/.config/cadence/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution in all string values.

pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    loader::{config_dir, data_dir, discover_and_load, find_or_default_config_path, load_config},
    schema::{CadenceConfig, CalendarConfig, LlmConfig, PlannerConfig, SessionsConfig},
    validate::{Diagnostic, Severity, ValidationResult},
};
