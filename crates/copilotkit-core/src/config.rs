//! Configuration system.

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::Error;

/// Default cap on follow-up invocations within one run.
pub const DEFAULT_MAX_FOLLOW_UPS: usize = 32;

/// Main configuration struct.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Follow-up loop settings
    pub run: RunConfig,
    /// Logging settings
    pub logging: LoggingConfig,
}

/// How a run observes the tool registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RegistryReads {
    /// Copy the registry once when the run starts
    #[default]
    Snapshot,
    /// Read the shared registry on every lookup; concurrent writes may or may not be seen
    Live,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Maximum follow-up invocations per run. `None` disables the cap; config
    /// files and `COPILOTKIT_RUN__MAX_FOLLOW_UPS` spell it `"unbounded"`.
    #[serde(with = "follow_up_cap")]
    pub max_follow_ups: Option<usize>,
    /// Registry read policy
    pub registry_reads: RegistryReads,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_follow_ups: Some(DEFAULT_MAX_FOLLOW_UPS),
            registry_reads: RegistryReads::default(),
        }
    }
}

/// A follow-up cap is either a count or the word `"unbounded"`.
mod follow_up_cap {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const UNBOUNDED: &str = "unbounded";

    pub fn serialize<S>(cap: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match cap {
            Some(n) => serializer.serialize_u64(*n as u64),
            None => serializer.serialize_str(UNBOUNDED),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<usize>, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(usize),
            Word(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Ok(Some(n)),
            Raw::Word(word) if word.eq_ignore_ascii_case(UNBOUNDED) => Ok(None),
            Raw::Word(word) => Err(D::Error::custom(format!(
                "expected a number or \"{}\", got \"{}\"",
                UNBOUNDED, word
            ))),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Validation result with multiple issues.
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    /// List of validation issues
    pub issues: Vec<ValidationIssue>,
}

impl ValidationResult {
    /// Create a new empty validation result.
    pub fn new() -> Self {
        Self { issues: Vec::new() }
    }

    /// Check if validation passed (no errors).
    pub fn is_ok(&self) -> bool {
        !self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }

    /// Get only error-level issues.
    pub fn errors(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Error)
            .collect()
    }

    /// Get only warning-level issues.
    pub fn warnings(&self) -> Vec<&ValidationIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == IssueSeverity::Warning)
            .collect()
    }

    /// Add an error.
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Error,
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning.
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.issues.push(ValidationIssue {
            severity: IssueSeverity::Warning,
            field: field.into(),
            message: message.into(),
        });
    }
}

/// A single validation issue.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    /// Severity of the issue
    pub severity: IssueSeverity,
    /// Field path (e.g., "run.max_follow_ups")
    pub field: String,
    /// Human-readable message
    pub message: String,
}

/// Severity level for validation issues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueSeverity {
    /// Warnings don't prevent loading
    Warning,
    /// Errors prevent loading
    Error,
}

impl Config {
    /// Load configuration from all sources.
    pub fn load() -> Result<Self, figment::Error> {
        Self::figment().extract()
    }

    /// The layered provider chain, lowest precedence first.
    pub fn figment() -> Figment {
        let config_dir = Self::config_dir();

        Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(config_dir.join("config.toml")))
            .merge(Toml::file(".copilotkit/config.toml"))
            // Project local config (gitignored)
            .merge(Toml::file(".copilotkit/config.local.toml"))
            .merge(Env::prefixed("COPILOTKIT_").split("__"))
    }

    /// Load and validate configuration.
    pub fn load_validated() -> Result<Self, Error> {
        let config = Self::load().map_err(|e| Error::Config(e.to_string()))?;
        let result = config.validate();

        if !result.is_ok() {
            let errors: Vec<String> = result
                .errors()
                .iter()
                .map(|e| format!("{}: {}", e.field, e.message))
                .collect();
            return Err(Error::Config(format!(
                "Configuration validation failed:\n  {}",
                errors.join("\n  ")
            )));
        }

        for warning in result.warnings() {
            tracing::warn!("Config warning - {}: {}", warning.field, warning.message);
        }

        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();

        match self.run.max_follow_ups {
            Some(0) => result.add_error(
                "run.max_follow_ups",
                "max_follow_ups must be greater than 0; set it to \"unbounded\" to disable the cap",
            ),
            Some(n) if n > 1_000 => result.add_warning(
                "run.max_follow_ups",
                "max_follow_ups is very high (> 1000), a looping agent may run for a long time",
            ),
            None => result.add_warning(
                "run.max_follow_ups",
                "follow-up cap disabled, a tool that always requests follow-up will loop forever",
            ),
            Some(_) => {}
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            result.add_error(
                "logging.level",
                format!(
                    "Invalid log level '{}'. Valid values: {:?}",
                    self.logging.level, valid_levels
                ),
            );
        }

        result
    }

    /// Get the configuration directory.
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .map(|p| p.join("copilotkit"))
            .unwrap_or_else(|| PathBuf::from("~/.config/copilotkit"))
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, Error> {
        toml::to_string_pretty(self).map_err(|e| Error::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::Jail;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        let result = config.validate();
        assert!(result.is_ok(), "Default config should be valid: {:?}", result.issues);
        assert!(result.warnings().is_empty());
        assert_eq!(config.run.max_follow_ups, Some(DEFAULT_MAX_FOLLOW_UPS));
        assert_eq!(config.run.registry_reads, RegistryReads::Snapshot);
    }

    #[test]
    fn test_zero_follow_ups_is_error() {
        let mut config = Config::default();
        config.run.max_follow_ups = Some(0);
        let result = config.validate();
        assert!(!result.is_ok());
        assert!(result.errors().iter().any(|e| e.field == "run.max_follow_ups"));
    }

    #[test]
    fn test_unbounded_follow_ups_is_warning() {
        let mut config = Config::default();
        config.run.max_follow_ups = None;
        let result = config.validate();
        assert!(result.is_ok());
        assert!(result.warnings().iter().any(|e| e.field == "run.max_follow_ups"));
    }

    #[test]
    fn test_unbounded_from_file_and_env() {
        Jail::expect_with(|jail| {
            jail.create_dir(".copilotkit")?;
            jail.create_file(
                ".copilotkit/config.toml",
                "[run]\nmax_follow_ups = \"unbounded\"\n",
            )?;

            let config = Config::load()?;
            assert_eq!(config.run.max_follow_ups, None);
            let warnings = config.validate();
            assert!(warnings.warnings().iter().any(|w| w.field == "run.max_follow_ups"));

            jail.set_env("COPILOTKIT_RUN__MAX_FOLLOW_UPS", "7");
            assert_eq!(Config::load()?.run.max_follow_ups, Some(7));

            jail.set_env("COPILOTKIT_RUN__MAX_FOLLOW_UPS", "unbounded");
            assert_eq!(Config::load()?.run.max_follow_ups, None);
            Ok(())
        });
    }

    #[test]
    fn test_unknown_cap_word_is_rejected() {
        Jail::expect_with(|jail| {
            jail.create_file("config.toml", "[run]\nmax_follow_ups = \"forever\"\n")?;
            let err = Figment::new()
                .merge(Toml::file("config.toml"))
                .extract::<Config>()
                .unwrap_err();
            assert!(err.to_string().contains("unbounded"));
            Ok(())
        });
    }

    #[test]
    fn test_unbounded_renders_as_word() {
        let mut config = Config::default();
        config.run.max_follow_ups = None;
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("max_follow_ups = \"unbounded\""));
    }

    #[test]
    fn test_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "loud".to_string();
        let result = config.validate();
        assert!(result.errors().iter().any(|e| e.field == "logging.level"));
    }

    #[test]
    fn test_project_file_and_env_layering() {
        Jail::expect_with(|jail| {
            jail.create_dir(".copilotkit")?;
            jail.create_file(
                ".copilotkit/config.toml",
                r#"
                [run]
                max_follow_ups = 5
                registry_reads = "live"
                "#,
            )?;
            jail.set_env("COPILOTKIT_LOGGING__LEVEL", "debug");

            let config = Config::load()?;
            assert_eq!(config.run.max_follow_ups, Some(5));
            assert_eq!(config.run.registry_reads, RegistryReads::Live);
            assert_eq!(config.logging.level, "debug");
            Ok(())
        });
    }

    #[test]
    fn test_load_validated_rejects_invalid_file() {
        Jail::expect_with(|jail| {
            jail.create_dir(".copilotkit")?;
            jail.create_file(".copilotkit/config.local.toml", "[run]\nmax_follow_ups = 0\n")?;

            let err = Config::load_validated().unwrap_err();
            assert!(err.to_string().contains("run.max_follow_ups"));
            assert!(err.recovery_suggestion().is_some());
            Ok(())
        });
    }

    #[test]
    fn test_to_toml_contains_sections() {
        let rendered = Config::default().to_toml().unwrap();
        assert!(rendered.contains("[run]"));
        assert!(rendered.contains("registry_reads = \"snapshot\""));
    }
}
