//! Pipeline configuration.
//!
//! Read once at startup from environment variables (with CLI overrides
//! applied on top) and immutable for the run.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable has an invalid value.
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    /// Configuration validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration for the generation pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    // Rate limiting
    /// Minimum delay between consecutive generation calls.
    pub call_interval: Duration,
    /// Cooldown after a task-level failure before starting the next task.
    pub failure_cooldown: Duration,

    // Checkpointing
    /// Flush the progress snapshot every N completed tasks.
    pub flush_every: usize,

    // Generation settings
    /// Model identifier passed to the generation client.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f64,
    /// Maximum tokens per generated document.
    pub max_tokens: u32,
    /// Language of the primary document content.
    pub primary_language: String,
    /// Language of the secondary document content.
    pub secondary_language: String,

    // Run caps
    /// Optional cap on how many projects to process this run.
    pub max_projects: Option<usize>,
    /// Optional cap on how many templates to process this run.
    pub max_templates: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            call_interval: Duration::from_millis(2000),
            failure_cooldown: Duration::from_secs(30),
            flush_every: 5,
            model: "anthropic/claude-opus-4.5".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
            primary_language: "en".to_string(),
            secondary_language: "es".to_string(),
            max_projects: None,
            max_templates: None,
        }
    }
}

impl PipelineConfig {
    /// Creates a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `DOCFORGE_CALL_INTERVAL_MS`: Delay between generation calls (default: 2000)
    /// - `DOCFORGE_FAILURE_COOLDOWN_SECS`: Post-failure cooldown (default: 30)
    /// - `DOCFORGE_FLUSH_EVERY`: Checkpoint frequency in tasks (default: 5)
    /// - `DOCFORGE_MODEL`: Generation model identifier
    /// - `DOCFORGE_TEMPERATURE`: Sampling temperature (default: 0.7)
    /// - `DOCFORGE_MAX_TOKENS`: Max tokens per document (default: 4000)
    /// - `DOCFORGE_PRIMARY_LANG`: Primary content language (default: en)
    /// - `DOCFORGE_SECONDARY_LANG`: Secondary content language (default: es)
    /// - `DOCFORGE_MAX_PROJECTS`: Cap on projects per run
    /// - `DOCFORGE_MAX_TEMPLATES`: Cap on templates per run
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable has an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("DOCFORGE_CALL_INTERVAL_MS") {
            let ms: u64 = parse_env_value(&val, "DOCFORGE_CALL_INTERVAL_MS")?;
            config.call_interval = Duration::from_millis(ms);
        }

        if let Ok(val) = std::env::var("DOCFORGE_FAILURE_COOLDOWN_SECS") {
            let secs: u64 = parse_env_value(&val, "DOCFORGE_FAILURE_COOLDOWN_SECS")?;
            config.failure_cooldown = Duration::from_secs(secs);
        }

        if let Ok(val) = std::env::var("DOCFORGE_FLUSH_EVERY") {
            config.flush_every = parse_env_value(&val, "DOCFORGE_FLUSH_EVERY")?;
        }

        if let Ok(val) = std::env::var("DOCFORGE_MODEL") {
            config.model = val;
        }

        if let Ok(val) = std::env::var("DOCFORGE_TEMPERATURE") {
            config.temperature = parse_env_value(&val, "DOCFORGE_TEMPERATURE")?;
        }

        if let Ok(val) = std::env::var("DOCFORGE_MAX_TOKENS") {
            config.max_tokens = parse_env_value(&val, "DOCFORGE_MAX_TOKENS")?;
        }

        if let Ok(val) = std::env::var("DOCFORGE_PRIMARY_LANG") {
            config.primary_language = val;
        }

        if let Ok(val) = std::env::var("DOCFORGE_SECONDARY_LANG") {
            config.secondary_language = val;
        }

        if let Ok(val) = std::env::var("DOCFORGE_MAX_PROJECTS") {
            config.max_projects = Some(parse_env_value(&val, "DOCFORGE_MAX_PROJECTS")?);
        }

        if let Ok(val) = std::env::var("DOCFORGE_MAX_TEMPLATES") {
            config.max_templates = Some(parse_env_value(&val, "DOCFORGE_MAX_TEMPLATES")?);
        }

        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.flush_every == 0 {
            return Err(ConfigError::ValidationFailed(
                "flush_every must be at least 1".to_string(),
            ));
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ConfigError::ValidationFailed(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            )));
        }

        if self.max_tokens == 0 {
            return Err(ConfigError::ValidationFailed(
                "max_tokens must be at least 1".to_string(),
            ));
        }

        if self.model.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "model must not be empty".to_string(),
            ));
        }

        if self.primary_language.is_empty() || self.secondary_language.is_empty() {
            return Err(ConfigError::ValidationFailed(
                "languages must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}

/// Parses an environment variable value into the target type.
fn parse_env_value<T: std::str::FromStr>(val: &str, key: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    val.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}
