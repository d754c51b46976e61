use config::{Config, Environment, File, FileFormat};
use serde::Deserialize;
use thiserror::Error;

/// Turn bound used when neither the request nor the configuration sets one
pub const DEFAULT_MAX_TURNS: u32 = 5;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

/// Process-wide defaults for generation
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Settings {
    /// Model used by requests that do not name one
    #[serde(default)]
    pub default_model: Option<String>,
    /// Upper bound on model invocations per generation when the request sets none
    #[serde(default = "default_max_turns")]
    pub max_turns: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            default_model: None,
            max_turns: DEFAULT_MAX_TURNS,
        }
    }
}

impl Settings {
    /// Load settings from `GENLOOP_*` environment variables over the defaults
    pub fn new() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load settings from a TOML document, then the environment, over the defaults
    pub fn from_toml(toml: &str) -> Result<Self, ConfigError> {
        Self::load(Some(toml))
    }

    fn load(toml: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder =
            Config::builder().set_default("max_turns", i64::from(DEFAULT_MAX_TURNS))?;
        if let Some(toml) = toml {
            builder = builder.add_source(File::from_str(toml, FileFormat::Toml));
        }
        let config = builder
            .add_source(
                Environment::with_prefix("GENLOOP")
                    .prefix_separator("_")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        tracing::debug!(?settings, "loaded generation settings");
        settings.validate()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.max_turns == 0 {
            return Err(ConfigError::Invalid(
                "max_turns must be at least 1".to_string(),
            ));
        }
        Ok(self)
    }
}

fn default_max_turns() -> u32 {
    DEFAULT_MAX_TURNS
}
