use std::str::FromStr;

use config::{Config, Environment, File, FileFormat};
use error_stack::{Report, ResultExt};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::PubcidError;
use crate::pubcid::PubcidOptions;

pub const ENVIRONMENT_VARIABLE_PREFIX: &str = "PUBCID";
pub const ENVIRONMENT_VARIABLE_SEPARATOR: &str = "__";

#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct Logging {
    #[serde(default = "default_log_level")]
    #[validate(length(min = 1))]
    pub level: String,
}

impl Default for Logging {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct Settings {
    #[serde(default)]
    #[validate(nested)]
    pub pubcid: PubcidOptions,
    #[serde(default)]
    #[validate(nested)]
    pub logging: Logging,
}

impl Settings {
    /// Load settings from TOML, with `PUBCID__` environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or cannot be deserialized.
    pub fn from_toml(toml_str: &str) -> Result<Self, Report<PubcidError>> {
        let environment = Environment::default()
            .prefix(ENVIRONMENT_VARIABLE_PREFIX)
            .separator(ENVIRONMENT_VARIABLE_SEPARATOR)
            .try_parsing(true);

        let toml = File::from_str(toml_str, FileFormat::Toml);
        let config = Config::builder()
            .add_source(toml)
            .add_source(environment)
            .build()
            .change_context(PubcidError::Configuration {
                message: "Failed to build configuration".to_string(),
            })?;

        config
            .try_deserialize()
            .change_context(PubcidError::Configuration {
                message: "Failed to deserialize configuration".to_string(),
            })
    }

    /// Parse and validate.
    ///
    /// # Errors
    ///
    /// Returns an error if loading fails or a field is out of bounds.
    pub fn from_toml_validated(toml_str: &str) -> Result<Self, Report<PubcidError>> {
        let settings = Self::from_toml(toml_str)?;
        settings
            .validate()
            .change_context(PubcidError::Configuration {
                message: "Settings validation failed".to_string(),
            })?;
        Ok(settings)
    }

    /// Configured log level, `Info` when the name is unknown.
    #[must_use]
    pub fn log_level(&self) -> LevelFilter {
        LevelFilter::from_str(&self.logging.level).unwrap_or_else(|_| {
            log::warn!(
                "Unknown log level '{}', falling back to info",
                self.logging.level
            );
            LevelFilter::Info
        })
    }
}
