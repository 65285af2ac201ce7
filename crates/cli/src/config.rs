//! Configuration commands.
//!
//! Configuration is loaded from TOML files and merged with environment variables
//! prefixed with `PUBCID__`. For example, `PUBCID__PUBCID__TYPE=cookie`
//! will override `pubcid.type` in the TOML file.

use std::fs;
use std::path::PathBuf;

use pubcid_common::pubcid::PubcidOptions;
use pubcid_common::settings::Settings;

use crate::error::CliError;

/// Load settings from `file`, or from defaults and the environment alone.
pub(crate) fn load_settings(file: Option<&PathBuf>) -> Result<Settings, CliError> {
    let content = match file {
        Some(path) => fs::read_to_string(path)?,
        None => String::new(),
    };

    Settings::from_toml_validated(&content)
        .map_err(|e| CliError::Config(format!("Failed to load config: {:?}", e)))
}

/// Validate configuration file.
///
/// Checks TOML syntax and field bounds after environment overrides are merged.
pub fn validate(file: PathBuf, verbose: bool) -> Result<(), CliError> {
    if verbose {
        println!("Loading config from: {}", file.display());
        println!("Environment variables with PUBCID__ prefix will be merged");
    }

    let settings = load_settings(Some(&file))?;

    println!("Configuration is valid");
    println!("  File: {}", file.display());
    println!("  Log level: {}", settings.log_level());

    if verbose {
        println!("\npubcid options:");
        print_options(&settings.pubcid);
    }

    Ok(())
}

fn print_options(options: &PubcidOptions) {
    let enabled = options.enable.unwrap_or(true);
    println!("  - enable: {}", if enabled { "yes" } else { "no" });
    match options.exp_interval.as_ref().and_then(|raw| raw.minutes()) {
        Some(minutes) => println!("  - expInterval: {} minutes", minutes),
        None => println!("  - expInterval: default"),
    }
    println!(
        "  - type: {}",
        options.storage_type.as_deref().unwrap_or("default")
    );
    println!("  - readOnly: {}", options.read_only.unwrap_or(false));
}
