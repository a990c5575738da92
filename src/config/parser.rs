use crate::config::types::Config;
use crate::config::validation::validate;
use crate::config::ConfigError;
use std::path::Path;

/// Loads, parses and validates the TOML configuration at `path`.
///
/// Every key is optional; absent keys take their defaults.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from TOML text
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}
