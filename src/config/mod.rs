//! Run configuration
//!
//! Settings come from an optional TOML file; anything left out falls back to
//! the defaults of a standard run (40 postcodes per region, seed 12, inputs
//! under `Inputs/`, outputs under `Outputs/`).
//!
//! ```no_run
//! use rightmove_scout::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("scout.toml")).unwrap();
//! println!("Sampling {} postcodes per region", config.n_per_region);
//! ```

mod parser;
mod types;
mod validation;

pub use parser::{load_config, parse_config};
pub use types::{Config, PathsConfig, RetryConfig, SamplingConfig};
pub use validation::validate;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Validation(String),
}
