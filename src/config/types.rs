use crate::models::FieldSpec;
use crate::scrapers::{RetryPolicy, SiteParams};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for a scout run
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Postcodes drawn from every region
    pub n_per_region: usize,

    /// Seed for the postcode draw; unset draws from entropy
    pub set_seed: Option<u64>,

    /// Checkpoint id to export instead of scraping
    pub import_cache: Option<String>,

    pub fields_of_interest: FieldSpec,
    pub paths: PathsConfig,
    pub sampling: SamplingConfig,
    pub retry: RetryConfig,
    pub site: SiteParams,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            n_per_region: 40,
            set_seed: Some(12),
            import_cache: None,
            fields_of_interest: FieldSpec::default(),
            paths: PathsConfig::default(),
            sampling: SamplingConfig::default(),
            retry: RetryConfig::default(),
            site: SiteParams::default(),
        }
    }
}

/// Input and output locations
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// CSV of postcodes with their region and country
    pub postcodes: PathBuf,

    /// Root for exports, checkpoints and logs
    pub outputs: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            postcodes: PathBuf::from("Inputs/postalcodes.csv"),
            outputs: PathBuf::from("Outputs"),
        }
    }
}

impl PathsConfig {
    pub fn cache_dir(&self) -> PathBuf {
        self.outputs.join("Cache")
    }

    pub fn logs_dir(&self) -> PathBuf {
        self.outputs.join("Logs")
    }
}

/// Which parts of the postcode list take part in the draw
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    pub excluded_regions: Vec<String>,
    pub excluded_countries: Vec<String>,
}

/// Offshore islands are left out unless configured otherwise
impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            excluded_regions: Vec::new(),
            excluded_countries: ["Isle of Man", "Guernsey", "Jersey"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

/// Retry budgets for connecting and for whole crawl attempts
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    pub connect_attempts: u32,
    pub connect_delay_secs: u64,
    pub run_attempts: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            connect_attempts: 5,
            connect_delay_secs: 10,
            run_attempts: 20,
        }
    }
}

impl RetryConfig {
    pub fn connect_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.connect_attempts,
            delay: Duration::from_secs(self.connect_delay_secs),
        }
    }
}
