//! Rightmove Scout: a checkpointed property-listing scraper
//!
//! Samples postcodes per region, drives a headless browser over the search
//! results for each postcode, extracts listing fields and description
//! keywords, and writes a cleaned CSV. Long crawls survive failures by
//! checkpointing their progress and restarting from the last finished page.

pub mod cache;
pub mod clean;
pub mod config;
pub mod crawl;
pub mod export;
pub mod extract;
pub mod models;
pub mod operator;
pub mod pipeline;
pub mod sampling;
pub mod scrapers;
pub mod testing;
pub mod timing;

use thiserror::Error;

pub use cache::{CheckpointError, CheckpointId, CheckpointManager};
pub use config::{Config, ConfigError};
pub use crawl::{CrawlController, CrawlError, CrawlState};
pub use export::ExportError;
pub use models::{Dataset, FieldValue, ListingRow, PostcodeRecord, PostcodeSample, Schema};
pub use sampling::SamplingError;
pub use scrapers::{DriverError, ExtractionError};

/// Top-level error for a scout run
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Sampling error: {0}")]
    Sampling(#[from] SamplingError),

    #[error("Driver error: {0}")]
    Driver(#[from] DriverError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("Crawl error: {0}")]
    Crawl(#[from] CrawlError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;
