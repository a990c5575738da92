//! One end-to-end scout run: sample, crawl, clean, export

use crate::cache::{CheckpointId, CheckpointManager};
use crate::clean::clean;
use crate::config::Config;
use crate::crawl::{CrawlController, CrawlState};
use crate::export::Exporter;
use crate::extract::FieldExtractor;
use crate::models::Dataset;
use crate::operator::OperatorIntervention;
use crate::sampling::{load_postcodes, sample};
use crate::scrapers::{DriverResult, PageDriver, RetryingDriver, SiteParams};
use crate::timing::{timed, timestamp_id};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// What a finished run produced
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub run_id: String,
    pub raw_rows: usize,
    pub clean_rows: usize,
    /// Exported file, if there was anything to export
    pub export: Option<PathBuf>,
}

pub struct Pipeline {
    config: Config,
    operator: Arc<dyn OperatorIntervention>,
    cancel: Option<Arc<AtomicBool>>,
    run_id: String,
}

impl Pipeline {
    pub fn new(config: Config, operator: Arc<dyn OperatorIntervention>) -> Self {
        Self {
            config,
            operator,
            cancel: None,
            run_id: timestamp_id(),
        }
    }

    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    /// Names the export after `run_id` instead of the start time
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Runs to completion. `open_driver` is only called when there is
    /// scraping to do; an imported checkpoint skips straight to cleaning.
    pub fn run<D, F>(&self, open_driver: F) -> crate::Result<RunOutcome>
    where
        D: PageDriver,
        F: FnOnce(&SiteParams) -> DriverResult<D>,
    {
        let raw = match &self.config.import_cache {
            Some(id) => self.import(id)?,
            None => self.scrape(open_driver)?,
        };
        let raw_rows = raw.len();

        let cleaned = clean(raw);
        let exporter = Exporter::new(&self.config.paths.outputs, self.operator.as_ref());
        let export = exporter.export(&cleaned, &self.run_id)?;

        Ok(RunOutcome {
            run_id: self.run_id.clone(),
            raw_rows,
            clean_rows: cleaned.len(),
            export,
        })
    }

    fn checkpoints(&self) -> CheckpointManager {
        CheckpointManager::new(self.config.paths.cache_dir())
    }

    fn import(&self, id: &str) -> crate::Result<Dataset> {
        let id: CheckpointId = id.parse()?;
        let state = self.checkpoints().load(&id)?;
        info!(
            "Recovered checkpoint {}: scraping stopped at {:.2}% completion after {} failed attempts",
            id,
            state.completion * 100.0,
            state.run_attempt_count
        );
        Ok(state.data)
    }

    fn scrape<D, F>(&self, open_driver: F) -> crate::Result<Dataset>
    where
        D: PageDriver,
        F: FnOnce(&SiteParams) -> DriverResult<D>,
    {
        let config = &self.config;
        let master = load_postcodes(&config.paths.postcodes, &config.sampling.excluded_countries)?;
        let sample = timed("Sampling", || {
            sample(
                &master,
                &config.sampling.excluded_regions,
                config.n_per_region,
                config.set_seed,
            )
        })?;

        let extractor = FieldExtractor::new(
            config.fields_of_interest.clone(),
            config.site.selectors.clone(),
        );
        let state = CrawlState::new(sample, extractor.schema().clone());

        let driver = open_driver(&config.site)?;
        let mut driver = RetryingDriver::new(
            driver,
            config.retry.connect_policy(),
            Arc::clone(&self.operator),
        );

        let mut controller = CrawlController::new(&extractor, self.checkpoints(), state)
            .with_max_attempts(config.retry.run_attempts);
        if let Some(flag) = &self.cancel {
            controller = controller.with_cancel_flag(Arc::clone(flag));
        }

        let data = timed("Scraping", || controller.run(&mut driver))?;
        Ok(data)
    }
}
