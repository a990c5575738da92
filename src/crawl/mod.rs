//! Walking the sample through a page driver
//!
//! The controller visits every sampled postcode region by region, scraping
//! each results page into the dataset. Any driver failure ends the attempt:
//! progress is checkpointed, reloaded, and the next attempt carries on from
//! the first page that was not yet collected.

mod state;

pub use state::{CrawlPhase, CrawlState};

use crate::cache::{CheckpointError, CheckpointId, CheckpointManager};
use crate::extract::FieldExtractor;
use crate::models::{Dataset, ListingRow};
use crate::scrapers::{DriverError, PageDriver};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Failed attempts allowed before a crawl gives up
pub const DEFAULT_MAX_ATTEMPTS: u32 = 20;

#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Scraping failed {attempts} times, giving up. Progress saved as checkpoint {checkpoint}")]
    AttemptsExhausted {
        attempts: u32,
        checkpoint: CheckpointId,
    },

    #[error("Scraping cancelled. Progress saved as checkpoint {checkpoint}")]
    Cancelled { checkpoint: CheckpointId },

    #[error(transparent)]
    Checkpoint(#[from] CheckpointError),
}

/// Why an attempt stopped early
enum Interrupt {
    Driver(DriverError),
    Cancelled,
}

impl From<DriverError> for Interrupt {
    fn from(e: DriverError) -> Self {
        Self::Driver(e)
    }
}

pub struct CrawlController<'a> {
    extractor: &'a FieldExtractor,
    checkpoints: CheckpointManager,
    max_attempts: u32,
    cancel: Option<Arc<AtomicBool>>,
    state: CrawlState,
    phase: CrawlPhase,
}

impl<'a> CrawlController<'a> {
    pub fn new(
        extractor: &'a FieldExtractor,
        checkpoints: CheckpointManager,
        state: CrawlState,
    ) -> Self {
        Self {
            extractor,
            checkpoints,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            cancel: None,
            state,
            phase: CrawlPhase::NotStarted,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts.max(1);
        self
    }

    /// Stops the crawl between postcodes once `flag` is set
    pub fn with_cancel_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn phase(&self) -> &CrawlPhase {
        &self.phase
    }

    /// Crawls until every sampled postcode is done, restarting from the last
    /// checkpoint after each failure.
    pub fn run<D: PageDriver>(&mut self, driver: &mut D) -> Result<Dataset, CrawlError> {
        loop {
            info!(
                "Starting attempt {} of {}",
                self.state.run_attempt_count + 1,
                self.max_attempts
            );

            let e = match self.crawl_once(driver) {
                Ok(()) => {
                    self.phase = CrawlPhase::Done;
                    info!(
                        "Scraping finished with {} rows collected",
                        self.state.data.len()
                    );
                    let schema = self.state.data.schema().clone();
                    return Ok(std::mem::replace(&mut self.state.data, Dataset::new(schema)));
                }
                Err(Interrupt::Cancelled) => {
                    info!("Cancellation requested, saving progress");
                    let checkpoint = self.checkpoints.save(&self.state)?;
                    return Err(CrawlError::Cancelled { checkpoint });
                }
                Err(Interrupt::Driver(e)) => e,
            };

            warn!("Scraping failed during {}: {}", self.phase, e);
            self.phase = CrawlPhase::Failed;
            self.state.run_attempt_count += 1;
            info!("Data is being cached...");
            let checkpoint = self.checkpoints.save(&self.state)?;

            if self.state.run_attempt_count >= self.max_attempts {
                error!(
                    "Giving up after {} failed attempts at {:.2}% completion",
                    self.state.run_attempt_count,
                    self.state.completion * 100.0
                );
                return Err(CrawlError::AttemptsExhausted {
                    attempts: self.state.run_attempt_count,
                    checkpoint,
                });
            }

            self.state = self.checkpoints.load(&checkpoint)?;
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::SeqCst))
    }

    fn crawl_once<D: PageDriver>(&mut self, driver: &mut D) -> Result<(), Interrupt> {
        let sample = self.state.sample.clone();
        let regions = sample.regions();

        while let Some(group) = regions.get(self.state.region_index) {
            if self.state.postcode_index == 0 {
                info!("Scraping region {}", group.region);
            }
            self.phase = CrawlPhase::InRegion {
                region: group.region.to_string(),
            };

            let Some(postcode) = group.postcodes.get(self.state.postcode_index) else {
                self.state.finish_postcode(group.postcodes.len());
                continue;
            };
            if self.cancelled() {
                return Err(Interrupt::Cancelled);
            }

            self.crawl_postcode(driver, postcode)?;
            self.state.finish_postcode(group.postcodes.len());
            info!("Scraping {:.2}% complete.", self.state.completion * 100.0);
        }

        Ok(())
    }

    /// Scrapes `postcode` from `state.page_index` to its last results page
    fn crawl_postcode<D: PageDriver>(
        &mut self,
        driver: &mut D,
        postcode: &str,
    ) -> Result<(), Interrupt> {
        self.phase = CrawlPhase::InPostcode {
            postcode: postcode.to_string(),
        };

        let mut page = driver.open_search(postcode)?;
        // A blank page indicator still leaves the first page to read
        let last = driver.page_count(&page)?.max(CrawlState::FIRST_PAGE);
        let mut current = CrawlState::FIRST_PAGE;

        for number in self.state.page_index..=last {
            while current < number {
                driver.next_page(&mut page)?;
                current += 1;
            }
            self.phase = CrawlPhase::InPage {
                postcode: postcode.to_string(),
                page: number,
            };

            let listings = driver.listings(&page)?;
            let rows: Vec<ListingRow> = listings
                .iter()
                .map(|listing| {
                    let mut row = self.extractor.extract(listing);
                    row.tag_postcode(postcode);
                    row
                })
                .collect();
            debug!(
                "{} listings on page {} of {} for {}",
                rows.len(),
                number,
                last,
                postcode
            );

            self.state.data.extend(rows);
            self.state.page_index = number + 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldSpec, FieldValue};
    use crate::scrapers::Selectors;
    use crate::testing::{listing_card_html, sample_of, DriverCall, FailAt, ScriptedDriver};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn card(price: &str) -> String {
        listing_card_html(Some(price), Some("Flat"), Some("2"), Some("1"), Some("Close to shops"))
    }

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(FieldSpec::default(), Selectors::default())
    }

    fn new_state() -> CrawlState {
        let sample = sample_of(&[("London", &["E1", "N1"]), ("Wales", &["CF1"])]);
        CrawlState::new(sample, FieldSpec::default().schema())
    }

    fn driver() -> ScriptedDriver {
        ScriptedDriver::new()
            .with_results("E1", vec![vec![card("£100"), card("£101")], vec![card("£102")]])
            .with_results("N1", vec![vec![card("£200")]])
            .with_results("CF1", vec![vec![card("£300")], vec![card("£301")], vec![]])
    }

    fn prices(data: &Dataset) -> Vec<i64> {
        data.rows()
            .iter()
            .filter_map(|row| match row.get("price") {
                Some(FieldValue::Int(n)) => Some(*n),
                _ => None,
            })
            .collect()
    }

    fn saved_checkpoints(dir: &TempDir) -> usize {
        std::fs::read_dir(dir.path().join("Params"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn test_clean_run_collects_everything() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor();
        let mut controller =
            CrawlController::new(&extractor, CheckpointManager::new(dir.path()), new_state());

        let data = controller.run(&mut driver()).unwrap();

        assert_eq!(prices(&data), vec![100, 101, 102, 200, 300, 301]);
        assert_eq!(data.postcodes(), vec!["E1", "N1", "CF1"]);
        assert_eq!(controller.phase(), &CrawlPhase::Done);
        assert_eq!(controller.state().completion, 1.0);
        assert_eq!(saved_checkpoints(&dir), 0);
    }

    #[test]
    fn test_failed_page_resumes_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor();
        let mut driver = driver().failing(
            FailAt::Listings {
                postcode: "CF1".to_string(),
                page: 2,
            },
            1,
        );
        let mut controller =
            CrawlController::new(&extractor, CheckpointManager::new(dir.path()), new_state());

        let data = controller.run(&mut driver).unwrap();

        assert_eq!(prices(&data), vec![100, 101, 102, 200, 300, 301]);
        assert_eq!(controller.state().run_attempt_count, 1);
        assert_eq!(saved_checkpoints(&dir), 1);

        // The retry skips straight to page 2 of CF1 without re-reading page 1
        let calls = driver.calls();
        let reopen = calls
            .iter()
            .rposition(|c| *c == DriverCall::OpenSearch("CF1".to_string()))
            .unwrap();
        assert_eq!(
            &calls[reopen..reopen + 4],
            &[
                DriverCall::OpenSearch("CF1".to_string()),
                DriverCall::PageCount("CF1".to_string()),
                DriverCall::NextPage {
                    postcode: "CF1".to_string(),
                    to: 2
                },
                DriverCall::Listings {
                    postcode: "CF1".to_string(),
                    page: 2
                },
            ]
        );
    }

    #[test]
    fn test_attempt_ceiling_ends_the_run() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor();
        let manager = CheckpointManager::new(dir.path());
        let mut driver = driver().failing(
            FailAt::Open {
                postcode: "N1".to_string(),
            },
            u32::MAX,
        );
        let mut controller =
            CrawlController::new(&extractor, manager.clone(), new_state()).with_max_attempts(3);

        let err = controller.run(&mut driver).unwrap_err();
        let checkpoint = match err {
            CrawlError::AttemptsExhausted {
                attempts,
                checkpoint,
            } => {
                assert_eq!(attempts, 3);
                checkpoint
            }
            other => panic!("unexpected error: {other}"),
        };
        assert_eq!(controller.phase(), &CrawlPhase::Failed);

        let saved = manager.load(&checkpoint).unwrap();
        assert_eq!(saved.run_attempt_count, 3);
        assert_eq!((saved.region_index, saved.postcode_index), (0, 1));
        assert_eq!(saved.completion, 1.0 / 3.0);
        assert_eq!(prices(&saved.data), vec![100, 101, 102]);
    }

    #[test]
    fn test_missing_pagination_fails_the_attempt() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor();
        let mut driver = driver().without_pagination("E1");
        let mut controller =
            CrawlController::new(&extractor, CheckpointManager::new(dir.path()), new_state())
                .with_max_attempts(2);

        let err = controller.run(&mut driver).unwrap_err();
        assert!(matches!(err, CrawlError::AttemptsExhausted { attempts: 2, .. }));
        assert!(!driver
            .calls()
            .iter()
            .any(|c| matches!(c, DriverCall::Listings { .. })));
    }

    #[test]
    fn test_no_pages_still_reads_first_page() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor();
        let sample = sample_of(&[("London", &["W1"])]);
        let state = CrawlState::new(sample, FieldSpec::default().schema());
        let mut driver = ScriptedDriver::new();
        let mut controller =
            CrawlController::new(&extractor, CheckpointManager::new(dir.path()), state);

        let data = controller.run(&mut driver).unwrap();

        assert!(data.is_empty());
        assert!(driver.calls().contains(&DriverCall::Listings {
            postcode: "W1".to_string(),
            page: 1
        }));
    }

    #[test]
    fn test_cancellation_saves_a_checkpoint() {
        let dir = TempDir::new().unwrap();
        let extractor = extractor();
        let manager = CheckpointManager::new(dir.path());
        let flag = Arc::new(AtomicBool::new(true));
        let mut controller = CrawlController::new(&extractor, manager.clone(), new_state())
            .with_cancel_flag(flag);

        let checkpoint = match controller.run(&mut driver()).unwrap_err() {
            CrawlError::Cancelled { checkpoint } => checkpoint,
            other => panic!("unexpected error: {other}"),
        };

        let saved = manager.load(&checkpoint).unwrap();
        assert_eq!(saved.run_attempt_count, 0);
        assert!(saved.data.is_empty());
    }
}
