use crate::models::{Dataset, PostcodeSample, Schema};
use std::fmt;

/// Everything needed to pick a crawl back up where it stopped
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlState {
    /// Attempts that ended in failure so far
    pub run_attempt_count: u32,
    /// Region being crawled, indexing `sample.regions()`
    pub region_index: usize,
    /// Postcode within the region
    pub postcode_index: usize,
    /// Next results page to scrape, counting from 1
    pub page_index: u32,
    /// Finished postcodes over sampled postcodes, in `[0, 1]`
    pub completion: f64,
    pub sample: PostcodeSample,
    pub data: Dataset,
}

impl CrawlState {
    pub const FIRST_PAGE: u32 = 1;

    pub fn new(sample: PostcodeSample, schema: Schema) -> Self {
        Self {
            run_attempt_count: 0,
            region_index: 0,
            postcode_index: 0,
            page_index: Self::FIRST_PAGE,
            completion: 0.0,
            sample,
            data: Dataset::new(schema),
        }
    }

    /// Postcodes fully crawled, as implied by the cursors
    pub fn completed_postcodes(&self) -> usize {
        let groups = self.sample.regions();
        let before: usize = groups
            .iter()
            .take(self.region_index)
            .map(|g| g.postcodes.len())
            .sum();
        before + self.postcode_index
    }

    pub fn is_finished(&self) -> bool {
        self.region_index >= self.sample.regions().len()
    }

    /// Marks the current postcode done and moves the cursors on
    pub(crate) fn finish_postcode(&mut self, postcodes_in_region: usize) {
        self.page_index = Self::FIRST_PAGE;
        self.postcode_index += 1;
        if self.postcode_index >= postcodes_in_region {
            self.postcode_index = 0;
            self.region_index += 1;
        }
        let total = self.sample.len();
        if total > 0 {
            let fraction = self.completed_postcodes() as f64 / total as f64;
            self.completion = fraction.clamp(self.completion, 1.0);
        }
    }
}

/// Where the crawl controller is
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlPhase {
    NotStarted,
    InRegion { region: String },
    InPostcode { postcode: String },
    InPage { postcode: String, page: u32 },
    Done,
    Failed,
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotStarted => f.write_str("not started"),
            Self::InRegion { region } => write!(f, "region {}", region),
            Self::InPostcode { postcode } => write!(f, "postcode {}", postcode),
            Self::InPage { postcode, page } => write!(f, "page {} of {}", page, postcode),
            Self::Done => f.write_str("done"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::sample_of;

    #[test]
    fn test_cursor_walk_tracks_completion() {
        let sample = sample_of(&[("London", &["A", "B"]), ("Wales", &["C", "D"])]);
        let mut state = CrawlState::new(sample, Schema::default());

        state.page_index = 4;
        state.finish_postcode(2);
        assert_eq!((state.region_index, state.postcode_index), (0, 1));
        assert_eq!(state.page_index, CrawlState::FIRST_PAGE);
        assert_eq!(state.completion, 0.25);

        state.finish_postcode(2);
        assert_eq!((state.region_index, state.postcode_index), (1, 0));
        assert_eq!(state.completion, 0.5);

        state.finish_postcode(2);
        state.finish_postcode(2);
        assert!(state.is_finished());
        assert_eq!(state.completion, 1.0);
    }
}
