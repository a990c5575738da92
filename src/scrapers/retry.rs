use crate::operator::{Intervention, OperatorIntervention};
use crate::scrapers::traits::{DriverResult, PageDriver};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{info, warn};

/// Fixed-delay retry budget for reaching the site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            delay: Duration::from_secs(10),
        }
    }
}

/// Runs `op` until it succeeds.
///
/// Failed attempts sleep `policy.delay` before the next try. After
/// `policy.max_attempts` failures the operator decides: retry starts a fresh
/// round of attempts, abort returns the last error.
pub fn ensure_connect<T>(
    policy: &RetryPolicy,
    operator: &dyn OperatorIntervention,
    what: &str,
    mut op: impl FnMut() -> DriverResult<T>,
) -> DriverResult<T> {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(e) => {
                warn!(
                    "Could not {}: {}. Retrying... (automatic attempt {} of {})",
                    what, e, attempt, max_attempts
                );
                if attempt < max_attempts {
                    attempt += 1;
                    thread::sleep(policy.delay);
                    continue;
                }

                let problem = format!(
                    "Could not {} after {} attempts. Ensure you are connected to the internet.",
                    what, max_attempts
                );
                match operator.intervene(&problem) {
                    Intervention::Retry => {
                        info!("Operator asked to retry");
                        attempt = 1;
                    }
                    Intervention::Abort => return Err(e),
                }
            }
        }
    }
}

/// Wraps a driver so that opening a search survives flaky connections
pub struct RetryingDriver<D> {
    inner: D,
    policy: RetryPolicy,
    operator: Arc<dyn OperatorIntervention>,
}

impl<D: PageDriver> RetryingDriver<D> {
    pub fn new(inner: D, policy: RetryPolicy, operator: Arc<dyn OperatorIntervention>) -> Self {
        Self {
            inner,
            policy,
            operator,
        }
    }

    pub fn into_inner(self) -> D {
        self.inner
    }
}

impl<D: PageDriver> PageDriver for RetryingDriver<D> {
    type Page = D::Page;
    type Listing = D::Listing;

    fn open_search(&mut self, postcode: &str) -> DriverResult<Self::Page> {
        let inner = &mut self.inner;
        ensure_connect(
            &self.policy,
            self.operator.as_ref(),
            &format!("open search for {}", postcode),
            || inner.open_search(postcode),
        )
    }

    fn page_count(&mut self, page: &Self::Page) -> DriverResult<u32> {
        self.inner.page_count(page)
    }

    fn next_page(&mut self, page: &mut Self::Page) -> DriverResult<()> {
        self.inner.next_page(page)
    }

    fn listings(&mut self, page: &Self::Page) -> DriverResult<Vec<Self::Listing>> {
        self.inner.listings(page)
    }
}
