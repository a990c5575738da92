use thiserror::Error;

/// Failures of the browser-facing side of a crawl
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("Element not found: {selector}")]
    ElementNotFound { selector: String },

    #[error("Browser interaction failed ({action}): {reason}")]
    Interaction { action: String, reason: String },

    #[error("Unexpected page content for {selector}: {content:?}")]
    UnexpectedContent { selector: String, content: String },
}

/// Failure to read one field from a listing. Always absorbed into a null cell.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("No element matches {selector}")]
    Missing { selector: String },

    #[error("Invalid selector {selector}: {reason}")]
    Selector { selector: String, reason: String },
}

pub type DriverResult<T> = Result<T, DriverError>;

/// A listing on a results page whose sub-elements can be read as text
pub trait ListingHandle {
    /// Rendered text of the first element matching `selector`
    fn find_text(&self, selector: &str) -> Result<String, ExtractionError>;
}

/// Navigation over one site's search results.
///
/// Implementations are stateful and blocking; the crawl drives them from a
/// single thread, one page at a time.
pub trait PageDriver {
    /// An open results page
    type Page;
    type Listing: ListingHandle;

    /// Searches for `postcode` and lands on the first results page
    fn open_search(&mut self, postcode: &str) -> DriverResult<Self::Page>;

    /// Number of result pages; 0 when the pagination indicator is blank
    fn page_count(&mut self, page: &Self::Page) -> DriverResult<u32>;

    /// Moves `page` on to the next results page
    fn next_page(&mut self, page: &mut Self::Page) -> DriverResult<()>;

    /// Listings shown on the current page, possibly none
    fn listings(&mut self, page: &Self::Page) -> DriverResult<Vec<Self::Listing>>;
}
