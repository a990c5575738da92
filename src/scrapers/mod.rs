pub mod browser;
pub mod listing;
pub mod retry;
pub mod traits;
pub mod types;

pub use browser::RightmoveBrowser;
pub use listing::ListingCard;
pub use retry::{ensure_connect, RetryPolicy, RetryingDriver};
pub use traits::{DriverError, DriverResult, ExtractionError, ListingHandle, PageDriver};
pub use types::{SiteParams, Selectors};
