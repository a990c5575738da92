use crate::scrapers::listing::ListingCard;
use crate::scrapers::traits::{DriverError, DriverResult, PageDriver};
use crate::scrapers::types::SiteParams;
use headless_chrome::{Browser, LaunchOptions, Tab};
use std::fmt::Display;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Browser-based driver for Rightmove search results using headless Chrome.
///
/// Each postcode gets a fresh tab. If Chrome stops answering, the browser is
/// dropped and relaunched on the next search.
pub struct RightmoveBrowser {
    params: SiteParams,
    browser: Option<Browser>,
    current: Option<Arc<Tab>>,
}

impl RightmoveBrowser {
    /// Launch Chrome and prepare a driver for `params`
    pub fn new(params: SiteParams) -> DriverResult<Self> {
        let browser = Self::launch(params.headless)?;
        Ok(Self {
            params,
            browser: Some(browser),
            current: None,
        })
    }

    fn launch(headless: bool) -> DriverResult<Browser> {
        info!("Launching {} Chrome...", if headless { "headless" } else { "windowed" });

        let options = LaunchOptions::default_builder()
            .headless(headless)
            .idle_browser_timeout(Duration::from_secs(600))
            .build()
            .map_err(|e| DriverError::Launch(e.to_string()))?;

        Browser::new(options).map_err(|e| DriverError::Launch(e.to_string()))
    }

    fn open_tab(&mut self) -> DriverResult<Arc<Tab>> {
        let browser = match self.browser.take() {
            Some(browser) => browser,
            None => Self::launch(self.params.headless)?,
        };

        match browser.new_tab() {
            Ok(tab) => {
                self.browser = Some(browser);
                Ok(tab)
            }
            Err(e) => {
                warn!("Chrome could not open a tab, it will be relaunched: {}", e);
                Err(interaction("open tab", e))
            }
        }
    }

    fn close_current(&mut self) {
        if let Some(tab) = self.current.take() {
            if let Err(e) = tab.close(true) {
                debug!("Closing previous tab failed: {}", e);
            }
        }
    }

    fn settle(&self) {
        thread::sleep(Duration::from_millis(self.params.settle_delay_ms));
    }

    fn dismiss_cookies(&self, tab: &Tab) {
        let script = format!(
            "const button = document.querySelector({}); if (button) button.click();",
            js_string(&self.params.selectors.cookie_accept)
        );
        if let Err(e) = tab.evaluate(&script, false) {
            debug!("Cookie banner not handled: {}", e);
        }
    }
}

impl PageDriver for RightmoveBrowser {
    type Page = Arc<Tab>;
    type Listing = ListingCard;

    fn open_search(&mut self, postcode: &str) -> DriverResult<Arc<Tab>> {
        self.close_current();
        let tab = self.open_tab()?;
        // Tracked before the search so a failed attempt is closed on the next one
        self.current = Some(Arc::clone(&tab));

        let url = self.params.search_url.clone();
        debug!("Opening {} for {}", url, postcode);
        tab.navigate_to(&url)
            .and_then(|t| t.wait_until_navigated())
            .map_err(|e| DriverError::Navigation {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        self.dismiss_cookies(&tab);

        let selectors = &self.params.selectors;
        let search_box = tab
            .wait_for_element(&selectors.search_box)
            .map_err(|_| not_found(&selectors.search_box))?;
        search_box
            .type_into(postcode)
            .map_err(|e| interaction("type postcode", e))?;
        tab.press_key("Enter")
            .map_err(|e| interaction("submit postcode", e))?;

        let submit = tab
            .wait_for_element(&selectors.submit)
            .map_err(|_| not_found(&selectors.submit))?;
        submit
            .click()
            .map_err(|e| interaction("find properties", e))?;
        tab.wait_until_navigated()
            .map_err(|e| DriverError::Navigation {
                url: url.clone(),
                reason: e.to_string(),
            })?;

        self.settle();
        Ok(tab)
    }

    fn page_count(&mut self, tab: &Arc<Tab>) -> DriverResult<u32> {
        let selector = &self.params.selectors.pagination;
        let element = tab
            .wait_for_element(selector)
            .map_err(|_| not_found(selector))?;
        let text = element
            .get_inner_text()
            .map_err(|e| interaction("read pagination", e))?;
        parse_page_count(selector, &text)
    }

    fn next_page(&mut self, tab: &mut Arc<Tab>) -> DriverResult<()> {
        let selector = &self.params.selectors.next_page;
        let button = tab
            .wait_for_element(selector)
            .map_err(|_| not_found(selector))?;
        button.click().map_err(|e| interaction("next page", e))?;
        self.settle();
        Ok(())
    }

    fn listings(&mut self, tab: &Arc<Tab>) -> DriverResult<Vec<ListingCard>> {
        let script = format!(
            "JSON.stringify(Array.from(document.querySelectorAll({})).map(e => e.outerHTML))",
            js_string(&self.params.selectors.listing)
        );
        let result = tab
            .evaluate(&script, false)
            .map_err(|e| interaction("collect listings", e))?;

        let cards = decode_listings(&self.params.selectors.listing, result.value)?;
        debug!("Found {} property cards on page", cards.len());
        Ok(cards)
    }
}

/// Turns the serialised outer HTML of every listing into cards.
///
/// Only a JSON array of strings counts as a page read; anything else is an
/// error so the page is retried rather than recorded as empty.
pub fn decode_listings(
    selector: &str,
    value: Option<serde_json::Value>,
) -> DriverResult<Vec<ListingCard>> {
    let unexpected = |content: String| DriverError::UnexpectedContent {
        selector: selector.to_string(),
        content,
    };
    let json = match value {
        Some(serde_json::Value::String(json)) => json,
        Some(other) => return Err(unexpected(other.to_string())),
        None => return Err(unexpected("no value returned".to_string())),
    };
    let cards: Vec<String> = serde_json::from_str(&json).map_err(|_| unexpected(json.clone()))?;
    Ok(cards.iter().map(|html| ListingCard::from_html(html)).collect())
}

/// Reads the total from a pagination label such as "1 of 12".
///
/// Blank text means there is nothing to paginate and counts as zero pages.
pub fn parse_page_count(selector: &str, text: &str) -> DriverResult<u32> {
    match text.split_whitespace().last() {
        None => Ok(0),
        Some(last) => last.parse().map_err(|_| DriverError::UnexpectedContent {
            selector: selector.to_string(),
            content: text.to_string(),
        }),
    }
}

fn js_string(s: &str) -> String {
    serde_json::Value::String(s.to_string()).to_string()
}

fn not_found(selector: &str) -> DriverError {
    DriverError::ElementNotFound {
        selector: selector.to_string(),
    }
}

fn interaction(action: &str, e: impl Display) -> DriverError {
    DriverError::Interaction {
        action: action.to_string(),
        reason: e.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_count_reads_last_number() {
        assert_eq!(parse_page_count("p", "1 of 12").unwrap(), 12);
        assert_eq!(parse_page_count("p", "  Page 1\nof 3 ").unwrap(), 3);
    }

    #[test]
    fn test_blank_pagination_is_zero_pages() {
        assert_eq!(parse_page_count("p", "").unwrap(), 0);
        assert_eq!(parse_page_count("p", "  \n").unwrap(), 0);
    }

    #[test]
    fn test_garbled_pagination_is_an_error() {
        let err = parse_page_count("p", "1 of many").unwrap_err();
        assert!(matches!(err, DriverError::UnexpectedContent { .. }));
    }

    #[test]
    fn test_listings_decode_from_outer_html() {
        let value = serde_json::json!(r#"["<div class=\"card\">A</div>","<div>B</div>"]"#);
        let cards = decode_listings(".card", Some(value)).unwrap();
        assert_eq!(cards.len(), 2);
    }

    #[test]
    fn test_empty_results_page_has_no_listings() {
        let cards = decode_listings(".card", Some(serde_json::json!("[]"))).unwrap();
        assert!(cards.is_empty());
    }

    #[test]
    fn test_unreadable_listings_are_an_error() {
        for value in [
            None,
            Some(serde_json::Value::Null),
            Some(serde_json::json!(42)),
            Some(serde_json::json!("not json")),
            Some(serde_json::json!(r#"[1, 2]"#)),
        ] {
            let err = decode_listings(".card", value).unwrap_err();
            assert!(matches!(err, DriverError::UnexpectedContent { .. }));
        }
    }

    #[test]
    #[ignore = "needs a local Chrome"]
    fn test_failed_search_keeps_its_tab_for_closing() {
        let params = SiteParams {
            search_url: "http://127.0.0.1:9/".to_string(),
            ..SiteParams::default()
        };
        let mut browser = RightmoveBrowser::new(params).unwrap();

        assert!(browser.open_search("E1 6AN").is_err());
        let first = browser.current.clone().expect("failed tab is tracked");

        assert!(browser.open_search("E1 6AN").is_err());
        let second = browser.current.clone().expect("failed tab is tracked");
        assert!(!Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_js_string_escapes_quotes() {
        assert_eq!(
            js_string(r#"input[name="q"]"#),
            r#""input[name=\"q\"]""#
        );
    }
}
