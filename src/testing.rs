//! Scripted collaborators for exercising a crawl without a browser

use crate::models::{PostcodeRecord, PostcodeSample};
use crate::operator::{Intervention, OperatorIntervention};
use crate::scrapers::{DriverError, DriverResult, ListingCard, PageDriver};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// HTML of a search result card laid out like Rightmove's, with any field omitted
pub fn listing_card_html(
    price: Option<&str>,
    property_type: Option<&str>,
    bedrooms: Option<&str>,
    bathrooms: Option<&str>,
    description: Option<&str>,
) -> String {
    let mut html = String::from(r#"<div class="l-searchResult is-list">"#);
    if let Some(price) = price {
        html.push_str(&format!(r#"<div class="propertyCard-priceValue">{}</div>"#, price));
    }
    if let Some(kind) = property_type {
        html.push_str(&format!(r#"<h2 class="property-information">{}</h2>"#, kind));
    }
    if let Some(beds) = bedrooms {
        html.push_str(&format!(
            r#"<span class="no-svg-bed-icon"></span><span class="text">{}</span>"#,
            beds
        ));
    }
    if let Some(baths) = bathrooms {
        html.push_str(&format!(
            r#"<span class="no-svg-bathroom-icon"></span><span class="text">{}</span>"#,
            baths
        ));
    }
    if let Some(text) = description {
        html.push_str(&format!(
            r#"<span data-test="property-description"><span>{}</span></span>"#,
            text
        ));
    }
    html.push_str("</div>");
    html
}

/// Builds a sample from `(region, postcodes)` pairs
pub fn sample_of(regions: &[(&str, &[&str])]) -> PostcodeSample {
    PostcodeSample::from_records(
        regions
            .iter()
            .flat_map(|(region, postcodes)| {
                postcodes
                    .iter()
                    .map(move |pc| PostcodeRecord::new(*pc, *region))
            })
            .collect(),
    )
}

/// Where a scripted driver should fail
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FailAt {
    Open { postcode: String },
    PageCount { postcode: String },
    Listings { postcode: String, page: u32 },
}

/// A call made against a scripted driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverCall {
    OpenSearch(String),
    PageCount(String),
    NextPage { postcode: String, to: u32 },
    Listings { postcode: String, page: u32 },
}

/// Results page position of a scripted driver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptedPage {
    pub postcode: String,
    pub page: u32,
}

/// Serves canned result pages per postcode and fails on request
#[derive(Debug, Default)]
pub struct ScriptedDriver {
    results: HashMap<String, Vec<Vec<String>>>,
    no_pagination: HashSet<String>,
    failures: Vec<(FailAt, u32)>,
    calls: Vec<DriverCall>,
}

impl ScriptedDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pages of card HTML returned for `postcode`, first page first
    pub fn with_results(mut self, postcode: &str, pages: Vec<Vec<String>>) -> Self {
        self.results.insert(postcode.to_string(), pages);
        self
    }

    /// Makes the pagination indicator absent for `postcode`
    pub fn without_pagination(mut self, postcode: &str) -> Self {
        self.no_pagination.insert(postcode.to_string());
        self
    }

    /// Fails `times` times at `at`; `u32::MAX` fails forever
    pub fn failing(mut self, at: FailAt, times: u32) -> Self {
        self.failures.push((at, times));
        self
    }

    pub fn calls(&self) -> &[DriverCall] {
        &self.calls
    }

    fn trip(&mut self, at: FailAt) -> DriverResult<()> {
        let Some((_, remaining)) = self
            .failures
            .iter_mut()
            .find(|(point, remaining)| *point == at && *remaining > 0)
        else {
            return Ok(());
        };
        if *remaining != u32::MAX {
            *remaining -= 1;
        }
        Err(DriverError::Interaction {
            action: format!("{:?}", at),
            reason: "scripted failure".to_string(),
        })
    }

    fn pages_of(&self, postcode: &str) -> &[Vec<String>] {
        self.results.get(postcode).map(Vec::as_slice).unwrap_or(&[])
    }
}

impl PageDriver for ScriptedDriver {
    type Page = ScriptedPage;
    type Listing = ListingCard;

    fn open_search(&mut self, postcode: &str) -> DriverResult<ScriptedPage> {
        self.calls.push(DriverCall::OpenSearch(postcode.to_string()));
        self.trip(FailAt::Open {
            postcode: postcode.to_string(),
        })?;
        Ok(ScriptedPage {
            postcode: postcode.to_string(),
            page: 1,
        })
    }

    fn page_count(&mut self, page: &ScriptedPage) -> DriverResult<u32> {
        self.calls.push(DriverCall::PageCount(page.postcode.clone()));
        self.trip(FailAt::PageCount {
            postcode: page.postcode.clone(),
        })?;
        if self.no_pagination.contains(&page.postcode) {
            return Err(DriverError::ElementNotFound {
                selector: "pagination".to_string(),
            });
        }
        Ok(self.pages_of(&page.postcode).len() as u32)
    }

    fn next_page(&mut self, page: &mut ScriptedPage) -> DriverResult<()> {
        let to = page.page + 1;
        self.calls.push(DriverCall::NextPage {
            postcode: page.postcode.clone(),
            to,
        });
        if to as usize > self.pages_of(&page.postcode).len() {
            return Err(DriverError::ElementNotFound {
                selector: "next page".to_string(),
            });
        }
        page.page = to;
        Ok(())
    }

    fn listings(&mut self, page: &ScriptedPage) -> DriverResult<Vec<ListingCard>> {
        self.calls.push(DriverCall::Listings {
            postcode: page.postcode.clone(),
            page: page.page,
        });
        self.trip(FailAt::Listings {
            postcode: page.postcode.clone(),
            page: page.page,
        })?;
        let cards: Vec<ListingCard> = self
            .pages_of(&page.postcode)
            .get(page.page as usize - 1)
            .map(|cards| cards.iter().map(|html| ListingCard::from_html(html)).collect())
            .unwrap_or_default();
        Ok(cards)
    }
}

/// Answers operator prompts from a script, then with a fallback
#[derive(Debug)]
pub struct ScriptedOperator {
    responses: Mutex<VecDeque<Intervention>>,
    fallback: Intervention,
    prompts: AtomicUsize,
}

impl ScriptedOperator {
    pub fn always(answer: Intervention) -> Self {
        Self::with_responses([], answer)
    }

    pub fn with_responses(
        responses: impl IntoIterator<Item = Intervention>,
        fallback: Intervention,
    ) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            fallback,
            prompts: AtomicUsize::new(0),
        }
    }

    /// How many times the operator was asked
    pub fn prompts(&self) -> usize {
        self.prompts.load(Ordering::SeqCst)
    }
}

impl OperatorIntervention for ScriptedOperator {
    fn intervene(&self, _problem: &str) -> Intervention {
        self.prompts.fetch_add(1, Ordering::SeqCst);
        self.responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front())
            .unwrap_or(self.fallback)
    }
}
