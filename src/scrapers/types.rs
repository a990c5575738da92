use crate::models::ListingField;
use serde::{Deserialize, Serialize};

/// Where and how to find things on the Rightmove search pages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteParams {
    /// Entry page holding the location search box
    pub search_url: String,
    /// Run Chrome without a window
    pub headless: bool,
    /// Pause after flipping a page so results can render (milliseconds)
    pub settle_delay_ms: u64,
    pub selectors: Selectors,
}

impl Default for SiteParams {
    fn default() -> Self {
        Self {
            search_url: "https://www.rightmove.co.uk/".to_string(),
            headless: true,
            settle_delay_ms: 1000,
            selectors: Selectors::default(),
        }
    }
}

/// CSS selectors for the search flow and the listing cards
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Selectors {
    /// Cookie banner button, clicked if present
    pub cookie_accept: String,
    pub search_box: String,
    pub submit: String,
    pub pagination: String,
    pub next_page: String,
    pub listing: String,
    pub price: String,
    pub property_type: String,
    pub bedrooms: String,
    pub bathrooms: String,
    pub description: String,
}

impl Default for Selectors {
    fn default() -> Self {
        Self {
            cookie_accept: "#onetrust-accept-btn-handler".to_string(),
            search_box: r#"input[name="typeAheadInputField"]"#.to_string(),
            submit: "#submit".to_string(),
            pagination: "div.pagination-pageSelect".to_string(),
            next_page: "button.pagination-direction--next".to_string(),
            listing: ".l-searchResult.is-list".to_string(),
            price: ".propertyCard-priceValue".to_string(),
            property_type: ".property-information".to_string(),
            bedrooms: ".no-svg-bed-icon + .text".to_string(),
            bathrooms: ".no-svg-bathroom-icon + .text".to_string(),
            description: r#"span[data-test="property-description"] span"#.to_string(),
        }
    }
}

impl Selectors {
    pub fn for_field(&self, field: ListingField) -> &str {
        match field {
            ListingField::Price => &self.price,
            ListingField::PropertyType => &self.property_type,
            ListingField::Bedrooms => &self.bedrooms,
            ListingField::Bathrooms => &self.bathrooms,
        }
    }
}
