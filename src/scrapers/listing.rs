use crate::scrapers::traits::{ExtractionError, ListingHandle};
use scraper::{ElementRef, Html, Selector};

/// Snapshot of one search result card, taken from its outer HTML
#[derive(Debug)]
pub struct ListingCard {
    html: Html,
}

impl ListingCard {
    pub fn from_html(html: &str) -> Self {
        Self {
            html: Html::parse_fragment(html),
        }
    }
}

impl ListingHandle for ListingCard {
    fn find_text(&self, selector: &str) -> Result<String, ExtractionError> {
        let parsed = Selector::parse(selector).map_err(|e| ExtractionError::Selector {
            selector: selector.to_string(),
            reason: format!("{:?}", e),
        })?;
        let element = self
            .html
            .select(&parsed)
            .next()
            .ok_or_else(|| ExtractionError::Missing {
                selector: selector.to_string(),
            })?;
        Ok(rendered_text(element))
    }
}

/// Text of an element roughly as a browser renders it: runs of whitespace
/// collapse to one space, line breaks survive, blank lines are dropped.
pub fn rendered_text(element: ElementRef<'_>) -> String {
    let raw: String = element.text().collect();
    raw.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::types::Selectors;

    const CARD: &str = r#"
        <div class="l-searchResult is-list">
          <div class="propertyCard-priceValue">
            £350,000
          </div>
          <h2 class="property-information">Flat</h2>
          <div class="no-svg-bed-icon"></div><span class="text">2</span>
          <span data-test="property-description">
            <span>A <b>Fully Furnished</b>   flat with
            parking space</span>
          </span>
        </div>"#;

    #[test]
    fn test_reads_field_text() {
        let card = ListingCard::from_html(CARD);
        let selectors = Selectors::default();

        assert_eq!(card.find_text(&selectors.price).unwrap(), "£350,000");
        assert_eq!(card.find_text(&selectors.bedrooms).unwrap(), "2");
        assert_eq!(
            card.find_text(&selectors.description).unwrap(),
            "A Fully Furnished flat with\nparking space"
        );
    }

    #[test]
    fn test_missing_element_is_an_error() {
        let card = ListingCard::from_html(CARD);
        let selectors = Selectors::default();

        let err = card.find_text(&selectors.bathrooms).unwrap_err();
        assert!(matches!(err, ExtractionError::Missing { .. }));
    }

    #[test]
    fn test_invalid_selector_is_an_error() {
        let card = ListingCard::from_html(CARD);
        let err = card.find_text("div[[").unwrap_err();
        assert!(matches!(err, ExtractionError::Selector { .. }));
    }
}
