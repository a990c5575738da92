//! Turning a listing card into a row
//!
//! Every wanted field is read on its own: a field whose element is missing
//! becomes null and the rest of the row is still filled in.

pub mod format;
pub mod keywords;

pub use format::format_field;
pub use keywords::scan;

use crate::models::{FieldSpec, FieldValue, ListingField, ListingRow, Schema, TEXT_COLUMN};
use crate::scrapers::{ListingHandle, Selectors};
use tracing::debug;

pub struct FieldExtractor {
    spec: FieldSpec,
    selectors: Selectors,
    schema: Schema,
}

impl FieldExtractor {
    pub fn new(spec: FieldSpec, selectors: Selectors) -> Self {
        let schema = spec.schema();
        Self {
            spec,
            selectors,
            schema,
        }
    }

    /// Columns of the rows this extractor produces
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Reads every wanted field of `listing`. Never fails; unreadable fields are null.
    pub fn extract(&self, listing: &impl ListingHandle) -> ListingRow {
        let mut row = ListingRow::new();

        for field in ListingField::ALL {
            if !self.spec.wants(field) {
                continue;
            }
            let value = match listing.find_text(self.selectors.for_field(field)) {
                Ok(text) => format_field(&text),
                Err(e) => {
                    debug!("{} unavailable: {}", field.column(), e);
                    None
                }
            };
            row.set(field.column(), value);
        }

        if self.spec.text {
            self.mine_text(listing, &mut row);
        }

        row
    }

    fn mine_text(&self, listing: &impl ListingHandle, row: &mut ListingRow) {
        match listing.find_text(&self.selectors.description) {
            Ok(text) => {
                let text = text.replace('"', "");
                for (keyword, hit) in scan(&text, self.spec.keywords()) {
                    row.set(keyword, Some(FieldValue::Bool(hit)));
                }
                let text = text.trim();
                let value = (!text.is_empty()).then(|| FieldValue::Text(text.to_string()));
                row.set(TEXT_COLUMN, value);
            }
            Err(e) => {
                debug!("description unavailable: {}", e);
                for keyword in self.spec.keywords() {
                    row.set(keyword, None);
                }
                row.set(TEXT_COLUMN, None);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scrapers::ListingCard;
    use crate::testing::listing_card_html;
    use pretty_assertions::assert_eq;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(FieldSpec::default(), Selectors::default())
    }

    #[test]
    fn test_missing_field_only_nulls_that_field() {
        let html = listing_card_html(
            Some("£350,000"),
            Some("Terraced"),
            None,
            Some("1"),
            Some("Bright home with a parking space"),
        );
        let row = extractor().extract(&ListingCard::from_html(&html));

        assert_eq!(row.get("price"), Some(&FieldValue::Int(350_000)));
        assert_eq!(row.get("property_type"), Some(&"Terraced".into()));
        assert!(row.contains("bedrooms"));
        assert_eq!(row.get("bedrooms"), None);
        assert_eq!(row.get("bathrooms"), Some(&FieldValue::Int(1)));
        assert_eq!(row.get("parking space"), Some(&FieldValue::Bool(true)));
        assert_eq!(row.get("fully furnished"), Some(&FieldValue::Bool(false)));
    }

    #[test]
    fn test_missing_description_nulls_keywords_and_text() {
        let html = listing_card_html(Some("£900"), None, Some("2"), None, None);
        let row = extractor().extract(&ListingCard::from_html(&html));

        assert_eq!(row.get("price"), Some(&FieldValue::Int(900)));
        assert!(row.contains("fully furnished"));
        assert_eq!(row.get("fully furnished"), None);
        assert_eq!(row.get("parking space"), None);
        assert_eq!(row.get("text"), None);
    }

    #[test]
    fn test_description_quotes_are_stripped() {
        let html = listing_card_html(None, None, None, None, Some(r#"A "Fully Furnished" flat"#));
        let row = extractor().extract(&ListingCard::from_html(&html));

        assert_eq!(row.get("text"), Some(&"A Fully Furnished flat".into()));
        assert_eq!(row.get("fully furnished"), Some(&FieldValue::Bool(true)));
    }

    #[test]
    fn test_unwanted_fields_are_skipped() {
        let spec = FieldSpec {
            price: false,
            text: false,
            ..FieldSpec::default()
        };
        let extractor = FieldExtractor::new(spec, Selectors::default());
        let html = listing_card_html(Some("£1"), Some("Flat"), Some("1"), Some("1"), Some("x"));
        let row = extractor.extract(&ListingCard::from_html(&html));

        assert!(!row.contains("price"));
        assert!(!row.contains("text"));
        assert!(!row.contains("parking space"));
        assert_eq!(row.get("property_type"), Some(&"Flat".into()));
    }
}
