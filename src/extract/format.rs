use crate::models::FieldValue;
use regex::Regex;
use std::sync::OnceLock;

/// Newline followed by digits: a counter Rightmove renders under some fields
fn render_artifact() -> &'static Regex {
    static ARTIFACT: OnceLock<Regex> = OnceLock::new();
    ARTIFACT.get_or_init(|| Regex::new(r"\n\d+").expect("static pattern"))
}

/// Normalises the text of a listing field.
///
/// Quotes, pound signs (including their mis-decoded `Â` prefix) and thousands
/// separators are stripped along with the rendering artifact, then the result
/// becomes an integer when it parses as one. Blank text is `None`.
pub fn format_field(raw: &str) -> Option<FieldValue> {
    let stripped: String = raw
        .chars()
        .filter(|c| !matches!(c, '"' | '£' | 'Â' | ','))
        .collect();
    let cleaned = render_artifact().replace_all(&stripped, "");
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return None;
    }
    Some(match cleaned.parse::<i64>() {
        Ok(n) => FieldValue::Int(n),
        Err(_) => FieldValue::Text(cleaned.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_becomes_integer() {
        assert_eq!(format_field("£1,250"), Some(FieldValue::Int(1250)));
        assert_eq!(format_field("Â£350,000"), Some(FieldValue::Int(350_000)));
    }

    #[test]
    fn test_words_pass_through() {
        assert_eq!(format_field("Studio"), Some("Studio".into()));
        assert_eq!(
            format_field("\"Semi-Detached\" house"),
            Some("Semi-Detached house".into())
        );
    }

    #[test]
    fn test_render_artifact_is_removed() {
        assert_eq!(format_field("3\n12"), Some(FieldValue::Int(3)));
        assert_eq!(format_field("Flat\n4"), Some("Flat".into()));
    }

    #[test]
    fn test_reformatting_an_integer_is_a_noop() {
        let once = format_field("£1,250").unwrap();
        assert_eq!(format_field(&once.to_string()), Some(once));
    }

    #[test]
    fn test_blank_is_none() {
        assert_eq!(format_field(""), None);
        assert_eq!(format_field(" \"\" "), None);
    }
}
