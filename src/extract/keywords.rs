use std::collections::BTreeMap;

/// Case-insensitive substring test of each keyword against `text`
pub fn scan<'a>(text: &str, keywords: impl IntoIterator<Item = &'a str>) -> BTreeMap<String, bool> {
    let haystack = text.to_lowercase();
    keywords
        .into_iter()
        .map(|keyword| (keyword.to_string(), haystack.contains(&keyword.to_lowercase())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_ignores_case() {
        let hits = scan("Fully Furnished flat", ["fully furnished"]);
        assert!(hits["fully furnished"]);
    }

    #[test]
    fn test_no_partial_word_tricks() {
        let hits = scan("unfurnished", ["fully furnished"]);
        assert!(!hits["fully furnished"]);
    }

    #[test]
    fn test_upper_case_keyword() {
        let hits = scan("off-street parking space", ["Parking Space", "garden"]);
        assert!(hits["Parking Space"]);
        assert!(!hits["garden"]);
    }
}
