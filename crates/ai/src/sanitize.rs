//! Output sanitization and acceptance checks.

use once_cell::sync::Lazy;
use regex::Regex;

/// Boilerplate phrases models like to echo back.
const BOILERPLATE: &[&str] = &["--- Begin Detailed Architecture Plan ---", "Answer:"];

static HEADING_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?m)^#+\s*").expect("heading regex is valid"));

/// Strip instructional artifacts and isolate the content after `marker`.
///
/// Boilerplate phrases and heading markup at line starts are removed, the text is
/// trimmed, and if `marker` occurs only the text after its first occurrence is
/// kept.
pub fn sanitize(text: &str, marker: &str) -> String {
    let mut cleaned = text.to_string();
    for phrase in BOILERPLATE {
        cleaned = cleaned.replace(phrase, "");
    }
    let cleaned = HEADING_PREFIX.replace_all(&cleaned, "");
    let cleaned = cleaned.trim();

    match cleaned.split_once(marker) {
        Some((_, after)) if !marker.is_empty() => after.trim().to_string(),
        _ => cleaned.to_string(),
    }
}

/// Heuristic acceptance check for a sanitized document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptanceCriteria {
    /// Document must be strictly longer than this many characters.
    pub min_chars: usize,
    /// Lowercase terms that must all appear.
    pub required_terms: Vec<String>,
}

impl Default for AcceptanceCriteria {
    fn default() -> Self {
        Self {
            min_chars: 500,
            required_terms: ["scalability", "security", "technology"]
                .into_iter()
                .map(String::from)
                .collect(),
        }
    }
}

impl AcceptanceCriteria {
    pub fn accepts(&self, text: &str) -> bool {
        if text.chars().count() <= self.min_chars {
            return false;
        }
        let lower = text.to_lowercase();
        self.required_terms.iter().all(|t| lower.contains(t.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn strips_heading_boilerplate_and_prefix_before_marker() {
        let input = "### Heading\n--- Begin Detailed Architecture Plan ---\nMARKERtext after marker";
        assert_eq!(sanitize(input, "MARKER"), "text after marker");
    }

    #[test]
    fn keeps_everything_without_marker() {
        let input = "## Overview\nAnswer: a layered design\n# Data\nPostgres";
        assert_eq!(
            sanitize(input, crate::MARKER),
            "Overview\n a layered design\nData\nPostgres"
        );
    }

    #[test]
    fn splits_on_first_marker_only() {
        let input = "echo M body M tail";
        assert_eq!(sanitize(input, "M"), "body M tail");
    }

    #[test]
    fn heading_markup_only_at_line_start() {
        assert_eq!(sanitize("C# and F# are fine", "@@"), "C# and F# are fine");
    }

    fn document(len: usize) -> String {
        let mut doc = String::from("Scalability, Security and Technology choices. ");
        while doc.chars().count() < len {
            doc.push('x');
        }
        doc
    }

    #[test]
    fn accepts_long_document_with_all_terms() {
        let c = AcceptanceCriteria::default();
        assert!(c.accepts(&document(501)));
        assert!(!c.accepts(&document(500)));
    }

    #[test]
    fn rejects_missing_terms() {
        let c = AcceptanceCriteria::default();
        let text = format!("scalability and security {}", "y".repeat(600));
        assert!(!c.accepts(&text));
    }

    proptest! {
        #[test]
        fn marker_isolates_tail(head in "[a-z \n]{0,40}", tail in "[a-z ]{0,40}") {
            let input = format!("{head}<<<ARCHITECTURE_START>>>{tail}");
            prop_assert_eq!(sanitize(&input, crate::MARKER), tail.trim().to_string());
        }

        #[test]
        fn short_texts_never_accepted(text in ".{0,500}") {
            prop_assert!(!AcceptanceCriteria::default().accepts(&text));
        }
    }
}
