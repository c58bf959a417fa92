//! Match requirement documents against the feature library.
//!
//! A BRD mentions features by name or synonym. Matching is
//! case-insensitive on whole words.

use aitea_core::Feature;
use regex::Regex;
use tracing::{debug, warn};

/// A library feature mentioned in a document.
#[derive(Debug, Clone)]
pub struct BrdMatch<'a> {
    /// Matched feature
    pub feature: &'a Feature,
    /// Number of mentions across name and synonyms; overlapping matches count once
    pub mentions: usize,
    /// Byte offset of the first mention
    pub first_offset: usize,
}

/// Find the features mentioned in `text`, ordered by first mention.
pub fn match_brd<'a>(text: &str, features: &'a [Feature]) -> Vec<BrdMatch<'a>> {
    let mut matches = Vec::new();

    for feature in features {
        let mut spans = Vec::new();
        for term in std::iter::once(&feature.name).chain(&feature.synonyms) {
            let Some(re) = term_regex(term) else {
                continue;
            };
            spans.extend(re.find_iter(text).map(|m| (m.start(), m.end())));
        }

        let merged = merge_spans(spans);
        if let Some(&(first_offset, _)) = merged.first() {
            let mentions = merged.len();
            debug!(feature = %feature.name, mentions, "feature mentioned in BRD");
            matches.push(BrdMatch {
                feature,
                mentions,
                first_offset,
            });
        }
    }

    matches.sort_by(|a, b| {
        a.first_offset
            .cmp(&b.first_offset)
            .then_with(|| a.feature.name.cmp(&b.feature.name))
    });
    matches
}

/// Sort spans and merge overlapping ones.
fn merge_spans(mut spans: Vec<(usize, usize)>) -> Vec<(usize, usize)> {
    spans.sort_unstable();
    let mut merged: Vec<(usize, usize)> = Vec::with_capacity(spans.len());
    for (start, end) in spans {
        match merged.last_mut() {
            Some(last) if start < last.1 => last.1 = last.1.max(end),
            _ => merged.push((start, end)),
        }
    }
    merged
}

fn term_regex(term: &str) -> Option<Regex> {
    let term = term.trim();
    if term.is_empty() {
        return None;
    }

    // Word boundaries only make sense next to word characters ("C++" has none at its end)
    let is_word = |c: char| c.is_alphanumeric() || c == '_';
    let start = if term.starts_with(is_word) { r"\b" } else { "" };
    let end = if term.ends_with(is_word) { r"\b" } else { "" };
    let words: Vec<_> = term.split_whitespace().map(regex::escape).collect();
    let pattern = format!(r"(?i){}{}{}", start, words.join(r"\s+"), end);

    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            warn!(term, error = %e, "skipping unmatchable feature term");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> Vec<Feature> {
        vec![
            Feature::new("User Login", "backend", "development", 6.0).with_synonym("sign-in"),
            Feature::new("Dashboard", "frontend", "development", 12.0),
            Feature::new("Export", "backend", "development", 4.0),
            Feature::new("C++ SDK", "platform", "development", 30.0),
        ]
    }

    #[test]
    fn test_matches_names_and_synonyms_in_order() {
        let features = library();
        let text = "The dashboard shows usage. Users must sign-in first.\n\
                    A user   login page and a DASHBOARD widget are required.";
        let matches = match_brd(text, &features);

        let names: Vec<_> = matches.iter().map(|m| m.feature.name.as_str()).collect();
        assert_eq!(names, vec!["Dashboard", "User Login"]);
        assert_eq!(matches[0].mentions, 2);
        assert_eq!(matches[1].mentions, 2);
    }

    #[test]
    fn test_whole_words_only() {
        let features = library();
        let matches = match_brd("We will reexport the exporter module.", &features);
        assert!(matches.is_empty());
    }

    #[test]
    fn test_terms_with_symbols() {
        let features = library();
        let matches = match_brd("Ship a c++ sdk for partners.", &features);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].feature.name, "C++ SDK");
    }

    #[test]
    fn test_overlapping_synonym_counts_once() {
        let features = vec![Feature::new("User Login", "backend", "development", 6.0).with_synonym("login")];

        let matches = match_brd("Add user login. Later, login via SSO.", &features);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].mentions, 2);
        assert_eq!(matches[0].first_offset, 4);

        let matches = match_brd("user login", &features);
        assert_eq!(matches[0].mentions, 1);
    }
}
