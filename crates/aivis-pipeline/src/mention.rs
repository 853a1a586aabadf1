//! Brand mention detection in engine answers.
//!
//! Matching is case-insensitive substring search on word boundaries over a
//! needle set built from the brand row: name, full domain, the domain's
//! first label, and any operator-curated aliases. A needle bordered by
//! alphanumerics does not count, so "acme" never matches inside "macmillan".

use crate::types::BrandFacts;

/// Half-width of the context window cut around the first match, in bytes
/// before char-boundary alignment.
const SNIPPET_RADIUS: usize = 200;

/// The outcome of scanning one answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionContext {
    pub mentioned: bool,
    /// Text around the first match, used for sentiment scoring. `None` when
    /// the brand never appears.
    pub snippet: Option<String>,
}

impl MentionContext {
    #[must_use]
    pub fn absent() -> Self {
        Self {
            mentioned: false,
            snippet: None,
        }
    }
}

/// Compiled needle set for one brand.
#[derive(Debug, Clone)]
pub struct MentionMatcher {
    needles: Vec<String>,
}

impl MentionMatcher {
    /// Builds the needle set from a brand row. Needles are lowercased and
    /// deduplicated; blank aliases are dropped.
    #[must_use]
    pub fn for_brand(brand: &BrandFacts) -> Self {
        let mut needles: Vec<String> = Vec::new();
        let mut push = |candidate: &str| {
            let lowered = candidate.trim().to_lowercase();
            if !lowered.is_empty() && !needles.contains(&lowered) {
                needles.push(lowered);
            }
        };

        push(&brand.name);
        push(&brand.domain);
        if let Some(label) = brand.domain.split('.').next() {
            push(label);
        }
        for alias in &brand.aliases {
            push(alias);
        }

        Self { needles }
    }

    /// Scans `answer` for the first word-bounded occurrence of any needle.
    #[must_use]
    pub fn scan(&self, answer: &str) -> MentionContext {
        let haystack = answer.to_lowercase();
        let mut earliest: Option<(usize, usize)> = None;

        for needle in &self.needles {
            let mut from = 0;
            while let Some(offset) = haystack[from..].find(needle.as_str()) {
                let start = from + offset;
                let end = start + needle.len();
                if word_bounded(&haystack, start, end) {
                    if earliest.is_none_or(|(s, _)| start < s) {
                        earliest = Some((start, end));
                    }
                    break;
                }
                from = end;
            }
        }

        match earliest {
            Some((start, end)) => MentionContext {
                mentioned: true,
                snippet: Some(cut_snippet(&haystack, start, end)),
            },
            None => MentionContext::absent(),
        }
    }
}

fn word_bounded(haystack: &str, start: usize, end: usize) -> bool {
    let before_ok = haystack[..start]
        .chars()
        .next_back()
        .is_none_or(|c| !c.is_alphanumeric());
    let after_ok = haystack[end..]
        .chars()
        .next()
        .is_none_or(|c| !c.is_alphanumeric());
    before_ok && after_ok
}

/// Cuts roughly `SNIPPET_RADIUS` bytes either side of the match, widened
/// outward to the nearest char boundaries.
fn cut_snippet(haystack: &str, start: usize, end: usize) -> String {
    let mut lo = start.saturating_sub(SNIPPET_RADIUS);
    while lo > 0 && !haystack.is_char_boundary(lo) {
        lo -= 1;
    }
    let mut hi = (end + SNIPPET_RADIUS).min(haystack.len());
    while hi < haystack.len() && !haystack.is_char_boundary(hi) {
        hi += 1;
    }
    haystack[lo..hi].to_string()
}
