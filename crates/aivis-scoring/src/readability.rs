//! Readability indices, each on its published native scale.
//!
//! All functions take precomputed [`TextStats`] and are total: degenerate
//! input (empty, single word, no punctuation) is handled by the stats
//! denominator guards, so every index returns a finite number. The
//! documented convention for empty input is a fully zeroed report.

use serde::{Deserialize, Serialize};

use crate::text::TextStats;

/// All six indices for one text blob.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadabilityReport {
    /// Flesch Reading Ease, higher is easier, roughly 0–100.
    pub flesch: f64,
    /// Flesch–Kincaid grade level.
    pub flesch_kincaid: f64,
    /// Gunning fog index (grade level).
    pub gunning_fog: f64,
    /// Coleman–Liau index (grade level).
    pub coleman_liau: f64,
    /// Automated Readability Index (grade level).
    pub automated_readability: f64,
    /// SMOG grade.
    pub smog: f64,
}

impl ReadabilityReport {
    const ZERO: ReadabilityReport = ReadabilityReport {
        flesch: 0.0,
        flesch_kincaid: 0.0,
        gunning_fog: 0.0,
        coleman_liau: 0.0,
        automated_readability: 0.0,
        smog: 0.0,
    };
}

/// Compute all indices for a text blob.
///
/// Empty or whitespace-only input returns the zeroed report rather than
/// raising; this is the crate-wide empty-input convention.
#[must_use]
pub fn readability_report(text: &str) -> ReadabilityReport {
    let stats = TextStats::from_text(text);
    report_from_stats(&stats)
}

#[must_use]
pub(crate) fn report_from_stats(stats: &TextStats) -> ReadabilityReport {
    if stats.is_empty() {
        return ReadabilityReport::ZERO;
    }

    ReadabilityReport {
        flesch: flesch_reading_ease(stats),
        flesch_kincaid: flesch_kincaid_grade(stats),
        gunning_fog: gunning_fog(stats),
        coleman_liau: coleman_liau(stats),
        automated_readability: automated_readability_index(stats),
        smog: smog(stats),
    }
}

fn words_per_sentence(stats: &TextStats) -> f64 {
    stats.words_or_one() / stats.sentences_or_one()
}

fn syllables_per_word(stats: &TextStats) -> f64 {
    stats.syllables_f() / stats.words_or_one()
}

#[must_use]
pub fn flesch_reading_ease(stats: &TextStats) -> f64 {
    206.835 - 1.015 * words_per_sentence(stats) - 84.6 * syllables_per_word(stats)
}

#[must_use]
pub fn flesch_kincaid_grade(stats: &TextStats) -> f64 {
    0.39 * words_per_sentence(stats) + 11.8 * syllables_per_word(stats) - 15.59
}

#[must_use]
pub fn gunning_fog(stats: &TextStats) -> f64 {
    let complex_share = 100.0 * stats.complex_words_f() / stats.words_or_one();
    0.4 * (words_per_sentence(stats) + complex_share)
}

#[must_use]
pub fn coleman_liau(stats: &TextStats) -> f64 {
    let letters_per_100 = 100.0 * stats.letters_f() / stats.words_or_one();
    let sentences_per_100 = 100.0 * stats.sentences_or_one() / stats.words_or_one();
    0.0588 * letters_per_100 - 0.296 * sentences_per_100 - 15.8
}

#[must_use]
pub fn automated_readability_index(stats: &TextStats) -> f64 {
    let chars_per_word = stats.letters_f() / stats.words_or_one();
    4.71 * chars_per_word + 0.5 * words_per_sentence(stats) - 21.43
}

#[must_use]
pub fn smog(stats: &TextStats) -> f64 {
    let polysyllables = stats.complex_words_f();
    1.043 * (polysyllables * 30.0 / stats.sentences_or_one()).sqrt() + 3.1291
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_all_finite(report: &ReadabilityReport) {
        for (name, value) in [
            ("flesch", report.flesch),
            ("flesch_kincaid", report.flesch_kincaid),
            ("gunning_fog", report.gunning_fog),
            ("coleman_liau", report.coleman_liau),
            ("automated_readability", report.automated_readability),
            ("smog", report.smog),
        ] {
            assert!(value.is_finite(), "{name} is not finite: {value}");
        }
    }

    #[test]
    fn empty_input_returns_zeroed_report() {
        assert_eq!(readability_report(""), ReadabilityReport::ZERO);
        assert_eq!(readability_report("  \n "), ReadabilityReport::ZERO);
    }

    #[test]
    fn boundary_inputs_are_finite() {
        for input in ["word", "ALL CAPS NO PUNCTUATION", "a.", "?!", "x y z"] {
            assert_all_finite(&readability_report(input));
        }
    }

    #[test]
    fn simple_prose_scores_easier_than_dense_prose() {
        let simple = readability_report("The cat sat. The dog ran. We had fun.");
        let dense = readability_report(
            "Organizational prioritization methodologies necessitate comprehensive \
             interdepartmental communication infrastructures notwithstanding \
             implementation complexities.",
        );
        assert!(
            simple.flesch > dense.flesch,
            "simple {} should beat dense {}",
            simple.flesch,
            dense.flesch
        );
        assert!(simple.gunning_fog < dense.gunning_fog);
        assert!(simple.smog < dense.smog);
    }

    #[test]
    fn flesch_of_plain_sentence_lands_in_easy_range() {
        let report = readability_report("The cat sat on the mat.");
        assert!(
            report.flesch > 90.0,
            "one-syllable prose should score very easy, got {}",
            report.flesch
        );
    }

    #[test]
    fn report_is_deterministic() {
        let text = "Scores must be reproducible. Running twice yields identical values.";
        assert_eq!(readability_report(text), readability_report(text));
    }

    #[test]
    fn smog_is_zero_complex_floor() {
        // No polysyllables: smog reduces to its constant term.
        let report = readability_report("The cat sat on the mat.");
        assert!((report.smog - 3.1291).abs() < 1e-9);
    }
}
