//! The composite content score: readability and sentiment folded onto one
//! bounded 0–100 scale.
//!
//! Each raw metric is mapped onto a common "ease" scale with a fixed linear
//! mapping, clamped at the bounds; the composite is a fixed weighted average.
//! Scoring is deterministic: the same text always yields bit-identical output.

use serde::{Deserialize, Serialize};

use crate::error::ScoringError;
use crate::readability::{report_from_stats, ReadabilityReport};
use crate::sentiment::{sentiment_scores, SentimentScores};
use crate::text::TextStats;

/// Grade-level metrics map linearly onto ease: grade 5 → 100, grade 20 → 0.
const GRADE_EASY: f64 = 5.0;
const GRADE_HARD: f64 = 20.0;

/// Weights for the composite. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreWeights {
    pub readability: f64,
    pub sentiment: f64,
}

impl Default for ScoreWeights {
    fn default() -> Self {
        Self {
            readability: 0.6,
            sentiment: 0.4,
        }
    }
}

impl ScoreWeights {
    /// # Errors
    ///
    /// Returns [`ScoringError::InvalidWeights`] when the weights do not sum
    /// to 1.0 (within floating-point tolerance).
    pub fn validate(self) -> Result<Self, ScoringError> {
        let sum = self.readability + self.sentiment;
        if (sum - 1.0).abs() > 1e-9 {
            return Err(ScoringError::InvalidWeights {
                sum: format!("{sum}"),
            });
        }
        Ok(self)
    }
}

/// One scored content artifact: the composite plus its subscores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentScore {
    /// Weighted composite, `[0, 100]`.
    pub composite: f64,
    /// Mean normalized readability ease, `[0, 100]`.
    pub readability_ease: f64,
    /// Normalized sentiment favorability, `[0, 100]`.
    pub sentiment_favorability: f64,
    pub readability: ReadabilityReport,
    pub sentiment: SentimentScores,
}

/// Map a compound polarity in `[-1, 1]` onto the 0–100 favorability scale.
#[must_use]
pub fn favorability(compound: f64) -> f64 {
    ((compound + 1.0) / 2.0 * 100.0).clamp(0.0, 100.0)
}

fn grade_to_ease(grade: f64) -> f64 {
    ((GRADE_HARD - grade) / (GRADE_HARD - GRADE_EASY) * 100.0).clamp(0.0, 100.0)
}

fn readability_ease(report: &ReadabilityReport) -> f64 {
    let eases = [
        report.flesch.clamp(0.0, 100.0),
        grade_to_ease(report.flesch_kincaid),
        grade_to_ease(report.gunning_fog),
        grade_to_ease(report.coleman_liau),
        grade_to_ease(report.automated_readability),
        grade_to_ease(report.smog),
    ];
    let sum: f64 = eases.iter().sum();
    #[allow(clippy::cast_precision_loss)]
    let denom = eases.len() as f64;
    sum / denom
}

/// Score one content artifact.
///
/// # Errors
///
/// Returns [`ScoringError::EmptyContent`] when the text has no analyzable
/// words; an empty extraction must surface, not score as zero. Returns
/// [`ScoringError::InvalidWeights`] for weights that do not sum to 1.0.
pub fn score_content(text: &str, weights: ScoreWeights) -> Result<ContentScore, ScoringError> {
    let weights = weights.validate()?;

    let stats = TextStats::from_text(text);
    if stats.is_empty() {
        return Err(ScoringError::EmptyContent);
    }

    let readability = report_from_stats(&stats);
    let sentiment = sentiment_scores(text);

    let readability_ease = readability_ease(&readability);
    let sentiment_favorability = favorability(sentiment.compound);
    let composite = (weights.readability * readability_ease
        + weights.sentiment * sentiment_favorability)
        .clamp(0.0, 100.0);

    Ok(ContentScore {
        composite,
        readability_ease,
        sentiment_favorability,
        readability,
        sentiment,
    })
}
