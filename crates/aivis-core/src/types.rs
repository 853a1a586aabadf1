//! Core domain types shared across the pipeline, persistence, and surfaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Industry vertical a brand competes in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Industry {
    Saas,
    Ecommerce,
    Finance,
    Healthcare,
    Other,
}

impl Industry {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Industry::Saas => "saas",
            Industry::Ecommerce => "ecommerce",
            Industry::Finance => "finance",
            Industry::Healthcare => "healthcare",
            Industry::Other => "other",
        }
    }

    /// Parse a stored industry string. Unrecognized values map to `Other`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "saas" => Industry::Saas,
            "ecommerce" => Industry::Ecommerce,
            "finance" => Industry::Finance,
            "healthcare" => Industry::Healthcare,
            _ => Industry::Other,
        }
    }
}

impl std::fmt::Display for Industry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Categorical sentiment attached to a mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sentiment {
    Negative,
    Neutral,
    Positive,
}

/// Compound scores within this band are considered neutral.
const NEUTRAL_BAND: f64 = 0.05;

impl Sentiment {
    /// Classify a compound polarity in `[-1, 1]` into a category.
    #[must_use]
    pub fn from_compound(compound: f64) -> Self {
        if compound >= NEUTRAL_BAND {
            Sentiment::Positive
        } else if compound <= -NEUTRAL_BAND {
            Sentiment::Negative
        } else {
            Sentiment::Neutral
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Sentiment::Negative => "negative",
            Sentiment::Neutral => "neutral",
            Sentiment::Positive => "positive",
        }
    }

    /// Parse a stored sentiment string. Unrecognized values map to `Neutral`.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "negative" => Sentiment::Negative,
            "positive" => Sentiment::Positive,
            _ => Sentiment::Neutral,
        }
    }
}

impl std::fmt::Display for Sentiment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One accepted domain-analysis submission. Immutable for the run's lifetime.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub domain: String,
    pub requester_email: String,
    pub submitted_at: DateTime<Utc>,
}

/// The outcome of analyzing one (prompt, engine) pair within a run.
///
/// Append-only: corrections are new records, never mutations. Scores are
/// always in `[0, 100]`; `mentioned = false` forces `sentiment = Neutral`
/// and `compound = 0.0` by convention.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptResultSummary {
    pub prompt_id: i64,
    pub engine: String,
    pub mentioned: bool,
    pub sentiment: Sentiment,
    /// Compound polarity of the mention context, `[-1, 1]`.
    pub compound: f64,
    /// Visibility score for the pair, `[0, 100]`.
    pub score: f64,
}

/// What the notification collaborator receives when a run finishes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub domain: String,
    /// Number of (prompt, engine) pairs the run fanned out to.
    pub expected_pairs: usize,
    /// Pairs that produced a summary.
    pub succeeded_pairs: usize,
    /// Pairs that exhausted retries and were recorded as missing.
    pub failed_pairs: usize,
    /// Pairs whose answer mentioned the brand.
    pub mentioned_pairs: usize,
    /// Mean score across succeeded pairs, `[0, 100]`. `None` when no pair succeeded.
    pub mean_score: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn industry_round_trips_through_strings() {
        for industry in [
            Industry::Saas,
            Industry::Ecommerce,
            Industry::Finance,
            Industry::Healthcare,
            Industry::Other,
        ] {
            assert_eq!(Industry::parse(industry.as_str()), industry);
        }
    }

    #[test]
    fn unknown_industry_maps_to_other() {
        assert_eq!(Industry::parse("aerospace"), Industry::Other);
    }

    #[test]
    fn compound_classification_respects_neutral_band() {
        assert_eq!(Sentiment::from_compound(0.0), Sentiment::Neutral);
        assert_eq!(Sentiment::from_compound(0.04), Sentiment::Neutral);
        assert_eq!(Sentiment::from_compound(-0.04), Sentiment::Neutral);
        assert_eq!(Sentiment::from_compound(0.05), Sentiment::Positive);
        assert_eq!(Sentiment::from_compound(-0.05), Sentiment::Negative);
        assert_eq!(Sentiment::from_compound(1.0), Sentiment::Positive);
        assert_eq!(Sentiment::from_compound(-1.0), Sentiment::Negative);
    }

    #[test]
    fn sentiment_serializes_lowercase() {
        let json = serde_json::to_string(&Sentiment::Positive).expect("serialize");
        assert_eq!(json, "\"positive\"");
    }

    #[test]
    fn prompt_result_summary_round_trips_through_json() {
        let summary = PromptResultSummary {
            prompt_id: 7,
            engine: "atlas".to_string(),
            mentioned: true,
            sentiment: Sentiment::Positive,
            compound: 0.62,
            score: 81.0,
        };
        let json = serde_json::to_string(&summary).expect("serialize");
        let back: PromptResultSummary = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, summary);
    }
}
