//! Scoring primitives for aivis.
//!
//! Pure, stateless functions: readability indices on their native scales, a
//! lexicon sentiment scorer, and the deterministic composite content score.
//! Same input, same output: no randomness, no external state.

pub mod composite;
pub mod error;
pub mod readability;
pub mod sentiment;
pub mod text;

pub use composite::{score_content, ContentScore, ScoreWeights};
pub use error::ScoringError;
pub use readability::{readability_report, ReadabilityReport};
pub use sentiment::{sentiment_scores, SentimentScores};
pub use text::TextStats;
