use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScoringError {
    /// The input has no analyzable text. Scoring empty content is an error,
    /// not a zero score; the caller decides whether to surface or retry.
    #[error("content has no analyzable text")]
    EmptyContent,

    /// Composite weights must sum to 1.0.
    #[error("score weights must sum to 1.0, got {sum}")]
    InvalidWeights { sum: String },
}
