//! Contracts for the external collaborators the pipeline suspends on.
//!
//! Engine queries, content extraction, and notification delivery are the only
//! suspension points in a run; everything else is synchronous computation.
//! The traits are object-safe (`BoxFuture`) so orchestrators hold
//! `Arc<dyn …>` handles and tests inject fakes.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::types::RunSummary;

/// Failure of an outbound collaborator call.
#[derive(Debug, Clone, Error)]
pub enum ExternalError {
    /// The per-call deadline elapsed. Retryable.
    #[error("{what}: call timed out")]
    Timeout { what: String },

    /// The collaborator is unreachable or returned a server-side failure. Retryable.
    #[error("{what}: unavailable: {reason}")]
    Unavailable { what: String, reason: String },

    /// The collaborator rejected the call (client error, unknown engine,
    /// unparseable response). Retrying will not change the outcome.
    #[error("{what}: rejected: {reason}")]
    Rejected { what: String, reason: String },
}

impl ExternalError {
    /// `true` for transient conditions worth retrying after a back-off delay.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            ExternalError::Timeout { .. } | ExternalError::Unavailable { .. }
        )
    }
}

/// Queries a third-party AI answer engine: `(engine id, prompt text) -> answer text`.
pub trait EngineQuery: Send + Sync {
    fn query<'a>(
        &'a self,
        engine: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, ExternalError>>;
}

/// Fetches a URL and reduces it to analyzable plain text.
pub trait ContentExtractor: Send + Sync {
    fn extract<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, ExternalError>>;
}

/// Delivers a run summary to the requester.
pub trait Notifier: Send + Sync {
    fn notify<'a>(
        &'a self,
        email: &'a str,
        summary: &'a RunSummary,
    ) -> BoxFuture<'a, Result<(), ExternalError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_and_unavailable_are_retriable() {
        assert!(ExternalError::Timeout {
            what: "engine atlas".to_string()
        }
        .is_retriable());
        assert!(ExternalError::Unavailable {
            what: "extractor".to_string(),
            reason: "connection refused".to_string()
        }
        .is_retriable());
    }

    #[test]
    fn rejected_is_not_retriable() {
        assert!(!ExternalError::Rejected {
            what: "engine atlas".to_string(),
            reason: "unknown engine".to_string()
        }
        .is_retriable());
    }
}
