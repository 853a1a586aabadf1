use thiserror::Error;

/// Construction-time failure of an HTTP collaborator. Call-time failures
/// surface as [`aivis_core::ExternalError`] through the trait methods.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("engine '{engine}' has an invalid endpoint '{endpoint}': {reason}")]
    InvalidEndpoint {
        engine: String,
        endpoint: String,
        reason: String,
    },

    #[error("invalid webhook URL '{url}': {reason}")]
    InvalidWebhook { url: String, reason: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}
