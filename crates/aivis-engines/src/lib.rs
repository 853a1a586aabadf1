//! HTTP implementations of the outbound collaborators.
//!
//! [`AnswerGateway`] queries configured answer engines, [`PageExtractor`]
//! fetches and strips web pages for content scoring, and the notifiers
//! deliver run summaries. All three implement the `aivis-core` collaborator
//! traits, so everything above this crate can swap in fakes.

pub mod error;
pub mod extract;
pub mod gateway;
pub mod notify;

pub use error::SetupError;
pub use extract::PageExtractor;
pub use gateway::AnswerGateway;
pub use notify::{LogNotifier, WebhookNotifier};
