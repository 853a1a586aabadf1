//! Run-completion notifiers.
//!
//! [`WebhookNotifier`] POSTs the summary to a configured URL;
//! [`LogNotifier`] writes it to the log for deployments with no webhook.

use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, Url};
use serde::Serialize;

use aivis_core::{ExternalError, Notifier, RunSummary};

use crate::error::SetupError;
use crate::gateway::{map_status, map_transport_error};

const WEBHOOK_TIMEOUT_SECS: u64 = 15;

#[derive(Serialize)]
struct WebhookBody<'a> {
    email: &'a str,
    summary: &'a RunSummary,
}

pub struct WebhookNotifier {
    client: Client,
    url: Url,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns [`SetupError`] if the URL does not parse or the HTTP client
    /// cannot be built.
    pub fn new(url: &str) -> Result<Self, SetupError> {
        let parsed = Url::parse(url).map_err(|e| SetupError::InvalidWebhook {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let client = Client::builder()
            .timeout(Duration::from_secs(WEBHOOK_TIMEOUT_SECS))
            .user_agent(concat!("aivis/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            url: parsed,
        })
    }

    async fn post(&self, email: &str, summary: &RunSummary) -> Result<(), ExternalError> {
        let what = "notification webhook".to_string();
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookBody { email, summary })
            .send()
            .await
            .map_err(|e| map_transport_error(&what, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(&what, status));
        }
        Ok(())
    }
}

impl Notifier for WebhookNotifier {
    fn notify<'a>(
        &'a self,
        email: &'a str,
        summary: &'a RunSummary,
    ) -> BoxFuture<'a, Result<(), ExternalError>> {
        self.post(email, summary).boxed()
    }
}

/// Log-only notifier for deployments without a configured webhook.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify<'a>(
        &'a self,
        email: &'a str,
        summary: &'a RunSummary,
    ) -> BoxFuture<'a, Result<(), ExternalError>> {
        async move {
            tracing::info!(
                email,
                run_id = %summary.run_id,
                domain = %summary.domain,
                succeeded = summary.succeeded_pairs,
                failed = summary.failed_pairs,
                mentioned = summary.mentioned_pairs,
                mean_score = ?summary.mean_score,
                "analysis run finished"
            );
            Ok(())
        }
        .boxed()
    }
}
