//! HTTP client for configured answer engines.
//!
//! Each engine in the catalog exposes a gateway endpoint taking
//! `POST {"prompt": ...}` and answering `{"answer": ...}`. The gateway maps
//! transport failures onto the shared [`ExternalError`] taxonomy so the
//! orchestrator can decide retriability without knowing about `reqwest`.

use std::collections::HashMap;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};

use aivis_core::{EngineCatalog, EngineQuery, ExternalError};

use crate::error::SetupError;

const CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Serialize)]
struct QueryBody<'a> {
    prompt: &'a str,
}

#[derive(Deserialize)]
struct AnswerBody {
    answer: String,
}

struct Endpoint {
    url: Url,
    timeout: Duration,
}

/// [`EngineQuery`] implementation over the engine catalog.
pub struct AnswerGateway {
    client: Client,
    endpoints: HashMap<String, Endpoint>,
}

impl AnswerGateway {
    /// Builds a gateway from the catalog. Engines keep their per-call
    /// timeout override; the rest use `default_timeout_secs`.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if an endpoint does not parse as a URL or the
    /// HTTP client cannot be constructed.
    pub fn from_catalog(
        catalog: &EngineCatalog,
        default_timeout_secs: u64,
    ) -> Result<Self, SetupError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(concat!("aivis/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let mut endpoints = HashMap::with_capacity(catalog.engines.len());
        for spec in &catalog.engines {
            let url = Url::parse(&spec.endpoint).map_err(|e| SetupError::InvalidEndpoint {
                engine: spec.id.clone(),
                endpoint: spec.endpoint.clone(),
                reason: e.to_string(),
            })?;
            endpoints.insert(
                spec.id.clone(),
                Endpoint {
                    url,
                    timeout: Duration::from_secs(spec.timeout_secs.unwrap_or(default_timeout_secs)),
                },
            );
        }

        Ok(Self { client, endpoints })
    }

    async fn query_engine(&self, engine: &str, prompt: &str) -> Result<String, ExternalError> {
        let what = format!("engine {engine}");
        let endpoint = self
            .endpoints
            .get(engine)
            .ok_or_else(|| ExternalError::Rejected {
                what: what.clone(),
                reason: "engine is not in the catalog".to_string(),
            })?;

        let response = self
            .client
            .post(endpoint.url.clone())
            .timeout(endpoint.timeout)
            .json(&QueryBody { prompt })
            .send()
            .await
            .map_err(|e| map_transport_error(&what, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(&what, status));
        }

        let body: AnswerBody = response
            .json()
            .await
            .map_err(|e| ExternalError::Rejected {
                what: what.clone(),
                reason: format!("unparseable answer body: {e}"),
            })?;

        Ok(body.answer)
    }
}

impl EngineQuery for AnswerGateway {
    fn query<'a>(
        &'a self,
        engine: &'a str,
        prompt: &'a str,
    ) -> BoxFuture<'a, Result<String, ExternalError>> {
        self.query_engine(engine, prompt).boxed()
    }
}

pub(crate) fn map_transport_error(what: &str, err: &reqwest::Error) -> ExternalError {
    if err.is_timeout() {
        ExternalError::Timeout {
            what: what.to_string(),
        }
    } else if err.is_connect() {
        ExternalError::Unavailable {
            what: what.to_string(),
            reason: "connection failed".to_string(),
        }
    } else {
        ExternalError::Rejected {
            what: what.to_string(),
            reason: err.to_string(),
        }
    }
}

pub(crate) fn map_status(what: &str, status: StatusCode) -> ExternalError {
    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        ExternalError::Unavailable {
            what: what.to_string(),
            reason: format!("HTTP {status}"),
        }
    } else {
        ExternalError::Rejected {
            what: what.to_string(),
            reason: format!("HTTP {status}"),
        }
    }
}
