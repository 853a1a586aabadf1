//! Page fetcher and HTML-to-text stripper for content scoring.
//!
//! The scorer wants prose, not markup. Script and style blocks vanish
//! wholesale, remaining tags become spaces, the common entities decode, and
//! whitespace collapses. Empty or markup-only bodies come back as an empty
//! string; the scorer turns that into its empty-content error.

use std::sync::LazyLock;
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;
use regex::Regex;
use reqwest::Client;

use aivis_core::{ContentExtractor, ExternalError};

use crate::error::SetupError;
use crate::gateway::{map_status, map_transport_error};

static SCRIPT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script\b[^>]*>.*?</script>").expect("valid regex"));
static STYLE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style\b[^>]*>.*?</style>").expect("valid regex"));
static TAG_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static WHITESPACE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// [`ContentExtractor`] implementation over plain HTTP GET.
pub struct PageExtractor {
    client: Client,
}

impl PageExtractor {
    /// # Errors
    ///
    /// Returns [`SetupError::Http`] if the HTTP client cannot be built.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, SetupError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;
        Ok(Self { client })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, ExternalError> {
        let what = format!("page {url}");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| map_transport_error(&what, &e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(map_status(&what, status));
        }

        let body = response
            .text()
            .await
            .map_err(|e| map_transport_error(&what, &e))?;

        Ok(html_to_text(&body))
    }
}

impl ContentExtractor for PageExtractor {
    fn extract<'a>(&'a self, url: &'a str) -> BoxFuture<'a, Result<String, ExternalError>> {
        self.fetch_text(url).boxed()
    }
}

/// Strips markup from an HTML document, leaving collapsed prose.
#[must_use]
pub fn html_to_text(html: &str) -> String {
    let without_scripts = SCRIPT_RE.replace_all(html, " ");
    let without_styles = STYLE_RE.replace_all(&without_scripts, " ");
    let without_tags = TAG_RE.replace_all(&without_styles, " ");
    let decoded = decode_entities(&without_tags);
    WHITESPACE_RE.replace_all(&decoded, " ").trim().to_string()
}

fn decode_entities(text: &str) -> String {
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
