//! Synchronous input validation for intake and content-scoring submissions.
//!
//! A submission that fails validation is rejected before anything enters the
//! pipeline; validation errors are never retried.

use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} must not be empty")]
    Empty(&'static str),

    #[error("invalid domain: {0}")]
    InvalidDomain(String),

    #[error("invalid email: {0}")]
    InvalidEmail(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

static DOMAIN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)+$")
        .expect("domain regex is valid")
});

static EMAIL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex is valid"));

/// Validate one `{domain, email}` intake submission.
///
/// # Errors
///
/// Returns the first [`ValidationError`] encountered; the caller surfaces it
/// synchronously and does not queue a run.
pub fn validate_submission(domain: &str, email: &str) -> Result<(), ValidationError> {
    let domain = domain.trim();
    if domain.is_empty() {
        return Err(ValidationError::Empty("domain"));
    }
    if !DOMAIN_RE.is_match(domain) {
        return Err(ValidationError::InvalidDomain(domain.to_string()));
    }

    let email = email.trim();
    if email.is_empty() {
        return Err(ValidationError::Empty("email"));
    }
    if !EMAIL_RE.is_match(email) {
        return Err(ValidationError::InvalidEmail(email.to_string()));
    }

    Ok(())
}

/// Validate a URL submitted for content scoring. Only http(s) is accepted.
///
/// # Errors
///
/// Returns [`ValidationError::InvalidUrl`] if the URL has no http(s) scheme
/// or no host component.
pub fn validate_url(url: &str) -> Result<(), ValidationError> {
    let url = url.trim();
    if url.is_empty() {
        return Err(ValidationError::Empty("url"));
    }
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"))
        .ok_or_else(|| ValidationError::InvalidUrl(url.to_string()))?;
    let host = rest.split(['/', '?', '#']).next().unwrap_or_default();
    if host.is_empty() || !host.contains('.') {
        return Err(ValidationError::InvalidUrl(url.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_domain_and_email() {
        assert_eq!(validate_submission("example.com", "a@b.co"), Ok(()));
    }

    #[test]
    fn accepts_subdomains_and_mixed_case() {
        assert_eq!(
            validate_submission("App.Example.co.uk", "Dev.Team+x@example.io"),
            Ok(())
        );
    }

    #[test]
    fn rejects_empty_fields() {
        assert_eq!(
            validate_submission("", "a@b.co"),
            Err(ValidationError::Empty("domain"))
        );
        assert_eq!(
            validate_submission("example.com", "   "),
            Err(ValidationError::Empty("email"))
        );
    }

    #[test]
    fn rejects_bare_host_without_tld() {
        assert!(matches!(
            validate_submission("localhost", "a@b.co"),
            Err(ValidationError::InvalidDomain(_))
        ));
    }

    #[test]
    fn rejects_domain_with_scheme() {
        assert!(matches!(
            validate_submission("https://example.com", "a@b.co"),
            Err(ValidationError::InvalidDomain(_))
        ));
    }

    #[test]
    fn rejects_email_without_at_or_tld() {
        assert!(matches!(
            validate_submission("example.com", "not-an-email"),
            Err(ValidationError::InvalidEmail(_))
        ));
        assert!(matches!(
            validate_submission("example.com", "a@b"),
            Err(ValidationError::InvalidEmail(_))
        ));
    }

    #[test]
    fn url_requires_http_scheme_and_host() {
        assert_eq!(validate_url("https://example.com/page?x=1"), Ok(()));
        assert_eq!(validate_url("http://example.com"), Ok(()));
        assert!(matches!(
            validate_url("ftp://example.com"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert!(matches!(
            validate_url("https:///nohost"),
            Err(ValidationError::InvalidUrl(_))
        ));
        assert_eq!(validate_url(""), Err(ValidationError::Empty("url")));
    }
}
