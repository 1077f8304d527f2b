//! Base url configuration.
//!
//! # Design
//! The base url is read through the `BaseUrlProvider` capability instead of a
//! process-wide global. The application builds one `ApiOptions` at its root
//! and hands the same `Arc` to every client, which keeps the "configure once"
//! ergonomics without hidden coupling between clients.

use std::env;
use std::time::Duration;

use crate::error::ApiError;

/// Environment variable holding the base url for relative endpoints.
pub const URL_ENV: &str = "RESOURCE_API_URL";

/// Environment variable holding the default request timeout in milliseconds.
pub const TIMEOUT_ENV: &str = "RESOURCE_API_TIMEOUT_MS";

/// Timeout applied to every call unless a client overrides it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Supplies the base url that relative endpoint templates are appended to.
pub trait BaseUrlProvider: Send + Sync {
    /// Returns the base url, always terminated by `/`.
    ///
    /// Fails with `ApiError::MissingEndpoint` when nothing is configured.
    fn base_url(&self) -> Result<String, ApiError>;

    /// Timeout used by clients that do not set their own.
    fn default_timeout(&self) -> Duration {
        DEFAULT_TIMEOUT
    }
}

/// Application-level options shared by all resource clients.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApiOptions {
    url: String,
    timeout: Option<Duration>,
}

impl ApiOptions {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.trim().to_string(),
            timeout: None,
        }
    }

    /// Reads `RESOURCE_API_URL` and `RESOURCE_API_TIMEOUT_MS`.
    ///
    /// A missing url is not an error here; it only fails once a relative
    /// endpoint is resolved.
    pub fn from_env() -> Result<Self, ApiError> {
        let url = env::var(URL_ENV).unwrap_or_default();
        let timeout = match env::var(TIMEOUT_ENV) {
            Ok(raw) => Some(parse_timeout(&raw)?),
            Err(_) => None,
        };
        Ok(Self {
            url: url.trim().to_string(),
            timeout,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

impl BaseUrlProvider for ApiOptions {
    fn base_url(&self) -> Result<String, ApiError> {
        normalize_base_url(&self.url)
    }

    fn default_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_TIMEOUT)
    }
}

fn normalize_base_url(url: &str) -> Result<String, ApiError> {
    if url.is_empty() {
        return Err(ApiError::MissingEndpoint(
            "base url has not been configured".to_string(),
        ));
    }
    if url.ends_with('/') {
        Ok(url.to_string())
    } else {
        Ok(format!("{url}/"))
    }
}

fn parse_timeout(raw: &str) -> Result<Duration, ApiError> {
    raw.trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| ApiError::Configuration(format!("{TIMEOUT_ENV}='{raw}': {e}")))
}
