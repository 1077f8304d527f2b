//! Error types for the resource client.
//!
//! # Design
//! Every failure a verb can produce is a variant of `ApiError`, including the
//! ones raised while the request is still being built (template validation,
//! missing arguments). Verbs are `async fn`s, so those surface through the
//! returned future like any transport failure and never as a panic.

use thiserror::Error;

/// Errors returned by `ResourceClient` verbs and the endpoint resolver.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required call argument was absent (or serialized to `null`).
    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    /// A relative endpoint was used but no usable base url is configured.
    #[error("no base url configured for relative endpoint '{0}'; use an absolute url or configure the base url")]
    MissingEndpoint(String),

    /// A placeholder in the endpoint template has an empty name.
    #[error("endpoint '{endpoint}' contains parameter '{token}' that is not at least 3 characters in length")]
    InvalidTemplate { endpoint: String, token: String },

    /// The transport succeeded but returned no payload.
    #[error("no response received")]
    EmptyResponse,

    /// Network failure (`status` is `None`) or a non-2xx HTTP status.
    #[error("transport failure{}: {reason}", http_status(.status))]
    TransportFailure { status: Option<u16>, reason: String },

    /// The payload was not valid JSON or did not fit the requested shape.
    #[error("deserialization failed: {0}")]
    Deserialization(String),

    /// The request body could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),

    /// Invalid configuration value, e.g. from the environment.
    #[error("invalid configuration: {0}")]
    Configuration(String),
}

fn http_status(status: &Option<u16>) -> String {
    status.map(|s| format!(" (HTTP {s})")).unwrap_or_default()
}

impl ApiError {
    pub(crate) fn transport(status: Option<u16>, reason: impl Into<String>) -> Self {
        ApiError::TransportFailure {
            status,
            reason: reason.into(),
        }
    }
}
