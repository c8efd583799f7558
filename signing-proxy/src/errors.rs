use crate::client::VendorResponse;
use http::Method;
use thiserror::Error;

/// Errors surfaced to the caller of a proxied resource
#[derive(Error, Debug)]
pub enum ProxyError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("method not allowed: {0}")]
    MethodNotAllowed(Method),

    #[error("endpoint resolution failed: {0}")]
    Resolution(#[from] ResolutionError),

    #[error("HTTP client error: {0}")]
    HttpClient(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single outbound call that never produced a response
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("upstream timeout for {0}")]
    Timeout(String),

    #[error("upstream request failed for {0}: {1}")]
    Request(String, String),

    #[error("failed to read upstream response body from {0}: {1}")]
    Body(String, String),

    #[error("invalid upstream URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Every endpoint candidate was tried and none was accepted.
///
/// Carries the last thing observed, which is the most useful diagnostic.
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("no endpoint candidates configured")]
    NoCandidates,

    #[error("all {attempts} endpoint candidates returned 404")]
    NotFound {
        attempts: usize,
        last: VendorResponse,
    },

    #[error("all {attempts} endpoint candidates failed, last error: {last}")]
    Transport {
        attempts: usize,
        last: TransportError,
    },
}
