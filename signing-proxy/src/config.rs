use crate::catalog;
use crate::signer::{SigningConvention, TimestampPrecision};
use indexmap::IndexMap;
use serde::Deserialize;
use std::collections::HashSet;
use thiserror::Error;
use url::Url;

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Port cannot be 0")]
    InvalidPort,

    #[error("Upstream timeout cannot be 0")]
    InvalidTimeout,

    #[error("Empty resource name")]
    EmptyResourceName,

    #[error("Duplicate resource name: {0}")]
    DuplicateResource(String),

    #[error("Route must start with '/': {0}")]
    InvalidRoute(String),

    #[error("Duplicate route: {0}")]
    DuplicateRoute(String),

    #[error("Resource {0} has no endpoint candidates")]
    NoCandidates(String),

    #[error("Candidate path must start with '/': {0}")]
    InvalidCandidatePath(String),

    #[error("Candidate path would not be sent as signed: {0}")]
    NonCanonicalPath(String),

    #[error("Candidate base URL must not carry a query or fragment: {0}")]
    InvalidBaseUrl(Url),

    #[error("Candidate base URL is not HTTPS: {0}")]
    InsecureUpstream(Url),

    #[error("Empty credentials variable name for resource {0}")]
    EmptyCredentialsVariable(String),
}

/// Signing proxy configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Config {
    /// Listener for proxied resource requests
    pub listener: Listener,
    /// Listener for `/health` and `/ready`
    pub admin_listener: Listener,
    #[serde(default)]
    pub signing: SigningConfig,
    /// Bound on every outbound vendor call, including reading the body
    #[serde(default = "default_upstream_timeout_secs")]
    pub upstream_timeout_secs: u64,
    /// Permits `http://` candidates. Only meant for local testing.
    #[serde(default)]
    pub allow_plain_http: bool,
    /// Proxied vendor resources. Defaults to the built-in PrintBeat presets.
    #[serde(default = "catalog::printbeat_resources_v1")]
    pub resources: Vec<ResourceConfig>,
}

fn default_upstream_timeout_secs() -> u64 {
    10
}

impl Config {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.listener.validate()?;
        self.admin_listener.validate()?;

        if self.upstream_timeout_secs == 0 {
            return Err(ValidationError::InvalidTimeout);
        }

        let mut names = HashSet::new();
        let mut routes = HashSet::new();
        for resource in &self.resources {
            resource.validate(self.allow_plain_http)?;

            if !names.insert(&resource.name) {
                return Err(ValidationError::DuplicateResource(resource.name.clone()));
            }
            if !routes.insert(&resource.route) {
                return Err(ValidationError::DuplicateRoute(resource.route.clone()));
            }
        }

        Ok(())
    }

    pub fn resource(&self, name: &str) -> Option<&ResourceConfig> {
        self.resources.iter().find(|r| r.name == name)
    }
}

/// Network listener configuration
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct Listener {
    /// Host address to bind to (e.g., "0.0.0.0" or "127.0.0.1")
    pub host: String,
    /// Port number to listen on
    pub port: u16,
}

impl Listener {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.port == 0 {
            return Err(ValidationError::InvalidPort);
        }
        Ok(())
    }
}

/// Process-wide signing settings. Never varies per request or per resource.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq)]
pub struct SigningConfig {
    #[serde(default)]
    pub convention: SigningConvention,
    /// Whether the transmitted query string is part of the signed message
    #[serde(default)]
    pub include_query: bool,
    #[serde(default)]
    pub timestamp_precision: TimestampPrecision,
}

/// Names of the environment variables holding a resource's credentials.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct CredentialsConfig {
    pub key_env: String,
    pub secret_env: String,
}

/// One guess at where the vendor serves a resource.
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct EndpointCandidate {
    pub base_url: Url,
    /// Path appended to `base_url`; this is also the signed canonical path
    pub path: String,
}

impl EndpointCandidate {
    /// Full request URL for this candidate with the given query string.
    pub fn url(&self, query: &str) -> Result<Url, url::ParseError> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let url = match query {
            "" => format!("{base}{}", self.path),
            query => format!("{base}{}?{query}", self.path),
        };
        Url::parse(&url)
    }

    fn validate(&self, allow_plain_http: bool) -> Result<(), ValidationError> {
        if !self.path.starts_with('/') {
            return Err(ValidationError::InvalidCandidatePath(self.path.clone()));
        }
        if self.base_url.query().is_some() || self.base_url.fragment().is_some() {
            return Err(ValidationError::InvalidBaseUrl(self.base_url.clone()));
        }
        if self.base_url.scheme() != "https" && !allow_plain_http {
            return Err(ValidationError::InsecureUpstream(self.base_url.clone()));
        }

        // The signed path is `self.path` verbatim, so URL parsing must leave it untouched
        let expected = format!("{}{}", self.base_url.path().trim_end_matches('/'), self.path);
        match self.url("") {
            Ok(url) if url.path() == expected => Ok(()),
            _ => Err(ValidationError::NonCanonicalPath(self.path.clone())),
        }
    }
}

/// A proxied vendor resource such as "jobs" or "machines"
#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct ResourceConfig {
    pub name: String,
    /// Inbound path served by the proxy, e.g. "/api/jobs"
    pub route: String,
    pub credentials: CredentialsConfig,
    /// Recognized query parameters and their defaults.
    ///
    /// Declaration order is the order parameters are transmitted and signed in.
    #[serde(default)]
    pub params: IndexMap<String, String>,
    /// Tried in order until one does not answer 404
    pub candidates: Vec<EndpointCandidate>,
}

impl ResourceConfig {
    fn validate(&self, allow_plain_http: bool) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyResourceName);
        }
        if !self.route.starts_with('/') {
            return Err(ValidationError::InvalidRoute(self.route.clone()));
        }
        if self.credentials.key_env.is_empty() || self.credentials.secret_env.is_empty() {
            return Err(ValidationError::EmptyCredentialsVariable(self.name.clone()));
        }
        if self.candidates.is_empty() {
            return Err(ValidationError::NoCandidates(self.name.clone()));
        }
        for candidate in &self.candidates {
            candidate.validate(allow_plain_http)?;
        }
        Ok(())
    }
}
