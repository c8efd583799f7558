//! Offline signing, for comparing against the vendor's own test tool.

use crate::config::{Config, ConfigError};
use chrono::{DateTime, Utc};
use clap::Args;
use http::Method;
use signing_proxy::config::Config as ProxyConfig;
use signing_proxy::credentials::{ProcessEnv, SecretSource};
use signing_proxy::errors::ProxyError;
use signing_proxy::query::{CallerParams, QueryBuilder};
use signing_proxy::signer::{RequestSigner, SigningRequest, Timestamp};
use std::error::Error;
use std::path::PathBuf;

#[derive(Args)]
pub struct SignArgs {
    #[arg(long, default_value = "printgate.yaml")]
    config_file_path: PathBuf,
    /// Resource name, e.g. "jobs"
    #[arg(long)]
    resource: String,
    /// Caller query string, e.g. "startMarker=5&sortOrder=DESC"
    #[arg(long)]
    query: Option<String>,
    /// RFC 3339 instant to sign at instead of now
    #[arg(long)]
    timestamp: Option<String>,
}

#[derive(thiserror::Error, Debug)]
pub enum SignError {
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(#[from] chrono::ParseError),
    #[error("invalid candidate URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Proxy(#[from] ProxyError),
}

pub fn run(args: SignArgs) -> Result<(), Box<dyn Error>> {
    let config = Config::from_file(&args.config_file_path)?;
    let instant = match &args.timestamp {
        Some(ts) => DateTime::parse_from_rfc3339(ts)
            .map_err(SignError::from)?
            .with_timezone(&Utc),
        None => Utc::now(),
    };

    let output = render(
        &config.proxy,
        &args.resource,
        args.query.as_deref(),
        instant,
        &ProcessEnv,
    )?;
    print!("{output}");
    Ok(())
}

/// One block per endpoint candidate: URL, canonical message and headers.
fn render(
    config: &ProxyConfig,
    resource: &str,
    query: Option<&str>,
    instant: DateTime<Utc>,
    secrets: &dyn SecretSource,
) -> Result<String, SignError> {
    let resource = config
        .resource(resource)
        .ok_or_else(|| SignError::UnknownResource(resource.to_string()))?;
    let credentials = resource.credentials.load(secrets)?;
    let timestamp = Timestamp::new(instant, config.signing.timestamp_precision);
    let built = QueryBuilder::new(config.signing.include_query)
        .build(&resource.params, &CallerParams::parse(query));
    let signer = RequestSigner::new(config.signing.convention);

    let mut output = String::new();
    for candidate in &resource.candidates {
        let url = candidate.url(&built.transmitted)?;
        let signed = signer.sign(
            &SigningRequest {
                method: &Method::GET,
                canonical_path: &candidate.path,
                query_for_signing: &built.signed_fragment,
                timestamp: &timestamp,
            },
            &credentials,
        );

        output.push_str(&format!("GET {url}\n"));
        output.push_str(&format!("convention: {}\n", signer.convention().as_str()));
        output.push_str(&format!("message: {:?}\n", signed.canonical_message));
        for (name, value) in signed.headers() {
            output.push_str(&format!("{name}: {value}\n"));
        }
        output.push('\n');
    }
    Ok(output)
}
