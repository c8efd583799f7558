use crate::client::{VendorClient, VendorResponse};
use crate::config::{ResourceConfig, SigningConfig};
use crate::credentials::SecretSource;
use crate::errors::{ProxyError, ResolutionError};
use crate::metrics_defs::{REQUEST_DURATION, REQUESTS_COUNT, UPSTREAM_ERRORS};
use crate::query::{CallerParams, QueryBuilder};
use crate::resolver::EndpointResolver;
use crate::signer::{Clock, RequestSigner, Timestamp};
use http::header::{ALLOW, CONTENT_TYPE, HeaderValue};
use http::{Method, StatusCode};
use hyper::Response;
use hyper::body::Bytes;
use shared::http::{make_error_response, make_json_error_response};
use shared::{counter, histogram};
use std::sync::Arc;
use std::time::Instant;

/// Entry point for one proxied resource.
///
/// Holds only immutable configuration; every call builds its own timestamp,
/// credentials and query, so concurrent calls share nothing mutable.
pub struct ProxyHandler {
    resource: ResourceConfig,
    signing: SigningConfig,
    client: Arc<dyn VendorClient>,
    secrets: Arc<dyn SecretSource>,
    clock: Arc<dyn Clock>,
}

impl ProxyHandler {
    pub fn new(
        resource: ResourceConfig,
        signing: SigningConfig,
        client: Arc<dyn VendorClient>,
        secrets: Arc<dyn SecretSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resource,
            signing,
            client,
            secrets,
            clock,
        }
    }

    pub fn name(&self) -> &str {
        &self.resource.name
    }

    pub fn route(&self) -> &str {
        &self.resource.route
    }

    /// Proxies one inbound call. Never fails: errors become responses.
    pub async fn handle(&self, method: &Method, query: Option<&str>) -> Response<Bytes> {
        let start = Instant::now();

        let response = match self.proxy(method, query).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(resource = %self.resource.name, "request failed: {e}");
                error_response(e)
            }
        };

        let status = response.status().as_u16().to_string();
        tracing::info!(
            resource = %self.resource.name,
            %method,
            status = %status,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "proxied request"
        );
        counter!(
            REQUESTS_COUNT,
            "resource" => self.resource.name.clone(),
            "status" => status.clone()
        )
        .increment(1);
        histogram!(
            REQUEST_DURATION,
            "resource" => self.resource.name.clone(),
            "status" => status
        )
        .record(start.elapsed().as_secs_f64());

        response
    }

    async fn proxy(
        &self,
        method: &Method,
        query: Option<&str>,
    ) -> Result<Response<Bytes>, ProxyError> {
        if *method != Method::GET {
            return Err(ProxyError::MethodNotAllowed(method.clone()));
        }

        // Checked on every call; a resource without credentials fails on its own
        let credentials = self.resource.credentials.load(self.secrets.as_ref())?;

        // The only clock read for this request; every attempt signs and sends this value
        let timestamp = Timestamp::new(self.clock.now(), self.signing.timestamp_precision);

        let built = QueryBuilder::new(self.signing.include_query)
            .build(&self.resource.params, &CallerParams::parse(query));

        let resolver = EndpointResolver::new(
            &self.resource.candidates,
            RequestSigner::new(self.signing.convention),
        );
        let upstream = resolver
            .resolve(self.client.as_ref(), &credentials, &built, &timestamp)
            .await?;

        if !upstream.status.is_success() {
            counter!(
                UPSTREAM_ERRORS,
                "resource" => self.resource.name.clone(),
                "status" => upstream.status.as_u16().to_string()
            )
            .increment(1);
        }

        Ok(relay(upstream))
    }
}

/// Passes the vendor's status and body through untouched.
fn relay(upstream: VendorResponse) -> Response<Bytes> {
    let mut response = Response::new(upstream.body);
    *response.status_mut() = upstream.status;
    if let Some(content_type) = upstream.content_type {
        response.headers_mut().insert(CONTENT_TYPE, content_type);
    }
    response
}

fn error_response(error: ProxyError) -> Response<Bytes> {
    match error {
        ProxyError::Configuration(message) => {
            make_json_error_response(StatusCode::INTERNAL_SERVER_ERROR, &message)
        }
        ProxyError::MethodNotAllowed(_) => {
            let mut response = make_error_response(StatusCode::METHOD_NOT_ALLOWED);
            response
                .headers_mut()
                .insert(ALLOW, HeaderValue::from_static("GET"));
            response
        }
        ProxyError::Resolution(ResolutionError::NotFound { last, .. }) => relay(last),
        ProxyError::Resolution(ResolutionError::Transport { last, .. }) => {
            make_json_error_response(StatusCode::INTERNAL_SERVER_ERROR, &last.to_string())
        }
        e @ (ProxyError::Resolution(ResolutionError::NoCandidates)
        | ProxyError::HttpClient(_)
        | ProxyError::Io(_)) => {
            make_json_error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}
