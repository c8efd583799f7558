use crate::errors::TransportError;
use crate::signer::SignedHeaders;
use async_trait::async_trait;
use http::header::{ACCEPT, CONTENT_TYPE, HeaderValue};
use http::StatusCode;
use hyper::body::Bytes;
use std::time::Duration;
use url::Url;

/// A signed outbound call to one endpoint candidate
#[derive(Clone, Debug)]
pub struct VendorRequest {
    pub url: Url,
    pub headers: SignedHeaders,
}

/// What the vendor answered, read in full
#[derive(Clone, Debug)]
pub struct VendorResponse {
    pub status: StatusCode,
    pub content_type: Option<HeaderValue>,
    pub body: Bytes,
}

impl VendorResponse {
    pub fn is_not_found(&self) -> bool {
        self.status == StatusCode::NOT_FOUND
    }
}

/// Issues a single GET to the vendor API.
#[async_trait]
pub trait VendorClient: Send + Sync {
    async fn get(&self, request: &VendorRequest) -> Result<VendorResponse, TransportError>;
}

pub struct ReqwestVendorClient {
    client: reqwest::Client,
}

impl ReqwestVendorClient {
    /// `timeout` covers the whole exchange, from connecting to the last body byte.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl VendorClient for ReqwestVendorClient {
    async fn get(&self, request: &VendorRequest) -> Result<VendorResponse, TransportError> {
        // Use host as identifier for error messages
        let upstream = request
            .url
            .host_str()
            .unwrap_or(request.url.as_str())
            .to_string();

        let mut builder = self
            .client
            .get(request.url.clone())
            .header(ACCEPT, "application/json");
        for (name, value) in request.headers.headers() {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| match e.is_timeout() {
            true => TransportError::Timeout(upstream.clone()),
            false => TransportError::Request(upstream.clone(), e.to_string()),
        })?;

        let status = response.status();
        let content_type = response.headers().get(CONTENT_TYPE).cloned();
        let body = response.bytes().await.map_err(|e| match e.is_timeout() {
            true => TransportError::Timeout(upstream.clone()),
            false => TransportError::Body(upstream.clone(), e.to_string()),
        })?;

        Ok(VendorResponse {
            status,
            content_type,
            body,
        })
    }
}
