use crate::client::{VendorClient, VendorRequest, VendorResponse};
use crate::config::EndpointCandidate;
use crate::errors::TransportError;
use crate::signer::{Clock, Timestamp, TimestampPrecision};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use http::StatusCode;
use hyper::body::Bytes;
use std::collections::VecDeque;
use std::sync::Mutex;
use url::Url;

/// Replays scripted outcomes in order and records every request it receives.
pub struct MockVendorClient {
    outcomes: Mutex<VecDeque<Result<VendorResponse, TransportError>>>,
    calls: Mutex<Vec<VendorRequest>>,
}

impl MockVendorClient {
    pub fn new(outcomes: Vec<Result<VendorResponse, TransportError>>) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<VendorRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl VendorClient for MockVendorClient {
    async fn get(&self, request: &VendorRequest) -> Result<VendorResponse, TransportError> {
        self.calls.lock().unwrap().push(request.clone());
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TransportError::Request("mock".into(), "no outcome left".into())))
    }
}

pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

pub fn test_instant() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
}

pub fn test_timestamp() -> Timestamp {
    Timestamp::new(test_instant(), TimestampPrecision::Millis)
}

/// Candidate at `https://{host}.example.com` serving `path`.
pub fn candidate(host: &str, path: &str) -> EndpointCandidate {
    EndpointCandidate {
        base_url: Url::parse(&format!("https://{host}.example.com")).unwrap(),
        path: path.to_string(),
    }
}

pub fn response(status: u16, body: &str) -> VendorResponse {
    VendorResponse {
        status: StatusCode::from_u16(status).unwrap(),
        content_type: None,
        body: Bytes::from(body.to_string()),
    }
}
