//! HMAC request signing for the vendor API.
//!
//! The vendor authenticates a request by recomputing an HMAC-SHA256 over a
//! canonical message built from the method, the resource path (optionally with
//! its query string) and a timestamp. The same timestamp string has to be sent
//! in the `x-hp-hmac-date` header, so it is generated once by the caller and
//! passed in here.

use crate::credentials::Credentials;
use chrono::{DateTime, SecondsFormat, Utc};
use hmac::{Hmac, Mac};
use http::Method;
use serde::Deserialize;
use sha2::Sha256;
use std::fmt;

type HmacSha256 = Hmac<Sha256>;

pub const AUTHENTICATION_HEADER: &str = "x-hp-hmac-authentication";
pub const DATE_HEADER: &str = "x-hp-hmac-date";
pub const ALGORITHM_HEADER: &str = "x-hp-hmac-algorithm";
pub const ALGORITHM: &str = "SHA256";

/// Layout of the canonical message. One convention is chosen per deployment.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SigningConvention {
    /// `METHOD\nPATH[?QUERY]\nTIMESTAMP`
    #[default]
    NewlineV1,
    /// `METHOD PATH[?QUERY]TIMESTAMP`, as produced by the vendor's signing test tool.
    SpaceJoinedV1,
}

impl SigningConvention {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SigningConvention::NewlineV1 => "newline_v1",
            SigningConvention::SpaceJoinedV1 => "space_joined_v1",
        }
    }

    pub fn canonical_message(&self, request: &SigningRequest<'_>) -> String {
        let method = request.method.as_str();
        let timestamp = request.timestamp.as_str();
        let path = match request.query_for_signing {
            "" => request.canonical_path.to_owned(),
            query => format!("{}?{}", request.canonical_path, query),
        };

        match self {
            SigningConvention::NewlineV1 => format!("{method}\n{path}\n{timestamp}"),
            SigningConvention::SpaceJoinedV1 => format!("{method} {path}{timestamp}"),
        }
    }
}

/// Sub-second precision of the signing timestamp.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPrecision {
    /// `2024-05-01T12:00:00.000Z`
    #[default]
    Millis,
    /// `2024-05-01T12:00:00Z`; some vendor deployments reject milliseconds.
    Seconds,
}

/// ISO-8601 UTC timestamp, rendered once and reused verbatim.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Timestamp(String);

impl Timestamp {
    pub fn new(instant: DateTime<Utc>, precision: TimestampPrecision) -> Self {
        let format = match precision {
            TimestampPrecision::Millis => SecondsFormat::Millis,
            TimestampPrecision::Seconds => SecondsFormat::Secs,
        };
        Timestamp(instant.to_rfc3339_opts(format, true))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Everything that goes into the canonical message.
#[derive(Clone, Copy, Debug)]
pub struct SigningRequest<'a> {
    pub method: &'a Method,
    pub canonical_path: &'a str,
    /// Empty when the deployment does not sign query parameters.
    pub query_for_signing: &'a str,
    pub timestamp: &'a Timestamp,
}

/// Output of [`RequestSigner::sign`]: the three vendor headers plus the
/// intermediate values worth logging. Holds nothing derived from the secret
/// other than the signature itself.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedHeaders {
    pub authentication: String,
    pub date: String,
    pub algorithm: &'static str,
    pub canonical_message: String,
    pub signature: String,
}

impl SignedHeaders {
    /// Header name/value pairs in the order the vendor documents them.
    pub fn headers(&self) -> [(&'static str, &str); 3] {
        [
            (AUTHENTICATION_HEADER, self.authentication.as_str()),
            (DATE_HEADER, self.date.as_str()),
            (ALGORITHM_HEADER, self.algorithm),
        ]
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct RequestSigner {
    convention: SigningConvention,
}

impl RequestSigner {
    pub fn new(convention: SigningConvention) -> Self {
        Self { convention }
    }

    pub fn convention(&self) -> SigningConvention {
        self.convention
    }

    pub fn sign(&self, request: &SigningRequest<'_>, credentials: &Credentials) -> SignedHeaders {
        let canonical_message = self.convention.canonical_message(request);
        let signature = hmac_sha256_hex(credentials.secret(), canonical_message.as_bytes());

        SignedHeaders {
            authentication: format!("{}:{}", credentials.key_id(), signature),
            date: request.timestamp.as_str().to_owned(),
            algorithm: ALGORITHM,
            canonical_message,
            signature,
        }
    }
}

fn hmac_sha256_hex(key: &[u8], message: &[u8]) -> String {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC can take key of any size");
    mac.update(message);
    hex::encode(mac.finalize().into_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn timestamp() -> Timestamp {
        let instant = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        Timestamp::new(instant, TimestampPrecision::Millis)
    }

    fn credentials(secret: &str) -> Credentials {
        Credentials::new("key-id", secret.as_bytes().to_vec())
    }

    #[test]
    fn test_hmac_known_vector() {
        assert_eq!(
            hmac_sha256_hex(b"key", b"The quick brown fox jumps over the lazy dog"),
            "f7bc83f430538424b13298e6aa6fb143ef4d59a14946175997479dbc2d1a3cd8"
        );
    }

    #[test]
    fn test_timestamp_precision() {
        let instant = Utc.timestamp_millis_opt(1_714_564_800_123).unwrap();
        assert_eq!(
            Timestamp::new(instant, TimestampPrecision::Millis).as_str(),
            "2024-05-01T12:00:00.123Z"
        );
        assert_eq!(
            Timestamp::new(instant, TimestampPrecision::Seconds).as_str(),
            "2024-05-01T12:00:00Z"
        );
    }

    #[test]
    fn test_canonical_message_layouts() {
        let ts = timestamp();
        let method = Method::GET;
        let without_query = SigningRequest {
            method: &method,
            canonical_path: "/externalApi/jobs",
            query_for_signing: "",
            timestamp: &ts,
        };
        let with_query = SigningRequest {
            query_for_signing: "startMarker=1&sortOrder=ASC",
            ..without_query
        };

        assert_eq!(
            SigningConvention::NewlineV1.canonical_message(&without_query),
            "GET\n/externalApi/jobs\n2024-05-01T12:00:00.000Z"
        );
        assert_eq!(
            SigningConvention::NewlineV1.canonical_message(&with_query),
            "GET\n/externalApi/jobs?startMarker=1&sortOrder=ASC\n2024-05-01T12:00:00.000Z"
        );
        assert_eq!(
            SigningConvention::SpaceJoinedV1.canonical_message(&with_query),
            "GET /externalApi/jobs?startMarker=1&sortOrder=ASC2024-05-01T12:00:00.000Z"
        );
    }

    #[test]
    fn test_sign() {
        let ts = timestamp();
        let method = Method::GET;
        let request = SigningRequest {
            method: &method,
            canonical_path: "/externalApi/jobs",
            query_for_signing: "",
            timestamp: &ts,
        };

        let newline_signer = RequestSigner::new(SigningConvention::NewlineV1);
        let signed = newline_signer.sign(&request, &credentials("shhh"));
        let expected = "418f85a90b124cb17b27f6d7670dafa4603956bfa5a73aeb0b2408d82097a742";
        assert_eq!(signed.signature, expected);
        assert_eq!(signed.authentication, format!("key-id:{expected}"));
        assert_eq!(signed.date, "2024-05-01T12:00:00.000Z");
        assert_eq!(signed.algorithm, "SHA256");

        let with_query = SigningRequest {
            query_for_signing: "startMarker=1&sortOrder=ASC",
            ..request
        };
        let newline = newline_signer.sign(&with_query, &credentials("shhh"));
        assert_eq!(
            newline.signature,
            "c3a8bfd694b4715c45a932ab8e4a21383c60be78b6dd11a2efaf500cdb0b5d3a"
        );
        let space = RequestSigner::new(SigningConvention::SpaceJoinedV1)
            .sign(&with_query, &credentials("shhh"));
        assert_eq!(
            space.signature,
            "7fdeefe303764ccf1ca621a79281ec9007795b6cd4f564feeb17a565d4cc0cbe"
        );
    }

    #[test]
    fn test_sign_is_deterministic_and_secret_sensitive() {
        let ts = timestamp();
        let method = Method::GET;
        let request = SigningRequest {
            method: &method,
            canonical_path: "/externalApi/machines",
            query_for_signing: "devices=1%2C2",
            timestamp: &ts,
        };
        let signer = RequestSigner::new(SigningConvention::NewlineV1);

        let first = signer.sign(&request, &credentials("secret"));
        let second = signer.sign(&request, &credentials("secret"));
        assert_eq!(first, second);

        let mut signatures = std::collections::HashSet::new();
        for secret in ["a", "b", "secret", "secret ", "Secret", "0123456789abcdef"] {
            signatures.insert(signer.sign(&request, &credentials(secret)).signature);
        }
        assert_eq!(signatures.len(), 6);
    }

    #[test]
    fn test_headers_order() {
        let ts = timestamp();
        let method = Method::GET;
        let request = SigningRequest {
            method: &method,
            canonical_path: "/p",
            query_for_signing: "",
            timestamp: &ts,
        };
        let signed = RequestSigner::default().sign(&request, &credentials("s"));
        let names: Vec<_> = signed.headers().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![AUTHENTICATION_HEADER, DATE_HEADER, ALGORITHM_HEADER]
        );
        assert_eq!(signed.headers()[1].1, ts.as_str());
    }
}
