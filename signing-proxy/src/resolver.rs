use crate::client::{VendorClient, VendorRequest, VendorResponse};
use crate::config::EndpointCandidate;
use crate::credentials::Credentials;
use crate::errors::{ResolutionError, TransportError};
use crate::metrics_defs::UPSTREAM_ATTEMPTS;
use crate::query::BuiltQuery;
use crate::signer::{RequestSigner, SigningRequest, Timestamp};
use http::Method;
use shared::counter;

/// Outcome of one candidate attempt
enum Attempt {
    Accepted(VendorResponse),
    NotFound(VendorResponse),
    Failed(TransportError),
}

/// Probes a resource's endpoint candidates in declared order.
///
/// The first response that is not a 404 is accepted as-is, error statuses
/// included: a 401 or 500 means the endpoint exists and the call itself
/// failed, so trying further candidates would only hide that. A 404 or a
/// transport failure moves on to the next candidate. Attempts are strictly
/// sequential, so nothing after the accepted candidate is ever called.
pub struct EndpointResolver<'a> {
    candidates: &'a [EndpointCandidate],
    signer: RequestSigner,
}

impl<'a> EndpointResolver<'a> {
    pub fn new(candidates: &'a [EndpointCandidate], signer: RequestSigner) -> Self {
        Self { candidates, signer }
    }

    /// Every attempt is signed with the same `timestamp`.
    pub async fn resolve(
        &self,
        client: &dyn VendorClient,
        credentials: &Credentials,
        query: &BuiltQuery,
        timestamp: &Timestamp,
    ) -> Result<VendorResponse, ResolutionError> {
        let mut last: Option<Result<VendorResponse, TransportError>> = None;

        for candidate in self.candidates {
            let attempt = self
                .attempt(client, candidate, credentials, query, timestamp)
                .await;

            match attempt {
                Attempt::Accepted(response) => {
                    counter!(UPSTREAM_ATTEMPTS, "outcome" => "accepted").increment(1);
                    return Ok(response);
                }
                Attempt::NotFound(response) => {
                    counter!(UPSTREAM_ATTEMPTS, "outcome" => "not_found").increment(1);
                    tracing::info!(
                        base_url = %candidate.base_url,
                        path = %candidate.path,
                        "candidate returned 404, trying next"
                    );
                    last = Some(Ok(response));
                }
                Attempt::Failed(e) => {
                    counter!(UPSTREAM_ATTEMPTS, "outcome" => "transport_error").increment(1);
                    tracing::warn!(
                        base_url = %candidate.base_url,
                        path = %candidate.path,
                        "candidate failed: {e}"
                    );
                    last = Some(Err(e));
                }
            }
        }

        let attempts = self.candidates.len();
        match last {
            None => Err(ResolutionError::NoCandidates),
            Some(Ok(last)) => Err(ResolutionError::NotFound { attempts, last }),
            Some(Err(last)) => Err(ResolutionError::Transport { attempts, last }),
        }
    }

    async fn attempt(
        &self,
        client: &dyn VendorClient,
        candidate: &EndpointCandidate,
        credentials: &Credentials,
        query: &BuiltQuery,
        timestamp: &Timestamp,
    ) -> Attempt {
        let url = match candidate.url(&query.transmitted) {
            Ok(url) => url,
            Err(e) => return Attempt::Failed(e.into()),
        };

        let signing_request = SigningRequest {
            method: &Method::GET,
            canonical_path: &candidate.path,
            query_for_signing: &query.signed_fragment,
            timestamp,
        };
        let headers = self.signer.sign(&signing_request, credentials);

        tracing::debug!(
            method = %Method::GET,
            url = %url,
            canonical_path = %candidate.path,
            timestamp = %timestamp,
            convention = self.signer.convention().as_str(),
            canonical_message = ?headers.canonical_message,
            signature = %headers.signature,
            headers = ?headers.headers(),
            "signed vendor request"
        );

        let request = VendorRequest { url, headers };
        match client.get(&request).await {
            Ok(response) if response.is_not_found() => Attempt::NotFound(response),
            Ok(response) => Attempt::Accepted(response),
            Err(e) => Attempt::Failed(e),
        }
    }
}
