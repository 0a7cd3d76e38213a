//! The external proof-generation collaborator.
//!
//! The attestor executes the HTTP request on the client's behalf and
//! returns a signed claim over what it observed. This crate treats the
//! exchange as an opaque remote call: it builds the request, forwards the
//! chosen signing key as the claim owner, and hands the raw response to
//! [`Proof`](crate::Proof) for normalization.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::options::{HttpMethod, RequestContext, ResponseMatch, ResponseRedaction};

/// A proof request sent to the attestor.
#[derive(Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimRequest {
    /// Provider name; always `"http"` for attested fetches.
    pub name: String,
    /// Public claim parameters.
    pub params: ClaimParams,
    /// Secret parameters, sent to the attestor but kept out of the claim.
    pub secret_params: ClaimSecretParams,
    /// The private key whose address becomes the claim owner.
    pub owner_private_key: String,
    /// Attestor endpoint descriptor.
    pub client: AttestorEndpoint,
    /// Optional context bound into the claim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<RequestContext>,
}

impl std::fmt::Debug for ClaimRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClaimRequest")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("client", &self.client)
            .finish_non_exhaustive()
    }
}

/// Public parameters of a claim.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimParams {
    /// HTTP method of the attested request.
    pub method: HttpMethod,
    /// The URL being fetched.
    pub url: String,
    /// Extraction rules applied to the response.
    pub response_matches: Vec<ResponseMatch>,
    /// Redaction rules applied to the response.
    pub response_redactions: Vec<ResponseRedaction>,
    /// Public request headers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,
    /// Request body.
    pub body: String,
    /// Values for templated provider parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_values: Option<HashMap<String, String>>,
    /// Geo location hint for the attestor's egress.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo_location: Option<String>,
}

/// Secret parameters of a claim.
#[derive(Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSecretParams {
    /// Secret request headers.
    pub headers: HashMap<String, String>,
    /// Cookie string for the upstream request.
    pub cookie_str: String,
    /// Secret values for templated provider parameters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param_values: Option<HashMap<String, String>>,
}

impl std::fmt::Debug for ClaimSecretParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Header values and cookies are secrets; show counts only.
        f.debug_struct("ClaimSecretParams")
            .field("headers", &self.headers.len())
            .field("cookie_str", &!self.cookie_str.is_empty())
            .finish_non_exhaustive()
    }
}

/// Attestor endpoint descriptor forwarded in the request.
#[derive(Debug, Clone, Serialize)]
pub struct AttestorEndpoint {
    /// The attestor node URL.
    pub url: String,
}

/// The attestor's response: either a claim or an error, never both.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimResponse {
    /// Error reported by the attestor, if any.
    #[serde(default)]
    pub error: Option<ClaimFailure>,
    /// The signed claim on success.
    #[serde(default)]
    pub claim: Option<RawClaim>,
    /// Attestor signatures over the claim.
    #[serde(default)]
    pub signatures: Vec<ClaimSignature>,
}

/// An error object in the attestor's response body.
#[derive(Debug, Clone, Deserialize)]
pub struct ClaimFailure {
    /// Human-readable failure description.
    #[serde(default)]
    pub message: String,
}

/// The raw claim as the attestor returns it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawClaim {
    /// Unique claim identifier.
    pub identifier: String,
    /// Provider name (`"http"`).
    pub provider: String,
    /// Serialized public parameters.
    pub parameters: String,
    /// Address of the claim owner (derived from `ownerPrivateKey`).
    pub owner: String,
    /// Claim timestamp, seconds since the Unix epoch.
    #[serde(rename = "timestampS")]
    pub timestamp_s: i64,
    /// Serialized context, possibly containing extracted parameters.
    #[serde(default)]
    pub context: String,
    /// Attestor epoch the claim was produced in.
    pub epoch: u64,
}

/// One attestor signature over a claim.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimSignature {
    /// The signature bytes, hex-encoded.
    pub signature: String,
    /// Identity of the attestor that signed.
    pub attestor_address: String,
}

/// The proof-generation collaborator.
///
/// The production implementation is [`HttpAttestor`]; tests substitute a
/// stub. Implementations perform exactly one attempt per call - the retry
/// loop lives in the client.
#[async_trait]
pub trait Attestor: Send + Sync {
    /// Execute one proof request.
    async fn create_claim(&self, request: &ClaimRequest) -> ClientResult<ClaimResponse>;
}

/// Attestor client over HTTPS.
pub struct HttpAttestor {
    http: Client,
    url: String,
}

impl HttpAttestor {
    /// Create a client for an attestor endpoint.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Attestor for HttpAttestor {
    async fn create_claim(&self, request: &ClaimRequest) -> ClientResult<ClaimResponse> {
        debug!(url = %request.params.url, "dispatching proof request to attestor");

        let response = self
            .http
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| ClientError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Network(format!(
                "attestor returned HTTP {status}"
            )));
        }

        response
            .json::<ClaimResponse>()
            .await
            .map_err(|e| ClientError::Protocol(format!("unreadable attestor response: {e}")))
    }
}
