//! Normalized proof objects.
//!
//! The attestor's raw response uses its own field names; consumers get a
//! stable [`Proof`] shape instead, with the claim data, the attestor
//! signatures and any parameters extracted from the response.

use serde::{Deserialize, Serialize};

use crate::attestor::{ClaimResponse, RawClaim};
use crate::error::{ClientError, ClientResult};

/// A completed, attested fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    /// Unique claim identifier.
    pub identifier: String,
    /// The claim's public data.
    pub claim_data: ProviderClaimData,
    /// Attestor signatures over the claim.
    pub signatures: Vec<String>,
    /// The attestors that witnessed the fetch.
    pub witnesses: Vec<WitnessData>,
    /// Values extracted from the response by the match rules, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extracted_parameter_values: Option<serde_json::Value>,
}

/// Public claim data, normalized from the attestor's raw claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderClaimData {
    /// Provider name (`"http"`).
    pub provider: String,
    /// Serialized public parameters.
    pub parameters: String,
    /// Address of the claim owner.
    pub owner: String,
    /// Claim timestamp, seconds since the Unix epoch.
    #[serde(rename = "timestampS")]
    pub timestamp_s: i64,
    /// Serialized context.
    pub context: String,
    /// Unique claim identifier (repeated for consumers that only keep
    /// the claim data).
    pub identifier: String,
    /// Attestor epoch the claim was produced in.
    pub epoch: u64,
}

/// One witness of an attested fetch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WitnessData {
    /// The witness identity (attestor address).
    pub id: String,
    /// The attestor node the proof was requested from.
    pub url: String,
}

impl Proof {
    /// Build a normalized proof from an attestor response.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::Protocol`] if the response carries neither a
    /// claim nor at least one signature.
    pub fn from_response(response: ClaimResponse, attestor_url: &str) -> ClientResult<Self> {
        let claim = response
            .claim
            .ok_or_else(|| ClientError::Protocol("attestor returned no claim".to_string()))?;

        if response.signatures.is_empty() {
            return Err(ClientError::Protocol(
                "attestor returned a claim without signatures".to_string(),
            ));
        }

        let witnesses = response
            .signatures
            .iter()
            .map(|sig| WitnessData {
                id: sig.attestor_address.clone(),
                url: attestor_url.to_string(),
            })
            .collect();
        let signatures = response
            .signatures
            .into_iter()
            .map(|sig| sig.signature)
            .collect();

        let extracted_parameter_values = extracted_parameters(&claim);

        Ok(Self {
            identifier: claim.identifier.clone(),
            claim_data: ProviderClaimData {
                provider: claim.provider,
                parameters: claim.parameters,
                owner: claim.owner,
                timestamp_s: claim.timestamp_s,
                context: claim.context,
                identifier: claim.identifier,
                epoch: claim.epoch,
            },
            signatures,
            witnesses,
            extracted_parameter_values,
        })
    }
}

/// Pull `extractedParameters` out of the claim context, when present.
///
/// The context is a JSON string the attestor controls; anything
/// unparseable just means no extracted values.
fn extracted_parameters(claim: &RawClaim) -> Option<serde_json::Value> {
    let context: serde_json::Value = serde_json::from_str(&claim.context).ok()?;
    context.get("extractedParameters").cloned()
}
