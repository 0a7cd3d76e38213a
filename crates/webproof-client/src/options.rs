//! Request options for proof fetching.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ClientError, ClientResult};

/// HTTP method of the attested request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    /// GET request.
    #[default]
    Get,
    /// POST request.
    Post,
    /// PUT request. Representable but not accepted by the client.
    Put,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
        }
    }
}

/// Public options of an attested request.
///
/// Everything here ends up inside the (publicly visible) claim
/// parameters; secrets belong in [`SecretOptions`].
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// HTTP method (GET or POST).
    pub method: HttpMethod,
    /// Request body.
    pub body: Option<String>,
    /// Public request headers.
    pub headers: Option<HashMap<String, String>>,
    /// Geo location hint for the attestor's egress.
    pub geo_location: Option<String>,
    /// Values substituted into templated provider parameters.
    pub param_values: Option<HashMap<String, String>>,
    /// On-chain context bound into the claim.
    pub context: Option<RequestContext>,
}

impl FetchOptions {
    /// Validate the options.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidParameter`] for any method other than
    /// GET or POST.
    pub fn validate(&self) -> ClientResult<()> {
        match self.method {
            HttpMethod::Get | HttpMethod::Post => Ok(()),
            other => Err(ClientError::InvalidParameter(format!(
                "method {other} is not allowed"
            ))),
        }
    }
}

/// Context bound into a claim for downstream consumers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Address the claim is produced for.
    pub context_address: String,
    /// Free-form message carried with the claim.
    pub context_message: String,
}

/// Secret options of an attested request.
///
/// These are sent to the attestor but never appear in the public claim
/// parameters.
#[derive(Debug, Clone, Default)]
pub struct SecretOptions {
    /// Secret request headers (auth tokens and the like).
    pub headers: Option<HashMap<String, String>>,
    /// Extraction rules applied to the response.
    pub response_matches: Option<Vec<ResponseMatch>>,
    /// Redaction rules applied to the response.
    pub response_redactions: Option<Vec<ResponseRedaction>>,
    /// Cookie string for the upstream request.
    pub cookie_str: Option<String>,
    /// Secret values for templated provider parameters.
    pub param_values: Option<HashMap<String, String>>,
}

/// A rule matching content in the attested response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseMatch {
    /// Match kind.
    #[serde(rename = "type")]
    pub kind: MatchKind,
    /// Pattern or substring to match.
    pub value: String,
}

impl ResponseMatch {
    /// The catch-all default used when the caller does not restrict the
    /// response: a single named group capturing everything.
    #[must_use]
    pub fn capture_all() -> Self {
        Self {
            kind: MatchKind::Regex,
            value: "(?<data>.*)".to_string(),
        }
    }
}

/// Kind of a [`ResponseMatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchKind {
    /// Regular-expression match with named capture groups.
    Regex,
    /// Plain substring containment.
    Contains,
}

/// A redaction rule for the attested response.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseRedaction {
    /// Regex selecting the bytes to redact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    /// JSON path selecting the value to redact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_path: Option<String>,
    /// XPath selecting the node to redact.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x_path: Option<String>,
}
