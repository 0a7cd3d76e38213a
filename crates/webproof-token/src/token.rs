//! Capability token issuance and verification.
//!
//! A token is `base64(canonical_json(SignatureData)) + "." + signature`:
//! the payload is signed by the application secret with a recoverable
//! message signature, so verification needs no key distribution - the
//! signer's identity is recovered from the signature itself and compared
//! against the `applicationId` the payload claims.
//!
//! The signature covers the exact canonical JSON byte string. Field order
//! is fixed by the schema and reproduced identically on both sides, which
//! is why [`SignatureData`] re-serializes losslessly.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, STANDARD_NO_PAD, URL_SAFE, URL_SAFE_NO_PAD};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use webproof_crypto::{Address, KeyIdentity, RecoverableSignature};

use crate::error::{TokenError, TokenResult};
use crate::pattern::validate_pattern;

/// Expiry applied when the issuer does not pick one.
pub const DEFAULT_EXPIRY_HOURS: i64 = 1;

/// Maximum expiry horizon from issuance time.
pub const MAX_EXPIRY_HOURS: i64 = 72;

const SECONDS_PER_HOUR: i64 = 3600;
const DEFAULT_EXPIRY_SECS: i64 = DEFAULT_EXPIRY_HOURS * SECONDS_PER_HOUR;
const MAX_EXPIRY_SECS: i64 = MAX_EXPIRY_HOURS * SECONDS_PER_HOUR;

/// Seconds since the Unix epoch.
pub type UnixSeconds = i64;

/// Issuance input: the application credential plus the scope to grant.
#[derive(Debug, Clone)]
pub struct SignatureConfig {
    /// The application's public identity (`0x`-prefixed hex address).
    pub application_id: String,
    /// The application's private key (hex). Never leaves the issuer.
    pub application_secret: String,
    /// URL patterns the token holder may request. Must be non-empty.
    pub allowed_urls: Vec<String>,
    /// Explicit expiry (Unix seconds). Defaults to one hour from issuance.
    pub expires_at: Option<UnixSeconds>,
}

/// The signed payload of a capability token.
///
/// Immutable after construction. Field declaration order is the wire
/// order; the signature covers this exact serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SignatureData {
    /// The issuing application's identity.
    pub application_id: String,
    /// URL patterns the holder may request.
    pub allowed_urls: Vec<String>,
    /// Expiry, seconds since the Unix epoch.
    pub expires_at: UnixSeconds,
    /// Unique id of this issuance (UUID v4), for audit correlation.
    pub signature_id: String,
}

impl SignatureData {
    /// Serialize to the canonical JSON byte string the signature covers.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Serialization`] if serialization fails.
    pub fn canonical_json(&self) -> TokenResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| TokenError::Serialization(e.to_string()))
    }
}

/// Issue a capability token.
///
/// Validates the config, resolves the expiry, signs the payload with the
/// application secret and returns the encoded token string. Pure function
/// of `(config, now)`: the caller supplies the clock.
///
/// # Errors
///
/// Returns [`TokenError::EmptyAllowList`] / [`TokenError::InvalidPattern`]
/// for unusable allow-lists, [`TokenError::ExpiryInPast`] /
/// [`TokenError::ExpiryTooFar`] for out-of-policy expiries, and
/// [`TokenError::InvalidCredentials`] / [`TokenError::IdentityMismatch`]
/// when the secret does not parse or does not derive the claimed id.
pub fn issue(config: &SignatureConfig, now: UnixSeconds) -> TokenResult<String> {
    let key = KeyIdentity::from_hex(&config.application_secret)
        .map_err(|e| TokenError::InvalidCredentials(e.to_string()))?;
    let claimed = Address::from_hex(&config.application_id)
        .map_err(|e| TokenError::InvalidCredentials(e.to_string()))?;
    if key.address() != claimed {
        return Err(TokenError::IdentityMismatch);
    }

    if config.allowed_urls.is_empty() {
        return Err(TokenError::EmptyAllowList);
    }
    for pattern in &config.allowed_urls {
        validate_pattern(pattern)?;
    }

    let expires_at = config
        .expires_at
        .unwrap_or_else(|| now.saturating_add(DEFAULT_EXPIRY_SECS));
    if expires_at <= now {
        return Err(TokenError::ExpiryInPast);
    }
    if expires_at > now.saturating_add(MAX_EXPIRY_SECS) {
        return Err(TokenError::ExpiryTooFar {
            max_hours: MAX_EXPIRY_HOURS,
        });
    }

    let data = SignatureData {
        application_id: config.application_id.clone(),
        allowed_urls: config.allowed_urls.clone(),
        expires_at,
        signature_id: Uuid::new_v4().to_string(),
    };

    let payload = data.canonical_json()?;
    let signature = key
        .sign_message(&payload)
        .map_err(|e| TokenError::InvalidCredentials(e.to_string()))?;

    Ok(format!("{}.{}", STANDARD.encode(&payload), signature.to_hex()))
}

/// Verify a capability token and return its payload.
///
/// Checks structure, required fields, expiry, and that the identity
/// recovered from the signature equals the payload's `applicationId`
/// (case-insensitively). Pure function of `(token, now)`; performs no
/// external calls.
///
/// # Errors
///
/// Returns [`TokenError::Malformed`] for structural problems,
/// [`TokenError::Expired`] when `expires_at <= now`, and
/// [`TokenError::SignatureVerificationFailed`] when recovery fails or the
/// recovered identity does not match - the two are indistinguishable by
/// design.
pub fn verify(token: &str, now: UnixSeconds) -> TokenResult<SignatureData> {
    if token.is_empty() {
        return Err(TokenError::Malformed("token must be non-empty".to_string()));
    }

    let mut parts = token.split('.');
    let (Some(encoded), Some(sig_part), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(TokenError::Malformed(
            "expected exactly two dot-separated parts".to_string(),
        ));
    };

    let payload = decode_base64(encoded)
        .ok_or_else(|| TokenError::Malformed("payload is not valid base64".to_string()))?;
    let data: SignatureData = serde_json::from_slice(&payload)
        .map_err(|_| TokenError::Malformed("payload is not a valid signature payload".to_string()))?;

    // Required-field truthiness: a present-but-empty field is as missing.
    if data.application_id.trim().is_empty() {
        return Err(TokenError::Malformed("missing applicationId".to_string()));
    }
    if data.allowed_urls.is_empty() {
        return Err(TokenError::Malformed(
            "allowedUrls must be a non-empty array".to_string(),
        ));
    }
    if data.expires_at <= 0 {
        return Err(TokenError::Malformed("missing expiresAt".to_string()));
    }
    if data.signature_id.trim().is_empty() {
        return Err(TokenError::Malformed("missing signatureId".to_string()));
    }

    if data.expires_at <= now {
        return Err(TokenError::Expired);
    }

    // Re-serialize to reproduce the exact signed byte string, then recover
    // the signer. Recovery errors and identity mismatches surface as the
    // same error.
    let canonical = data.canonical_json()?;
    let signature = RecoverableSignature::from_hex(sig_part)
        .map_err(|_| TokenError::SignatureVerificationFailed)?;
    let recovered = signature
        .recover(&canonical)
        .map_err(|_| TokenError::SignatureVerificationFailed)?;
    let claimed = Address::from_hex(&data.application_id)
        .map_err(|_| TokenError::SignatureVerificationFailed)?;
    if recovered != claimed {
        return Err(TokenError::SignatureVerificationFailed);
    }

    Ok(data)
}

/// Decode standard or URL-safe base64, padded or not.
fn decode_base64(s: &str) -> Option<Vec<u8>> {
    STANDARD
        .decode(s)
        .or_else(|_| STANDARD_NO_PAD.decode(s))
        .or_else(|_| URL_SAFE.decode(s))
        .or_else(|_| URL_SAFE_NO_PAD.decode(s))
        .ok()
}
