//! Token-related error types.

use thiserror::Error;

/// Errors that can occur when issuing or verifying capability tokens.
///
/// Every variant is an invalid-parameter condition: the caller supplied
/// input that is malformed or out of policy. Signature-recovery failures
/// and identity mismatches are deliberately collapsed into the single
/// [`TokenError::SignatureVerificationFailed`] variant so a caller cannot
/// tell which of the two checks rejected a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The allow-list is empty at issuance.
    #[error("allowedUrls must be a non-empty list")]
    EmptyAllowList,

    /// An allow-list entry is unusable.
    #[error("invalid URL pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The offending pattern.
        pattern: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The resolved expiry is not in the future.
    #[error("expiresAt must be in the future")]
    ExpiryInPast,

    /// The resolved expiry exceeds the maximum horizon.
    #[error("expiresAt cannot exceed {max_hours} hours from now")]
    ExpiryTooFar {
        /// The maximum horizon in hours.
        max_hours: i64,
    },

    /// The application id or secret could not be parsed.
    #[error("invalid application credentials: {0}")]
    InvalidCredentials(String),

    /// The secret's derived identity does not equal the claimed id.
    #[error("applicationId does not match the identity derived from applicationSecret")]
    IdentityMismatch,

    /// The token string is structurally invalid.
    #[error("malformed token: {0}")]
    Malformed(String),

    /// The token's expiry has passed.
    #[error("token has expired")]
    Expired,

    /// Signature recovery failed or the recovered identity did not match.
    #[error("signature verification failed")]
    SignatureVerificationFailed,

    /// Payload serialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;
