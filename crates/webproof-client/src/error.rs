//! Client-related error types.

use thiserror::Error;
use webproof_crypto::CryptoError;
use webproof_token::TokenError;

/// Errors that can occur while fetching attested proofs.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Malformed or out-of-policy input.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The requested URL is outside the token's allow-list.
    #[error("URL `{url}` is not allowed by the token scope; allowed patterns: {allowed:?}")]
    UrlNotAllowed {
        /// The rejected URL.
        url: String,
        /// The allow-list it was checked against.
        allowed: Vec<String>,
    },

    /// Token issuance or verification failed.
    #[error(transparent)]
    Token(#[from] TokenError),

    /// A key or signature operation failed.
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The application is not registered with the directory.
    #[error("application not found: {0}")]
    ApplicationNotFound(String),

    /// The directory lookup failed for a reason other than a clean 404.
    #[error("application lookup failed: {0}")]
    Application(String),

    /// Transport failure talking to a collaborator.
    #[error("network error: {0}")]
    Network(String),

    /// The attestor reported an error in its response body.
    #[error("attestor protocol failure: {0}")]
    Protocol(String),
}

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;
