//! Webproof Token - URL-scoped capability tokens.
//!
//! This crate provides:
//! - Capability token issuance, signed by an application secret
//! - Token verification via signature recovery (no key distribution)
//! - The URL allow-list pattern matcher that scopes what a holder may do
//!
//! # Security Model
//!
//! Every capability token is:
//! - Signed by the application's secp256k1 key over a canonical payload
//! - Bound to a URL allow-list (exact, wildcard, or regex patterns)
//! - Time-bounded (one hour by default, 72 hours at most)
//! - Identified by a fresh UUID for audit correlation
//!
//! The application secret never appears in the token; a frontend holder
//! proves nothing but possession of the token itself.
//!
//! # Example
//!
//! ```
//! use webproof_crypto::KeyIdentity;
//! use webproof_token::{SignatureConfig, issue, verify, is_url_allowed};
//!
//! let key = KeyIdentity::generate();
//! let config = SignatureConfig {
//!     application_id: key.address().to_hex(),
//!     application_secret: key.secret_hex().to_string(),
//!     allowed_urls: vec!["https://api.example.com/*".to_string()],
//!     expires_at: None,
//! };
//!
//! let now = 1_700_000_000;
//! let token = issue(&config, now).unwrap();
//! let data = verify(&token, now).unwrap();
//!
//! assert!(is_url_allowed("https://api.example.com/users/1", &data.allowed_urls));
//! assert!(!is_url_allowed("https://evil.example/users/1", &data.allowed_urls));
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod pattern;
mod token;

pub use error::{TokenError, TokenResult};
pub use pattern::{PatternKind, classify, is_url_allowed};
pub use token::{
    DEFAULT_EXPIRY_HOURS, MAX_EXPIRY_HOURS, SignatureConfig, SignatureData, UnixSeconds, issue,
    verify,
};
