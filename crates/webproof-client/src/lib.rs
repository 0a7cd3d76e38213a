//! Webproof Client - attested HTTP fetches with capability-token scoping.
//!
//! This crate provides:
//! - [`ProofClient`]: fetches a URL through an attestor and returns a
//!   signed [`Proof`] of the response
//! - [`TokenIssuer`]: backend-side capability token issuance with audit
//!   emission
//! - [`EphemeralKeyManager`]: locally held signing keys for token holders
//! - The application directory and audit-log collaborators
//!
//! # Two modes
//!
//! A backend holding the application secret uses [`ClientAuth::Secret`].
//! A frontend holds only a short-lived capability token
//! ([`ClientAuth::Token`]): the client verifies it, gates every request
//! URL against the token's allow-list, and signs proof requests with an
//! ephemeral key - the application secret never leaves the backend.
//!
//! # Example
//!
//! ```no_run
//! use webproof_client::{ClientAuth, ClientConfig, FetchOptions, ProofClient, SecretOptions};
//!
//! # async fn run(token: String, app_id: String) -> Result<(), Box<dyn std::error::Error>> {
//! let client = ProofClient::new(app_id, ClientAuth::Token(token), ClientConfig::default())?;
//!
//! let proof = client
//!     .fetch_proof(
//!         "https://api.example.com/data",
//!         FetchOptions::default(),
//!         SecretOptions::default(),
//!     )
//!     .await?;
//!
//! println!("claim {} owned by {}", proof.identifier, proof.claim_data.owner);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod attestor;
mod audit;
mod client;
mod config;
mod directory;
mod error;
mod issuer;
mod keystore;
mod options;
mod proof;

pub use attestor::{
    Attestor, AttestorEndpoint, ClaimFailure, ClaimParams, ClaimRequest, ClaimResponse,
    ClaimSecretParams, ClaimSignature, HttpAttestor, RawClaim,
};
pub use audit::{AuditLog, LogType};
pub use client::{ClientAuth, ProofClient};
pub use config::{
    ClientConfig, DEFAULT_ATTESTOR_URL, DEFAULT_DIRECTORY_URL, DEFAULT_LOGS_URL,
};
pub use directory::AppDirectory;
pub use error::{ClientError, ClientResult};
pub use issuer::TokenIssuer;
pub use keystore::{EphemeralKeyManager, FsKeyStore, KeyStore, MemoryKeyStore};
pub use options::{
    FetchOptions, HttpMethod, MatchKind, RequestContext, ResponseMatch, ResponseRedaction,
    SecretOptions,
};
pub use proof::{Proof, ProviderClaimData, WitnessData};
