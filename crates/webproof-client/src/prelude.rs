//! Prelude module - commonly used types for convenient import.
//!
//! Use `use webproof_client::prelude::*;` to import all essential types.

// Errors
pub use crate::{ClientError, ClientResult};

// Client
pub use crate::{ClientAuth, ClientConfig, ProofClient};

// Issuance
pub use crate::TokenIssuer;

// Options and proofs
pub use crate::{FetchOptions, HttpMethod, Proof, SecretOptions};

// Ephemeral keys
pub use crate::{EphemeralKeyManager, KeyStore};

// Re-exported foundations
pub use webproof_crypto::{Address, KeyIdentity};
pub use webproof_token::{SignatureConfig, SignatureData};
