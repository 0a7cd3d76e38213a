//! Webproof Crypto - Cryptographic primitives for capability tokens.
//!
//! This crate provides:
//! - secp256k1 signing keys with derived public identities (addresses)
//! - Recoverable message signatures for capability-token issuance
//! - Address recovery, so verifiers need only the signed message and the
//!   signature to establish who signed
//!
//! # Security Philosophy
//!
//! **The identity is the key.** An application's id is the address derived
//! from its secret; nothing has to be registered or looked up to check a
//! signature, and the secret itself never appears in any signed payload.
//!
//! # Example
//!
//! ```
//! use webproof_crypto::KeyIdentity;
//!
//! // Generate a new signing key
//! let key = KeyIdentity::generate();
//!
//! // Sign a message
//! let message = b"important data";
//! let signature = key.sign_message(message).unwrap();
//!
//! // Anyone can recover the signer's identity
//! assert_eq!(signature.recover(message).unwrap(), key.address());
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod address;
mod error;
mod key;
mod signature;

pub use address::Address;
pub use error::{CryptoError, CryptoResult};
pub use key::KeyIdentity;
pub use signature::{RecoverableSignature, signed_message_digest};
