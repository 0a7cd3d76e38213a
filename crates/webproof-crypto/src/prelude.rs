//! Prelude module - commonly used types for convenient import.
//!
//! Use `use webproof_crypto::prelude::*;` to import all essential types.
//!
//! # Example
//!
//! ```rust
//! use webproof_crypto::prelude::*;
//!
//! // Generate a key
//! let key = KeyIdentity::generate();
//!
//! // Sign and recover
//! let message = b"hello";
//! let signature = key.sign_message(message).unwrap();
//! assert_eq!(signature.recover(message).unwrap(), key.address());
//! ```

// Errors
pub use crate::{CryptoError, CryptoResult};

// Key types
pub use crate::{Address, KeyIdentity};

// Signatures
pub use crate::RecoverableSignature;
