//! secp256k1 signing keys and their derived identities.

use k256::ecdsa::SigningKey;
use rand::rngs::OsRng;
use zeroize::Zeroizing;

use crate::address::Address;
use crate::error::{CryptoError, CryptoResult};
use crate::signature::{RecoverableSignature, signed_message_digest};

/// A private signing key together with its derived public identity.
///
/// The identity [`Address`] IS the public key derivative: holding the key
/// proves control of the address, and a recoverable signature lets anyone
/// re-derive the address from a signed message. This is the root trust
/// assumption of the capability-token scheme.
///
/// The underlying scalar is zeroized when the key is dropped.
pub struct KeyIdentity {
    signing_key: SigningKey,
    address: Address,
}

impl KeyIdentity {
    /// Generate a new random key.
    #[must_use]
    pub fn generate() -> Self {
        let signing_key = SigningKey::random(&mut OsRng);
        let address = Address::from_verifying_key(signing_key.verifying_key());
        Self {
            signing_key,
            address,
        }
    }

    /// Create from a 32-byte secret.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidKeyLength`] for a wrong-sized slice or
    /// [`CryptoError::InvalidPrivateKey`] if the bytes are not a valid
    /// secp256k1 scalar (zero or ≥ the group order).
    pub fn from_secret_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        if bytes.len() != 32 {
            return Err(CryptoError::InvalidKeyLength {
                expected: 32,
                actual: bytes.len(),
            });
        }

        let signing_key = SigningKey::from_slice(bytes)
            .map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))?;
        let address = Address::from_verifying_key(signing_key.verifying_key());

        Ok(Self {
            signing_key,
            address,
        })
    }

    /// Create from a hex-encoded secret (optional `0x` prefix).
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::InvalidPrivateKey`] for malformed hex, or the
    /// errors of [`from_secret_bytes`](Self::from_secret_bytes).
    pub fn from_hex(s: &str) -> CryptoResult<Self> {
        let stripped = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .unwrap_or(s);
        let bytes = Zeroizing::new(
            hex::decode(stripped)
                .map_err(|_| CryptoError::InvalidPrivateKey("not valid hex".into()))?,
        );
        Self::from_secret_bytes(&bytes)
    }

    /// The canonical public identity derived from this key.
    #[must_use]
    pub const fn address(&self) -> Address {
        self.address
    }

    /// Sign a message, producing a signature the signer's address can be
    /// recovered from.
    ///
    /// This is message signing (domain-separated digest), not raw ECDSA
    /// over the caller's bytes.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::SigningFailed`] if the underlying ECDSA
    /// operation fails.
    pub fn sign_message(&self, message: &[u8]) -> CryptoResult<RecoverableSignature> {
        let digest = signed_message_digest(message);
        let (signature, recovery_id) = self
            .signing_key
            .sign_prehash_recoverable(&digest)
            .map_err(|e| CryptoError::SigningFailed(e.to_string()))?;

        let mut bytes = [0u8; 65];
        bytes[..64].copy_from_slice(signature.to_bytes().as_slice());
        bytes[64] = recovery_id.to_byte().wrapping_add(27);

        Ok(RecoverableSignature::from_bytes(bytes))
    }

    /// Export the secret as a `0x`-prefixed hex string.
    ///
    /// The returned buffer is zeroized on drop; only use this for secure
    /// storage or for handing the key to a downstream signer.
    #[must_use]
    pub fn secret_hex(&self) -> Zeroizing<String> {
        Zeroizing::new(format!(
            "0x{}",
            hex::encode(self.signing_key.to_bytes().as_slice())
        ))
    }
}

impl std::fmt::Debug for KeyIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyIdentity")
            .field("address", &self.address)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_yields_distinct_keys() {
        let a = KeyIdentity::generate();
        let b = KeyIdentity::generate();
        assert_ne!(a.address(), b.address());
    }

    #[test]
    fn test_secret_hex_round_trip() {
        let original = KeyIdentity::generate();
        let restored = KeyIdentity::from_hex(&original.secret_hex()).unwrap();
        assert_eq!(original.address(), restored.address());
    }

    #[test]
    fn test_from_hex_without_prefix() {
        let original = KeyIdentity::generate();
        let hex = original.secret_hex();
        let restored = KeyIdentity::from_hex(&hex[2..]).unwrap();
        assert_eq!(original.address(), restored.address());
    }

    #[test]
    fn test_sign_then_recover() {
        let key = KeyIdentity::generate();
        let message = b"capability payload";

        let sig = key.sign_message(message).unwrap();
        assert_eq!(sig.recover(message).unwrap(), key.address());
    }

    #[test]
    fn test_rejects_bad_secrets() {
        assert!(matches!(
            KeyIdentity::from_secret_bytes(&[0u8; 31]),
            Err(CryptoError::InvalidKeyLength { .. })
        ));
        // The zero scalar is not a valid private key.
        assert!(matches!(
            KeyIdentity::from_secret_bytes(&[0u8; 32]),
            Err(CryptoError::InvalidPrivateKey(_))
        ));
        assert!(KeyIdentity::from_hex("0xzz").is_err());
    }

    #[test]
    fn test_debug_hides_secret() {
        let key = KeyIdentity::generate();
        let debug = format!("{key:?}");
        assert!(!debug.contains(&key.secret_hex()[2..]));
        assert!(debug.contains("address"));
    }
}
