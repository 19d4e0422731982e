//! RSA PKCS#1 v1.5 signature verification.
//!
//! The hash is fixed by the protocol that produced the signature, never by
//! the caller: legacy key-information records use SHA-1, raw-response
//! envelopes SHA-256 and account license lists SHA-512.

use crate::crypto::key::PublicKey;
use base64::{engine::general_purpose::STANDARD, Engine};
use rsa::Pkcs1v15Sign;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use tracing::debug;

/// Hash and padding combination used by a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignatureScheme {
    /// PKCS#1 v1.5 over SHA-1 (legacy key information).
    Pkcs1v15Sha1,
    /// PKCS#1 v1.5 over SHA-256 (raw-response envelope).
    Pkcs1v15Sha256,
    /// PKCS#1 v1.5 over SHA-512 (account license list).
    Pkcs1v15Sha512,
}

impl SignatureScheme {
    /// Hash `message` with this scheme's digest.
    pub(crate) fn digest(self, message: &[u8]) -> Vec<u8> {
        match self {
            SignatureScheme::Pkcs1v15Sha1 => Sha1::digest(message).to_vec(),
            SignatureScheme::Pkcs1v15Sha256 => Sha256::digest(message).to_vec(),
            SignatureScheme::Pkcs1v15Sha512 => Sha512::digest(message).to_vec(),
        }
    }

    pub(crate) fn padding(self) -> Pkcs1v15Sign {
        match self {
            SignatureScheme::Pkcs1v15Sha1 => Pkcs1v15Sign::new::<Sha1>(),
            SignatureScheme::Pkcs1v15Sha256 => Pkcs1v15Sign::new::<Sha256>(),
            SignatureScheme::Pkcs1v15Sha512 => Pkcs1v15Sign::new::<Sha512>(),
        }
    }
}

/// Verify `signature` over `message`.
///
/// Returns `false` for any failure, including malformed signatures.
pub fn verify(message: &[u8], signature: &[u8], key: &PublicKey, scheme: SignatureScheme) -> bool {
    let hashed = scheme.digest(message);

    match key.as_rsa().verify(scheme.padding(), &hashed, signature) {
        Ok(()) => true,
        Err(e) => {
            debug!(?scheme, error = %e, "signature rejected");
            false
        }
    }
}

/// Verify a base64 signature over `message`.
pub fn verify_b64(
    message: &[u8],
    signature_b64: &str,
    key: &PublicKey,
    scheme: SignatureScheme,
) -> bool {
    match STANDARD.decode(signature_b64.trim()) {
        Ok(signature) => verify(message, &signature, key, scheme),
        Err(e) => {
            debug!(error = %e, "signature is not base64");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{other_public_key, sign, test_public_key};

    const MESSAGE: &[u8] = b"license payload";

    #[test]
    fn test_verify_valid_signature_each_scheme() {
        let key = test_public_key();
        for scheme in [
            SignatureScheme::Pkcs1v15Sha1,
            SignatureScheme::Pkcs1v15Sha256,
            SignatureScheme::Pkcs1v15Sha512,
        ] {
            let signature = sign(MESSAGE, scheme);
            assert!(verify(MESSAGE, &signature, &key, scheme), "{:?}", scheme);
        }
    }

    #[test]
    fn test_verify_scheme_mismatch() {
        let key = test_public_key();
        let signature = sign(MESSAGE, SignatureScheme::Pkcs1v15Sha256);
        assert!(!verify(MESSAGE, &signature, &key, SignatureScheme::Pkcs1v15Sha1));
        assert!(!verify(MESSAGE, &signature, &key, SignatureScheme::Pkcs1v15Sha512));
    }

    #[test]
    fn test_verify_wrong_key() {
        let signature = sign(MESSAGE, SignatureScheme::Pkcs1v15Sha256);
        assert!(!verify(
            MESSAGE,
            &signature,
            &other_public_key(),
            SignatureScheme::Pkcs1v15Sha256
        ));
    }

    #[test]
    fn test_verify_modified_message() {
        let key = test_public_key();
        let signature = sign(MESSAGE, SignatureScheme::Pkcs1v15Sha256);
        assert!(!verify(b"license payloaD", &signature, &key, SignatureScheme::Pkcs1v15Sha256));
    }

    #[test]
    fn test_verify_truncated_signature() {
        let key = test_public_key();
        let signature = sign(MESSAGE, SignatureScheme::Pkcs1v15Sha256);
        assert!(!verify(
            MESSAGE,
            &signature[..signature.len() - 1],
            &key,
            SignatureScheme::Pkcs1v15Sha256
        ));
    }

    #[test]
    fn test_verify_empty_signature() {
        let key = test_public_key();
        assert!(!verify(MESSAGE, &[], &key, SignatureScheme::Pkcs1v15Sha256));
    }

    #[test]
    fn test_verify_b64_valid() {
        let key = test_public_key();
        let signature = STANDARD.encode(sign(MESSAGE, SignatureScheme::Pkcs1v15Sha1));
        assert!(verify_b64(MESSAGE, &signature, &key, SignatureScheme::Pkcs1v15Sha1));
    }

    #[test]
    fn test_verify_b64_invalid_base64() {
        let key = test_public_key();
        assert!(!verify_b64(MESSAGE, "not-valid-base64!!!", &key, SignatureScheme::Pkcs1v15Sha1));
    }
}
