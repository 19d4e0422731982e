//! RSA public key parsing from the `<RSAKeyValue>` exchange format.
//!
//! Licensing servers hand out their verification key as
//! `<RSAKeyValue><Modulus>..</Modulus><Exponent>..</Exponent></RSAKeyValue>`
//! where both fields are big-endian integers in standard base64. Only those
//! two elements are read; everything else in the text is ignored.

use crate::KeywardenError;
use base64::{engine::general_purpose::STANDARD, Engine};
use once_cell::sync::OnceCell;
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use std::collections::HashMap;
use std::sync::RwLock;

/// RSA verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    inner: RsaPublicKey,
}

impl PublicKey {
    /// Build a key from base64 modulus and exponent fields.
    pub fn from_components(modulus_b64: &str, exponent_b64: &str) -> Result<Self, KeywardenError> {
        let modulus = decode_component("Modulus", modulus_b64)?;
        let exponent = decode_component("Exponent", exponent_b64)?;

        let inner = RsaPublicKey::new(
            BigUint::from_bytes_be(&modulus),
            BigUint::from_bytes_be(&exponent),
        )
        .map_err(|e| KeywardenError::InvalidPublicKey(format!("Rejected RSA parameters: {}", e)))?;

        Ok(Self { inner })
    }

    /// Parse `<RSAKeyValue>` text.
    pub fn from_xml(xml: &str) -> Result<Self, KeywardenError> {
        let modulus = element_text(xml, "Modulus").ok_or_else(|| {
            KeywardenError::InvalidPublicKey("Missing <Modulus> element".to_string())
        })?;
        let exponent = element_text(xml, "Exponent").ok_or_else(|| {
            KeywardenError::InvalidPublicKey("Missing <Exponent> element".to_string())
        })?;

        Self::from_components(modulus, exponent)
    }

    /// Base64 modulus, as it appears in the exchange format.
    pub fn modulus_b64(&self) -> String {
        STANDARD.encode(self.inner.n().to_bytes_be())
    }

    /// Base64 public exponent.
    pub fn exponent_b64(&self) -> String {
        STANDARD.encode(self.inner.e().to_bytes_be())
    }

    /// Render the key back into `<RSAKeyValue>` text.
    pub fn to_xml(&self) -> String {
        format!(
            "<RSAKeyValue><Modulus>{}</Modulus><Exponent>{}</Exponent></RSAKeyValue>",
            self.modulus_b64(),
            self.exponent_b64()
        )
    }

    pub(crate) fn as_rsa(&self) -> &RsaPublicKey {
        &self.inner
    }
}

fn decode_component(name: &str, value: &str) -> Result<Vec<u8>, KeywardenError> {
    let bytes = STANDARD
        .decode(value.trim())
        .map_err(|e| KeywardenError::InvalidPublicKey(format!("{} is not base64: {}", name, e)))?;

    if bytes.is_empty() {
        return Err(KeywardenError::InvalidPublicKey(format!("{} is empty", name)));
    }

    Ok(bytes)
}

/// Text between `<tag>` and `</tag>`, trimmed.
fn element_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;

    Some(xml[start..end].trim())
}

/// Most keys kept in the parse cache. Further keys are parsed on every call.
pub const KEY_CACHE_CAPACITY: usize = 16;

/// Cache for parsed verification keys.
static KEY_CACHE: OnceCell<RwLock<HashMap<String, PublicKey>>> = OnceCell::new();

/// Parse an `<RSAKeyValue>` key, memoising the result.
///
/// At most [`KEY_CACHE_CAPACITY`] distinct texts are remembered, so callers
/// feeding untrusted key text cannot grow the cache without bound.
pub fn decode_public_key(xml: &str) -> Result<PublicKey, KeywardenError> {
    let cache = KEY_CACHE.get_or_init(|| RwLock::new(HashMap::new()));
    if let Ok(guard) = cache.read() {
        if let Some(key) = guard.get(xml) {
            return Ok(key.clone());
        }
    }

    let key = PublicKey::from_xml(xml)?;

    // Best-effort insert; a poisoned lock only costs a re-parse next time.
    if let Ok(mut guard) = cache.write() {
        if guard.len() < KEY_CACHE_CAPACITY {
            guard.insert(xml.to_string(), key.clone());
        }
    }

    Ok(key)
}
