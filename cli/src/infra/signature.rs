//! Signature infrastructure: implements `SignatureVerifier` with minisign.
//!
//! Releases ship a detached `.minisig` next to the archive. Both the legacy
//! (`Ed`) and prehashed (`ED`) signature algorithms are accepted.

use minisign_verify::{PublicKey, Signature};

use crate::application::ports::SignatureVerifier;
use crate::domain::SignatureError;

/// Production `SignatureVerifier` holding one decoded minisign public key.
pub struct MinisignVerifier {
    key: PublicKey,
}

impl MinisignVerifier {
    /// Decode the key once, at startup.
    ///
    /// # Errors
    ///
    /// Returns [`SignatureError::MalformedKey`] if the key cannot be decoded.
    pub fn new(public_key: &str) -> Result<Self, SignatureError> {
        Ok(Self {
            key: decode_public_key(public_key)?,
        })
    }
}

impl SignatureVerifier for MinisignVerifier {
    fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<bool, SignatureError> {
        let signature = decode_signature(signature)?;
        Ok(self.key.verify(payload, &signature, true).is_ok())
    }
}

/// Verify `payload` against a detached minisign `signature` and `public_key`.
///
/// `public_key` may be the bare base64 key or the full two-line key file.
/// Returns `Ok(false)` when both decode but the signature does not match.
///
/// # Errors
///
/// Returns [`SignatureError::MalformedKey`] or
/// [`SignatureError::MalformedSignature`] when decoding fails.
pub fn verify(public_key: &str, payload: &[u8], signature: &[u8]) -> Result<bool, SignatureError> {
    MinisignVerifier::new(public_key)?.verify(payload, signature)
}

fn decode_public_key(text: &str) -> Result<PublicKey, SignatureError> {
    let text = text.trim();
    let decoded = if text.lines().count() > 1 {
        PublicKey::decode(text)
    } else {
        PublicKey::from_base64(text)
    };
    decoded.map_err(|e| SignatureError::MalformedKey(e.to_string()))
}

fn decode_signature(bytes: &[u8]) -> Result<Signature, SignatureError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| SignatureError::MalformedSignature("signature is not UTF-8".to_string()))?;
    Signature::decode(text).map_err(|e| SignatureError::MalformedSignature(e.to_string()))
}
