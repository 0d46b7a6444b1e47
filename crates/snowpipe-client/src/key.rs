//! Private key material used to sign key-pair tokens.
//!
//! The configured key is a base64 encoded PKCS#8 RSA private key. PEM armor and
//! line breaks are tolerated so a key pasted straight from a `.p8` file works.
//! Decoding either yields a key that can sign RS256 tokens or fails with
//! `PipeError::KeyDecode`; it never performs I/O.

use base64::{engine::general_purpose, Engine as _};
use jsonwebtoken::{DecodingKey, EncodingKey};
use rsa::pkcs1::{EncodeRsaPrivateKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::{Digest, Sha256};
use snowpipe_core::PipeError;
use std::fmt;

/// RS256 signing refuses shorter moduli.
const MIN_KEY_BITS: usize = 2048;

pub struct KeyMaterial {
    encoding_key: EncodingKey,
    public_key: RsaPublicKey,
    fingerprint: String,
}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("fingerprint", &self.fingerprint)
            .finish_non_exhaustive()
    }
}

impl KeyMaterial {
    /// Decode a base64 (optionally PEM armored) PKCS#8 RSA private key.
    pub fn decode(encoded: &str) -> Result<Self, PipeError> {
        let body: String = encoded
            .lines()
            .filter(|line| !line.trim_start().starts_with("-----"))
            .flat_map(|line| line.chars())
            .filter(|c| !c.is_whitespace())
            .collect();

        if body.is_empty() {
            return Err(PipeError::KeyDecode("Private key is empty".to_string()));
        }

        let der = general_purpose::STANDARD
            .decode(body.as_bytes())
            .map_err(|e| PipeError::KeyDecode(format!("Private key is not valid base64: {}", e)))?;

        Self::from_pkcs8_der(&der)
    }

    /// Build from raw PKCS#8 DER bytes.
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self, PipeError> {
        let private_key = RsaPrivateKey::from_pkcs8_der(der).map_err(|e| {
            PipeError::KeyDecode(format!("Private key is not a PKCS#8 RSA key: {}", e))
        })?;

        private_key
            .validate()
            .map_err(|e| PipeError::KeyDecode(format!("Private key is inconsistent: {}", e)))?;

        let bits = private_key.size() * 8;
        if bits < MIN_KEY_BITS {
            return Err(PipeError::KeyDecode(format!(
                "Private key is {} bits; at least {} are required",
                bits, MIN_KEY_BITS
            )));
        }

        let pkcs1 = private_key
            .to_pkcs1_der()
            .map_err(|e| PipeError::KeyDecode(format!("Failed to encode private key: {}", e)))?;
        let encoding_key = EncodingKey::from_rsa_der(pkcs1.as_bytes());

        let public_key = private_key.to_public_key();
        let spki = public_key
            .to_public_key_der()
            .map_err(|e| PipeError::KeyDecode(format!("Failed to encode public key: {}", e)))?;
        let fingerprint = format!(
            "SHA256:{}",
            general_purpose::STANDARD.encode(Sha256::digest(spki.as_bytes()))
        );

        Ok(Self {
            encoding_key,
            public_key,
            fingerprint,
        })
    }

    pub fn encoding_key(&self) -> &EncodingKey {
        &self.encoding_key
    }

    /// `SHA256:<base64 digest of the DER public key>`, as registered with the user.
    pub fn public_key_fingerprint(&self) -> &str {
        &self.fingerprint
    }

    /// Key that verifies tokens signed by this material.
    pub fn decoding_key(&self) -> Result<DecodingKey, PipeError> {
        let der = self
            .public_key
            .to_pkcs1_der()
            .map_err(|e| PipeError::KeyDecode(format!("Failed to encode public key: {}", e)))?;
        Ok(DecodingKey::from_rsa_der(der.as_bytes()))
    }
}
