//! Ed25519 key pair generation.
//!
//! Federation entities sign their statements with Ed25519 (JWS `EdDSA`).
//! The public half is published as an OKP JWK in the entity's `jwks`.

use ed25519_dalek::pkcs8::EncodePrivateKey;
use ed25519_dalek::{SigningKey, VerifyingKey};
use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::EncodingKey;

use super::jwk::{ed25519_jwk, ed25519_thumbprint, Jwk};

/// An Ed25519 key pair used to sign entity statements and trust marks.
///
/// `SigningKey` wipes its secret on drop.
pub struct Ed25519KeyPair {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    kid: String,
}

impl Ed25519KeyPair {
    /// Generate a new random Ed25519 key pair.
    ///
    /// The key id defaults to the RFC 7638 thumbprint of the public key.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut rand::thread_rng());
        Self::from_signing_key(signing_key)
    }

    /// Reconstruct a key pair from raw signing key bytes.
    pub fn from_signing_key_bytes(bytes: &[u8; 32]) -> Self {
        Self::from_signing_key(SigningKey::from_bytes(bytes))
    }

    fn from_signing_key(signing_key: SigningKey) -> Self {
        let verifying_key = signing_key.verifying_key();
        let kid = ed25519_thumbprint(&verifying_key);
        Self {
            signing_key,
            verifying_key,
            kid,
        }
    }

    /// Override the key id published in the JWK and the JWS header.
    pub fn with_kid(mut self, kid: impl Into<String>) -> Self {
        self.kid = kid.into();
        self
    }

    /// Return a reference to the signing key.
    pub fn signing_key(&self) -> &SigningKey {
        &self.signing_key
    }

    /// Return the verifying (public) key.
    pub fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }

    /// Key id used in JWS headers.
    pub fn kid(&self) -> &str {
        &self.kid
    }

    /// Public JWK for this key pair, suitable for a `jwks` claim.
    pub fn public_jwk(&self) -> Jwk {
        ed25519_jwk(&self.verifying_key, Some(self.kid.clone()))
    }

    /// PKCS#8 signing key for `jsonwebtoken::encode`.
    pub fn encoding_key(&self) -> Result<EncodingKey, JwtError> {
        let der = self
            .signing_key
            .to_pkcs8_der()
            .map_err(|_| JwtError::from(ErrorKind::InvalidKeyFormat))?;
        Ok(EncodingKey::from_ed_der(der.as_bytes()))
    }

    /// Return the verifying key bytes.
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.verifying_key.to_bytes()
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ed25519KeyPair")
            .field("kid", &self.kid)
            .field("signing_key", &"[REDACTED]")
            .finish()
    }
}
