//! JSON Web Keys (RFC 7517) for the `jwks` claim.
//!
//! Keys are `jsonwebtoken`'s JWK types. Only OKP / Ed25519 keys can verify
//! signatures. Keys of other types are still deserialized so that a key set
//! mixing key types stays readable; they are simply never selected.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use ed25519_dalek::VerifyingKey;
use jsonwebtoken::jwk::{
    AlgorithmParameters, CommonParameters, EllipticCurve, JwkSet, KeyAlgorithm,
    OctetKeyPairParameters, OctetKeyPairType, PublicKeyUse,
};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use jsonwebtoken::jwk::Jwk;

/// Build an OKP JWK from an Ed25519 public key.
pub fn ed25519_jwk(key: &VerifyingKey, kid: Option<String>) -> Jwk {
    Jwk {
        common: CommonParameters {
            public_key_use: Some(PublicKeyUse::Signature),
            key_algorithm: Some(KeyAlgorithm::EdDSA),
            key_id: kid,
            ..Default::default()
        },
        algorithm: AlgorithmParameters::OctetKeyPair(OctetKeyPairParameters {
            key_type: OctetKeyPairType::OctetKeyPair,
            curve: EllipticCurve::Ed25519,
            x: URL_SAFE_NO_PAD.encode(key.as_bytes()),
        }),
    }
}

/// The OKP parameters of `jwk` when it is an Ed25519 key.
pub fn ed25519_parameters(jwk: &Jwk) -> Option<&OctetKeyPairParameters> {
    match &jwk.algorithm {
        AlgorithmParameters::OctetKeyPair(okp) if okp.curve == EllipticCurve::Ed25519 => Some(okp),
        _ => None,
    }
}

fn okp_thumbprint(x: &str) -> String {
    let canonical = format!(r#"{{"crv":"Ed25519","kty":"OKP","x":"{x}"}}"#);
    URL_SAFE_NO_PAD.encode(Sha256::digest(canonical.as_bytes()))
}

/// RFC 7638 thumbprint: base64url(SHA-256) over the required members in
/// lexicographic order. `None` for keys that are not Ed25519.
pub fn thumbprint(jwk: &Jwk) -> Option<String> {
    ed25519_parameters(jwk).map(|okp| okp_thumbprint(&okp.x))
}

/// RFC 7638 thumbprint of an Ed25519 public key.
pub fn ed25519_thumbprint(key: &VerifyingKey) -> String {
    okp_thumbprint(&URL_SAFE_NO_PAD.encode(key.as_bytes()))
}

/// The key id, falling back to the thumbprint.
pub fn effective_kid(jwk: &Jwk) -> Option<String> {
    jwk.common.key_id.clone().or_else(|| thumbprint(jwk))
}

/// A JSON Web Key Set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Jwks(JwkSet);

impl Jwks {
    pub fn new(keys: Vec<Jwk>) -> Self {
        Self(JwkSet { keys })
    }

    pub fn keys(&self) -> &[Jwk] {
        &self.0.keys
    }

    pub fn is_empty(&self) -> bool {
        self.0.keys.is_empty()
    }

    /// Find a key by id (explicit `kid` or thumbprint).
    pub fn find(&self, kid: &str) -> Option<&Jwk> {
        self.0
            .keys
            .iter()
            .find(|k| effective_kid(k).as_deref() == Some(kid))
    }

    pub fn contains(&self, kid: &str) -> bool {
        self.find(kid).is_some()
    }

    /// Keys usable for `EdDSA` verification.
    pub fn ed25519_keys(&self) -> impl Iterator<Item = &Jwk> {
        self.0
            .keys
            .iter()
            .filter(|k| ed25519_parameters(k).is_some())
    }
}

impl Default for Jwks {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
