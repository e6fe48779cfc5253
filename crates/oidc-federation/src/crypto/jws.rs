//! Compact JWS (RFC 7515) for signed statements, on `jsonwebtoken`.
//!
//! Only `EdDSA` over Ed25519 is verified; the caller supplies the list of
//! algorithms it is willing to accept. Time claims are left to the
//! statement validator, which judges them against its own clock.

use std::str::FromStr;

use jsonwebtoken::errors::{Error as JwtError, ErrorKind};
use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation};
use serde::Serialize;
use serde_json::Value;

use crate::error::ValidationError;

use super::jwk::{ed25519_parameters, effective_kid, Jwk, Jwks};
use super::keys::Ed25519KeyPair;

pub use jsonwebtoken::Header as JwsHeader;

/// The only signature algorithm this crate can verify.
pub const ALG_EDDSA: &str = "EdDSA";

/// `typ` header of entity statements.
pub const TYP_ENTITY_STATEMENT: &str = "entity-statement+jwt";

/// `typ` header of trust marks.
pub const TYP_TRUST_MARK: &str = "trust-mark+jwt";

/// Signature-only validation: no registered claim is required or checked.
fn signature_only(alg: Algorithm) -> Validation {
    let mut validation = Validation::new(alg);
    validation.required_spec_claims.clear();
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation
}

fn rejected(error: JwtError) -> ValidationError {
    match error.kind() {
        ErrorKind::InvalidSignature => ValidationError::SignatureInvalid,
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => {
            ValidationError::UnsupportedAlgorithm(error.to_string())
        }
        ErrorKind::InvalidKeyFormat | ErrorKind::InvalidEcdsaKey => {
            ValidationError::InvalidKey(error.to_string())
        }
        _ => ValidationError::MalformedToken(error.to_string()),
    }
}

/// A token with its header and payload decoded, signature not yet checked.
#[derive(Debug, Clone)]
pub struct DecodedJws {
    pub header: Header,
    pub payload: Value,
    token: String,
}

impl DecodedJws {
    /// Verify the signature with a key from `jwks`.
    ///
    /// The header `alg` must be in `allowed_algorithms` and supported.
    /// When the header names a `kid`, only that key is tried; otherwise
    /// every Ed25519 key in the set is tried. Returns the id of the key
    /// that verified.
    pub fn verify(
        &self,
        jwks: &Jwks,
        allowed_algorithms: &[String],
    ) -> Result<String, ValidationError> {
        let alg = self.header.alg;
        let allowed = allowed_algorithms
            .iter()
            .filter_map(|a| Algorithm::from_str(a).ok())
            .any(|a| a == alg);
        if !allowed || alg != Algorithm::EdDSA {
            return Err(ValidationError::UnsupportedAlgorithm(format!("{alg:?}")));
        }

        match &self.header.kid {
            Some(kid) => {
                let jwk = jwks
                    .find(kid)
                    .ok_or_else(|| ValidationError::UnknownKey(kid.clone()))?;
                self.verify_with(jwk)?;
                Ok(kid.clone())
            }
            None => jwks
                .ed25519_keys()
                .find(|jwk| self.verify_with(jwk).is_ok())
                .and_then(effective_kid)
                .ok_or(ValidationError::SignatureInvalid),
        }
    }

    fn verify_with(&self, jwk: &Jwk) -> Result<(), ValidationError> {
        let okp = ed25519_parameters(jwk).ok_or_else(|| {
            ValidationError::InvalidKey("only OKP/Ed25519 keys verify EdDSA".into())
        })?;
        let key = DecodingKey::from_ed_components(&okp.x).map_err(rejected)?;
        jsonwebtoken::decode::<Value>(&self.token, &key, &signature_only(Algorithm::EdDSA))
            .map(|_| ())
            .map_err(rejected)
    }

    /// Reject tokens whose `typ` header is present and differs from `expected`.
    pub fn expect_type(&self, expected: &str) -> Result<(), ValidationError> {
        match self.header.typ.as_deref() {
            Some(typ) if typ != expected => Err(ValidationError::UnexpectedType(typ.to_string())),
            _ => Ok(()),
        }
    }
}

/// Decode a compact JWS without checking the signature.
pub fn decode(token: &str) -> Result<DecodedJws, ValidationError> {
    let header = jsonwebtoken::decode_header(token).map_err(rejected)?;

    let mut unverified = signature_only(header.alg);
    unverified.insecure_disable_signature_validation();
    let payload = jsonwebtoken::decode::<Value>(token, &DecodingKey::from_secret(&[]), &unverified)
        .map_err(rejected)?
        .claims;
    if !payload.is_object() {
        return Err(ValidationError::MalformedToken(
            "payload must be a JSON object".into(),
        ));
    }

    Ok(DecodedJws {
        header,
        payload,
        token: token.to_string(),
    })
}

/// Sign `payload` as a compact JWS with `EdDSA`.
pub fn encode<T: Serialize>(
    payload: &T,
    key_pair: &Ed25519KeyPair,
    typ: &str,
) -> Result<String, JwtError> {
    let mut header = Header::new(Algorithm::EdDSA);
    header.typ = Some(typ.to_string());
    header.kid = Some(key_pair.kid().to_string());
    jsonwebtoken::encode(&header, payload, &key_pair.encoding_key()?)
}
