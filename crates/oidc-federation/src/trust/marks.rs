//! Trust marks — endorsements the subject must carry.
//!
//! A required trust mark is satisfied when the subject's configuration
//! lists a mark with that id whose token:
//! - is a `trust-mark+jwt` JWS about the subject
//! - is issued by an entity the anchor accepts for the id (when the
//!   anchor restricts issuers through `trust_mark_issuers`), and never by
//!   the subject itself unless the anchor lists it
//! - verifies under the issuer's published keys
//! - is inside its lifetime

use serde::{Deserialize, Serialize};

use crate::crypto::jws::{self, TYP_TRUST_MARK};
use crate::crypto::Ed25519KeyPair;
use crate::entity::{EntityId, EntityStatement, StatementValidator};
use crate::error::{FederationError, Result, ValidationError};
use crate::fetch::StatementFetcher;

/// Claims of a signed trust mark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustMarkClaims {
    pub iss: EntityId,
    pub sub: EntityId,
    pub id: String,
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
}

impl TrustMarkClaims {
    pub fn new(iss: EntityId, sub: EntityId, id: impl Into<String>, iat: i64) -> Self {
        Self {
            iss,
            sub,
            id: id.into(),
            iat,
            exp: None,
        }
    }

    pub fn expires_at(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Sign as a compact JWS.
    pub fn sign(&self, key_pair: &Ed25519KeyPair) -> Result<String> {
        jws::encode(self, key_pair, TYP_TRUST_MARK)
            .map_err(|e| FederationError::Serialization(e.to_string()))
    }
}

/// Verify every mark in `required` for `subject`.
///
/// Returns the verified ids in the order they were required. Any id that
/// cannot be verified fails the whole check with `MissingTrustMark`.
pub async fn verify_trust_marks(
    subject: &EntityStatement,
    anchor: &EntityStatement,
    required: &[String],
    fetcher: &dyn StatementFetcher,
    validator: &StatementValidator,
) -> Result<Vec<String>> {
    let mut verified: Vec<String> = Vec::with_capacity(required.len());
    for id in required {
        if verified.contains(id) {
            continue;
        }
        let mut last_error = None;
        for mark in subject.trust_marks().iter().filter(|m| &m.id == id) {
            match verify_one(&mark.trust_mark, id, subject, anchor, fetcher, validator).await {
                Ok(()) => {
                    verified.push(id.clone());
                    break;
                }
                Err(e) => last_error = Some(e),
            }
        }
        if !verified.contains(id) {
            match last_error {
                Some(e) => log::warn!("trust mark {id} of {} rejected: {e}", subject.sub()),
                None => log::warn!("{} carries no trust mark {id}", subject.sub()),
            }
            return Err(FederationError::MissingTrustMark(id.clone()));
        }
    }
    Ok(verified)
}

async fn verify_one(
    token: &str,
    id: &str,
    subject: &EntityStatement,
    anchor: &EntityStatement,
    fetcher: &dyn StatementFetcher,
    validator: &StatementValidator,
) -> Result<()> {
    let decoded = jws::decode(token)?;
    decoded.expect_type(TYP_TRUST_MARK)?;
    let claims: TrustMarkClaims = serde_json::from_value(decoded.payload.clone())
        .map_err(|e| ValidationError::MalformedToken(format!("trust mark claims: {e}")))?;

    if claims.id != id {
        return Err(ValidationError::MalformedToken(format!(
            "trust mark id {} listed as {id}",
            claims.id
        ))
        .into());
    }
    if &claims.sub != subject.sub() {
        return Err(ValidationError::SubjectMismatch {
            expected: subject.sub().to_string(),
            found: claims.sub.to_string(),
        }
        .into());
    }
    let allowed = anchor.trust_mark_issuers_for(id);
    match allowed {
        Some(allowed) if !allowed.contains(&claims.iss) => {
            return Err(ValidationError::IssuerMismatch {
                expected: allowed
                    .iter()
                    .map(EntityId::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                found: claims.iss.to_string(),
            }
            .into());
        }
        None if &claims.iss == subject.sub() => {
            return Err(ValidationError::IssuerMismatch {
                expected: format!("an issuer other than {}", subject.sub()),
                found: claims.iss.to_string(),
            }
            .into());
        }
        _ => {}
    }

    let now = validator.now();
    if claims.iat > now + validator.clock_skew() {
        return Err(ValidationError::NotYetValid { iat: claims.iat }.into());
    }
    if let Some(exp) = claims.exp {
        if now >= exp {
            return Err(ValidationError::Expired { exp }.into());
        }
    }

    let issuer_keys = if &claims.iss == anchor.sub() {
        anchor.jwks().cloned()
    } else {
        let token = fetcher.fetch_entity_configuration(&claims.iss).await?;
        validator
            .entity_configuration_of(&token, &claims.iss)?
            .jwks()
            .cloned()
    };
    let issuer_keys = issuer_keys.ok_or(ValidationError::MissingClaim("jwks"))?;
    decoded.verify(&issuer_keys, validator.allowed_algorithms())?;
    Ok(())
}
