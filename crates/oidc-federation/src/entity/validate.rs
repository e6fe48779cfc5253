//! Statement validation.
//!
//! Checks run in a fixed order:
//! 1. Signature under an allowed algorithm and the appropriate key set
//! 2. Lifetime: `iat <= now (+ skew)` and `now < exp`
//! 3. Required claims: `iss`, `sub`, `iat`, `exp`, with `exp > iat`
//! 4. Entity configurations: self-issued, own `jwks` holds the signing key
//! 5. Subordinate statements: issuer/subject linkage, the issuer is one of
//!    the descendant's authority hints, and the descendant's configuration
//!    verifies under the keys the superior attests for it

use crate::config::ResolverConfig;
use crate::crypto::jws::{self, DecodedJws, TYP_ENTITY_STATEMENT};
use crate::crypto::Jwks;
use crate::error::ValidationError;

use super::id::EntityId;
use super::statement::{EntityStatement, StatementClaims};

/// Validates entity statements at a fixed point in time.
#[derive(Debug, Clone)]
pub struct StatementValidator {
    now: i64,
    allowed_algorithms: Vec<String>,
    clock_skew: i64,
}

impl StatementValidator {
    pub fn new(now: i64, allowed_algorithms: Vec<String>) -> Self {
        Self {
            now,
            allowed_algorithms,
            clock_skew: 0,
        }
    }

    /// Validator for `now` using the algorithms and skew from `config`.
    pub fn from_config(config: &ResolverConfig, now: i64) -> Self {
        Self::new(now, config.allowed_algorithms.clone()).with_clock_skew(config.clock_skew_secs)
    }

    /// Tolerate `iat` up to `secs` in the future.
    pub fn with_clock_skew(mut self, secs: i64) -> Self {
        self.clock_skew = secs.max(0);
        self
    }

    pub fn now(&self) -> i64 {
        self.now
    }

    pub fn allowed_algorithms(&self) -> &[String] {
        &self.allowed_algorithms
    }

    pub fn clock_skew(&self) -> i64 {
        self.clock_skew
    }

    /// Validate a self-issued entity configuration under its own keys.
    pub fn entity_configuration(&self, token: &str) -> Result<EntityStatement, ValidationError> {
        let decoded = Self::decode_statement(token)?;
        let claims = Self::claims(&decoded)?;
        let jwks = claims
            .jwks
            .clone()
            .ok_or(ValidationError::MissingClaim("jwks"))?;
        let statement = self.finish(token, decoded, claims, &jwks)?;

        if !statement.is_self_issued() {
            return Err(ValidationError::NotSelfIssued {
                iss: statement.iss().to_string(),
                sub: statement.sub().to_string(),
            });
        }
        Ok(statement)
    }

    /// Validate the configuration fetched from `entity`'s well-known endpoint.
    ///
    /// A configuration that validates but describes another entity is
    /// rejected.
    pub fn entity_configuration_of(
        &self,
        token: &str,
        entity: &EntityId,
    ) -> Result<EntityStatement, ValidationError> {
        let statement = self.entity_configuration(token)?;
        if statement.sub() != entity {
            return Err(ValidationError::SubjectMismatch {
                expected: entity.to_string(),
                found: statement.sub().to_string(),
            });
        }
        Ok(statement)
    }

    /// Validate a subordinate statement `issuer` made about `descendant`.
    ///
    /// Both configurations must already be validated.
    pub fn subordinate_statement(
        &self,
        token: &str,
        issuer: &EntityStatement,
        descendant: &EntityStatement,
    ) -> Result<EntityStatement, ValidationError> {
        let issuer_keys = issuer
            .jwks()
            .ok_or(ValidationError::MissingClaim("jwks"))?;
        let statement = self.signed_by(token, issuer_keys)?;

        if statement.iss() != issuer.sub() {
            return Err(ValidationError::IssuerMismatch {
                expected: issuer.sub().to_string(),
                found: statement.iss().to_string(),
            });
        }
        if statement.sub() != descendant.sub() {
            return Err(ValidationError::SubjectMismatch {
                expected: descendant.sub().to_string(),
                found: statement.sub().to_string(),
            });
        }
        if !descendant.authority_hints().contains(issuer.sub()) {
            return Err(ValidationError::NotAnAuthorityHint {
                issuer: issuer.sub().to_string(),
                subject: descendant.sub().to_string(),
            });
        }

        let attested = statement
            .jwks()
            .ok_or(ValidationError::MissingClaim("jwks"))?;
        Self::decode_statement(descendant.token())?
            .verify(attested, &self.allowed_algorithms)
            .map_err(|e| ValidationError::KeysNotAttested(e.to_string()))?;

        Ok(statement)
    }

    /// Validate any entity statement under an explicit key set.
    pub fn signed_by(&self, token: &str, jwks: &Jwks) -> Result<EntityStatement, ValidationError> {
        let decoded = Self::decode_statement(token)?;
        let claims = Self::claims(&decoded)?;
        self.finish(token, decoded, claims, jwks)
    }

    /// Decode the claims of a statement without any verification.
    ///
    /// The result must never be trusted; it serves diagnostics and endpoint
    /// discovery only.
    pub fn decode_unverified(token: &str) -> Result<StatementClaims, ValidationError> {
        let decoded = Self::decode_statement(token)?;
        Self::claims(&decoded)
    }

    fn decode_statement(token: &str) -> Result<DecodedJws, ValidationError> {
        let decoded = jws::decode(token)?;
        decoded.expect_type(TYP_ENTITY_STATEMENT)?;
        Ok(decoded)
    }

    fn claims(decoded: &DecodedJws) -> Result<StatementClaims, ValidationError> {
        serde_json::from_value(decoded.payload.clone())
            .map_err(|e| ValidationError::MalformedToken(format!("claims: {e}")))
    }

    fn finish(
        &self,
        token: &str,
        decoded: DecodedJws,
        claims: StatementClaims,
        jwks: &Jwks,
    ) -> Result<EntityStatement, ValidationError> {
        // 1. Signature
        let kid = decoded.verify(jwks, &self.allowed_algorithms)?;

        // 2. Lifetime
        if let Some(iat) = claims.iat {
            if iat > self.now + self.clock_skew {
                return Err(ValidationError::NotYetValid { iat });
            }
        }
        if let Some(exp) = claims.exp {
            if self.now >= exp {
                return Err(ValidationError::Expired { exp });
            }
        }

        // 3. Required claims
        let iss = claims
            .iss
            .clone()
            .ok_or(ValidationError::MissingClaim("iss"))?;
        let sub = claims
            .sub
            .clone()
            .ok_or(ValidationError::MissingClaim("sub"))?;
        let iat = claims.iat.ok_or(ValidationError::MissingClaim("iat"))?;
        let exp = claims.exp.ok_or(ValidationError::MissingClaim("exp"))?;
        if exp <= iat {
            return Err(ValidationError::EmptyLifetime { iat, exp });
        }

        Ok(EntityStatement::new(
            token.to_string(),
            claims,
            iss,
            sub,
            iat,
            exp,
            kid,
        ))
    }
}
