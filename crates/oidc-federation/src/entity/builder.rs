//! Builder for signed entity statements.
//!
//! Used by federation entities to publish their configuration and by
//! superiors to issue subordinate statements.

use std::collections::BTreeMap;

use serde_json::{Map, Value};

use crate::crypto::jws::{self, TYP_ENTITY_STATEMENT};
use crate::crypto::{Ed25519KeyPair, Jwks};
use crate::error::{FederationError, Result};

use super::id::EntityId;
use super::kind::EntityType;
use super::statement::{Constraints, StatementClaims, TrustMarkRef};

/// Default statement lifetime when none is set: one day.
const DEFAULT_LIFETIME_SECS: i64 = 86_400;

/// Builder for creating entity statements.
pub struct StatementBuilder {
    claims: StatementClaims,
}

impl StatementBuilder {
    /// Start a statement issued by `iss` about `sub`.
    pub fn new(iss: EntityId, sub: EntityId) -> Self {
        Self {
            claims: StatementClaims {
                iss: Some(iss),
                sub: Some(sub),
                ..Default::default()
            },
        }
    }

    /// Start a self-issued entity configuration.
    pub fn entity_configuration(entity: EntityId) -> Self {
        Self::new(entity.clone(), entity)
    }

    /// Start a subordinate statement from a superior about a subordinate.
    pub fn subordinate(superior: EntityId, subordinate: EntityId) -> Self {
        Self::new(superior, subordinate)
    }

    /// Set `iat` and `exp` explicitly.
    pub fn lifetime(mut self, iat: i64, exp: i64) -> Self {
        self.claims.iat = Some(iat);
        self.claims.exp = Some(exp);
        self
    }

    /// Valid from now for `secs` seconds.
    pub fn valid_for(self, secs: i64) -> Self {
        let now = crate::time::now_secs();
        self.lifetime(now, now + secs)
    }

    pub fn jwks(mut self, jwks: Jwks) -> Self {
        self.claims.jwks = Some(jwks);
        self
    }

    pub fn authority_hint(mut self, hint: EntityId) -> Self {
        self.claims
            .authority_hints
            .get_or_insert_with(Vec::new)
            .push(hint);
        self
    }

    pub fn authority_hints(mut self, hints: Vec<EntityId>) -> Self {
        self.claims
            .authority_hints
            .get_or_insert_with(Vec::new)
            .extend(hints);
        self
    }

    /// Set the metadata object for one entity type.
    pub fn metadata(mut self, entity_type: EntityType, metadata: Value) -> Self {
        self.claims
            .metadata
            .get_or_insert_with(Map::new)
            .insert(entity_type.as_str().to_string(), metadata);
        self
    }

    /// Set the metadata policy for one entity type.
    pub fn metadata_policy(mut self, entity_type: EntityType, policy: Value) -> Self {
        self.claims
            .metadata_policy
            .get_or_insert_with(Map::new)
            .insert(entity_type.as_str().to_string(), policy);
        self
    }

    pub fn max_path_length(mut self, max: u32) -> Self {
        self.claims.constraints = Some(Constraints {
            max_path_length: Some(max),
        });
        self
    }

    pub fn trust_mark(mut self, id: impl Into<String>, trust_mark: impl Into<String>) -> Self {
        self.claims
            .trust_marks
            .get_or_insert_with(Vec::new)
            .push(TrustMarkRef {
                id: id.into(),
                trust_mark: trust_mark.into(),
            });
        self
    }

    /// Restrict which entities may issue the trust mark `id`.
    pub fn trust_mark_issuers(mut self, id: impl Into<String>, issuers: Vec<EntityId>) -> Self {
        self.claims
            .trust_mark_issuers
            .get_or_insert_with(BTreeMap::new)
            .insert(id.into(), issuers);
        self
    }

    /// Add an arbitrary claim.
    pub fn claim(mut self, name: impl Into<String>, value: Value) -> Self {
        self.claims.other.insert(name.into(), value);
        self
    }

    /// Sign and finalize the statement as a compact JWS.
    pub fn sign(mut self, key_pair: &Ed25519KeyPair) -> Result<String> {
        if self.claims.iat.is_none() || self.claims.exp.is_none() {
            let now = crate::time::now_secs();
            self.claims.iat = Some(now);
            self.claims.exp = Some(now + DEFAULT_LIFETIME_SECS);
        }
        jws::encode(&self.claims, key_pair, TYP_ENTITY_STATEMENT)
            .map_err(|e| FederationError::Serialization(e.to_string()))
    }
}
