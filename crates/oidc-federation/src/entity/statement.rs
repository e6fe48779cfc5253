//! Entity statements — the signed assertions a trust chain is made of.
//!
//! An entity statement is either an *entity configuration* (self-issued,
//! `iss == sub`, published by the entity about itself) or a *subordinate
//! statement* (issued by a superior about one of its subordinates). Both
//! share the same claim set; [`EntityStatement`] only exists once a
//! statement has passed validation (see [`super::validate`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::crypto::Jwks;

use super::id::EntityId;
use super::kind::EntityType;

/// Constraints a trust anchor places on chains ending at it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Constraints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_path_length: Option<u32>,
}

/// Reference to a trust mark carried in an entity configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrustMarkRef {
    pub id: String,
    pub trust_mark: String,
}

/// Claim set of an entity statement as it appears on the wire.
///
/// Every claim is optional at this level so that a missing required claim
/// surfaces as a typed validation error rather than a decode failure.
/// Unknown claims are preserved in `other`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<EntityId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwks: Option<Jwks>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata_policy: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_hints: Option<Vec<EntityId>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_marks: Option<Vec<TrustMarkRef>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trust_mark_issuers: Option<BTreeMap<String, Vec<EntityId>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<Constraints>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// A statement that passed signature, lifetime, and claim validation.
///
/// Immutable once constructed. The raw token is kept so that the chain can
/// be serialized exactly as it was received.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityStatement {
    token: String,
    claims: StatementClaims,
    iss: EntityId,
    sub: EntityId,
    iat: i64,
    exp: i64,
    kid: String,
}

impl EntityStatement {
    pub(crate) fn new(
        token: String,
        claims: StatementClaims,
        iss: EntityId,
        sub: EntityId,
        iat: i64,
        exp: i64,
        kid: String,
    ) -> Self {
        Self {
            token,
            claims,
            iss,
            sub,
            iat,
            exp,
            kid,
        }
    }

    /// The signed token exactly as received.
    pub fn token(&self) -> &str {
        &self.token
    }

    pub fn claims(&self) -> &StatementClaims {
        &self.claims
    }

    pub fn iss(&self) -> &EntityId {
        &self.iss
    }

    pub fn sub(&self) -> &EntityId {
        &self.sub
    }

    pub fn iat(&self) -> i64 {
        self.iat
    }

    pub fn exp(&self) -> i64 {
        self.exp
    }

    /// Id of the key that verified the signature.
    pub fn signing_kid(&self) -> &str {
        &self.kid
    }

    /// `true` for entity configurations.
    pub fn is_self_issued(&self) -> bool {
        self.iss == self.sub
    }

    /// Whether the statement is inside `[iat, exp)` at `now`.
    pub fn is_active_at(&self, now: i64) -> bool {
        self.iat <= now && now < self.exp
    }

    pub fn jwks(&self) -> Option<&Jwks> {
        self.claims.jwks.as_ref()
    }

    /// Candidate superiors in the order the entity listed them.
    pub fn authority_hints(&self) -> &[EntityId] {
        self.claims.authority_hints.as_deref().unwrap_or(&[])
    }

    /// Metadata declared for one entity type.
    pub fn metadata_for(&self, entity_type: EntityType) -> Option<&Map<String, Value>> {
        self.claims
            .metadata
            .as_ref()
            .and_then(|m| m.get(entity_type.as_str()))
            .and_then(Value::as_object)
    }

    /// Raw metadata policy for one entity type.
    pub fn metadata_policy_for(&self, entity_type: EntityType) -> Option<&Value> {
        self.claims
            .metadata_policy
            .as_ref()
            .and_then(|m| m.get(entity_type.as_str()))
    }

    /// `constraints.max_path_length`, meaningful on a trust anchor's
    /// entity configuration.
    pub fn max_path_length(&self) -> Option<u32> {
        self.claims
            .constraints
            .as_ref()
            .and_then(|c| c.max_path_length)
    }

    pub fn trust_marks(&self) -> &[TrustMarkRef] {
        self.claims.trust_marks.as_deref().unwrap_or(&[])
    }

    /// Issuers the anchor accepts for a trust-mark id, if it restricts them.
    pub fn trust_mark_issuers_for(&self, id: &str) -> Option<&[EntityId]> {
        self.claims
            .trust_mark_issuers
            .as_ref()
            .and_then(|m| m.get(id))
            .map(Vec::as_slice)
    }

    /// `federation_fetch_endpoint` from the `federation_entity` metadata.
    pub fn federation_fetch_endpoint(&self) -> Option<&str> {
        self.metadata_for(EntityType::FederationEntity)
            .and_then(|m| m.get("federation_fetch_endpoint"))
            .and_then(Value::as_str)
    }
}
