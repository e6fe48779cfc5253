//! Trust chain — the result of a successful resolution.
//!
//! A trust chain packages the selected path, the subject's final metadata
//! for one entity type, and the trust marks verified along the way. It is
//! valid until the earliest expiration on its path; after that it must be
//! resolved again, never patched.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::entity::{EntityId, EntityStatement, EntityType, StatementValidator};
use crate::error::{FederationError, Result};
use crate::storage::{ChainStatus, TrustChainRecord};

use super::path::TrustPath;
use super::policy::apply_metadata_policy;

/// A resolved trust chain.
#[derive(Debug, Clone)]
pub struct TrustChain {
    entity_type: EntityType,
    path: TrustPath,
    metadata: Map<String, Value>,
    verified_trust_marks: Vec<String>,
    exp: i64,
}

impl TrustChain {
    /// Assemble a chain from a checked path and its merged metadata.
    pub fn new(
        path: TrustPath,
        entity_type: EntityType,
        metadata: Map<String, Value>,
        verified_trust_marks: Vec<String>,
    ) -> Self {
        let exp = path.exp();
        Self {
            entity_type,
            path,
            metadata,
            verified_trust_marks,
            exp,
        }
    }

    /// Rebuild a chain from its persisted form without any fetch.
    ///
    /// Every token is re-verified and the metadata policy re-applied.
    pub fn from_record(record: &TrustChainRecord, validator: &StatementValidator) -> Result<Self> {
        let path = TrustPath::from_tokens(&record.chain, validator)?;
        if path.subject() != &record.sub || path.trust_anchor() != &record.trust_anchor {
            return Err(FederationError::Storage(format!(
                "stored chain for {} under {} holds a path from {} to {}",
                record.sub,
                record.trust_anchor,
                path.subject(),
                path.trust_anchor()
            )));
        }
        let metadata = apply_metadata_policy(&path, record.entity_type)?;
        Ok(Self::new(
            path,
            record.entity_type,
            metadata,
            record.trust_marks.clone(),
        ))
    }

    pub fn subject(&self) -> &EntityId {
        self.path.subject()
    }

    pub fn trust_anchor(&self) -> &EntityId {
        self.path.trust_anchor()
    }

    pub fn entity_type(&self) -> EntityType {
        self.entity_type
    }

    /// Not yet expired at the current time.
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(crate::time::now_secs())
    }

    /// Not yet expired at `now`.
    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.exp
    }

    /// The subject's metadata after every policy on the path was applied.
    pub fn final_metadata(&self) -> &Map<String, Value> {
        &self.metadata
    }

    /// Earliest `exp` over the path, in seconds since the epoch.
    pub fn exp(&self) -> i64 {
        self.exp
    }

    pub fn exp_datetime(&self) -> DateTime<Utc> {
        crate::time::secs_to_datetime(self.exp)
    }

    /// Raw tokens, subject configuration first, anchor configuration last.
    pub fn serialize(&self) -> Vec<String> {
        self.path.tokens()
    }

    /// Validated statements, subject first.
    pub fn trust_path(&self) -> &[std::sync::Arc<EntityStatement>] {
        self.path.statements()
    }

    pub fn path(&self) -> &TrustPath {
        &self.path
    }

    pub fn parties_involved(&self) -> Vec<EntityId> {
        self.path.parties_involved()
    }

    pub fn verified_trust_marks(&self) -> &[String] {
        &self.verified_trust_marks
    }

    /// Whether every id in `required` was verified for this chain.
    pub fn satisfies(&self, required: &[String]) -> bool {
        required
            .iter()
            .all(|id| self.verified_trust_marks.contains(id))
    }

    /// Persistable form, stamped with `now`.
    pub fn to_record(&self, now: i64) -> TrustChainRecord {
        let status = if self.is_valid_at(now) {
            ChainStatus::Valid
        } else {
            ChainStatus::Expired
        };
        TrustChainRecord {
            sub: self.subject().clone(),
            trust_anchor: self.trust_anchor().clone(),
            entity_type: self.entity_type,
            chain: self.serialize(),
            metadata: self.metadata.clone(),
            exp: self.exp,
            parties_involved: self.parties_involved(),
            trust_marks: self.verified_trust_marks.clone(),
            status,
            is_active: status == ChainStatus::Valid,
            updated_at: now,
        }
    }
}

impl From<TrustChain> for TrustChainRecord {
    fn from(chain: TrustChain) -> Self {
        chain.to_record(crate::time::now_secs())
    }
}
