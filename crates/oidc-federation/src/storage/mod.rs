//! Statement and trust chain persistence — the caching collaborator.
//!
//! The resolver reads the store at the start of a run (cache check) and
//! writes it at the end (cache population). Writes are upserts by key, so
//! concurrent runs for the same `(subject, anchor, type)` never leave two
//! persisted chains behind.
//!
//! # Modules
//!
//! - [`memory_store`] — `HashMap`s behind a lock.
//! - [`file_store`] — versioned JSON files, one per key.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entity::{EntityId, EntityType};
use crate::error::Result;

pub mod file_store;
pub mod memory_store;

pub use file_store::FileStatementStore;
pub use memory_store::MemoryStatementStore;

/// A fetched statement as persisted, keyed by `(sub, iss)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredStatement {
    pub sub: EntityId,
    pub iss: EntityId,
    pub token: String,
    pub iat: i64,
    pub exp: i64,
}

impl StoredStatement {
    pub fn is_expired_at(&self, now: i64) -> bool {
        now >= self.exp
    }
}

/// Lifecycle status of a persisted trust chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChainStatus {
    Valid,
    Expired,
    Revoked,
}

/// A trust chain as persisted, keyed by `(sub, trust_anchor, entity_type)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustChainRecord {
    pub sub: EntityId,
    pub trust_anchor: EntityId,
    pub entity_type: EntityType,
    /// Raw tokens, subject configuration first, anchor configuration last.
    pub chain: Vec<String>,
    pub metadata: Map<String, Value>,
    pub exp: i64,
    pub parties_involved: Vec<EntityId>,
    #[serde(default)]
    pub trust_marks: Vec<String>,
    pub status: ChainStatus,
    pub is_active: bool,
    pub updated_at: i64,
}

impl TrustChainRecord {
    /// Whether the record can be served from cache at `now`.
    pub fn is_usable_at(&self, now: i64) -> bool {
        self.is_active && self.status == ChainStatus::Valid && now < self.exp
    }
}

/// Persistence for statements and resolved chains.
///
/// Absent, expired, and deactivated entries are all treated as cache
/// misses by the resolver.
#[async_trait]
pub trait StatementStore: Send + Sync {
    async fn get(&self, sub: &EntityId, iss: &EntityId) -> Result<Option<StoredStatement>>;

    /// Insert or replace the statement keyed by `(sub, iss)`.
    async fn put(&self, statement: StoredStatement) -> Result<()>;

    async fn get_trust_chain(
        &self,
        sub: &EntityId,
        trust_anchor: &EntityId,
        entity_type: EntityType,
    ) -> Result<Option<TrustChainRecord>>;

    /// Insert or replace the chain keyed by `(sub, trust_anchor, entity_type)`.
    async fn put_trust_chain(&self, record: TrustChainRecord) -> Result<()>;

    /// Mark a persisted chain revoked. Returns `false` if none was stored.
    async fn deactivate_trust_chain(
        &self,
        sub: &EntityId,
        trust_anchor: &EntityId,
        entity_type: EntityType,
    ) -> Result<bool>;
}
