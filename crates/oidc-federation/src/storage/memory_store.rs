//! In-memory statement store.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::entity::{EntityId, EntityType};
use crate::error::{FederationError, Result};

use super::{ChainStatus, StatementStore, StoredStatement, TrustChainRecord};

type ChainKey = (EntityId, EntityId, EntityType);

/// Process-local store. Each write takes the lock once, so an upsert is
/// atomic with respect to concurrent readers and writers.
#[derive(Default)]
pub struct MemoryStatementStore {
    statements: RwLock<HashMap<(EntityId, EntityId), StoredStatement>>,
    chains: RwLock<HashMap<ChainKey, TrustChainRecord>>,
}

impl MemoryStatementStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of persisted chains.
    pub fn chain_count(&self) -> usize {
        self.chains.read().map(|c| c.len()).unwrap_or(0)
    }

    /// Number of persisted statements.
    pub fn statement_count(&self) -> usize {
        self.statements.read().map(|s| s.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> FederationError {
    FederationError::Storage("store lock poisoned".into())
}

#[async_trait]
impl StatementStore for MemoryStatementStore {
    async fn get(&self, sub: &EntityId, iss: &EntityId) -> Result<Option<StoredStatement>> {
        let statements = self.statements.read().map_err(poisoned)?;
        Ok(statements.get(&(sub.clone(), iss.clone())).cloned())
    }

    async fn put(&self, statement: StoredStatement) -> Result<()> {
        let mut statements = self.statements.write().map_err(poisoned)?;
        statements.insert((statement.sub.clone(), statement.iss.clone()), statement);
        Ok(())
    }

    async fn get_trust_chain(
        &self,
        sub: &EntityId,
        trust_anchor: &EntityId,
        entity_type: EntityType,
    ) -> Result<Option<TrustChainRecord>> {
        let chains = self.chains.read().map_err(poisoned)?;
        Ok(chains
            .get(&(sub.clone(), trust_anchor.clone(), entity_type))
            .cloned())
    }

    async fn put_trust_chain(&self, record: TrustChainRecord) -> Result<()> {
        let mut chains = self.chains.write().map_err(poisoned)?;
        let key = (
            record.sub.clone(),
            record.trust_anchor.clone(),
            record.entity_type,
        );
        chains.insert(key, record);
        Ok(())
    }

    async fn deactivate_trust_chain(
        &self,
        sub: &EntityId,
        trust_anchor: &EntityId,
        entity_type: EntityType,
    ) -> Result<bool> {
        let mut chains = self.chains.write().map_err(poisoned)?;
        match chains.get_mut(&(sub.clone(), trust_anchor.clone(), entity_type)) {
            Some(record) => {
                record.is_active = false;
                record.status = ChainStatus::Revoked;
                record.updated_at = crate::time::now_secs();
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
