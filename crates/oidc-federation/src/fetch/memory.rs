//! In-memory statement fetcher.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, RwLock};

use async_trait::async_trait;

use crate::entity::EntityId;
use crate::error::{FederationError, Result};

use super::StatementFetcher;

/// Serves registered tokens and records every request it receives.
///
/// Requests for unregistered statements, or for entities marked
/// unreachable, fail with a network error as a real transport would.
#[derive(Default)]
pub struct MemoryFetcher {
    configurations: RwLock<HashMap<EntityId, String>>,
    subordinates: RwLock<HashMap<(EntityId, EntityId), String>>,
    unreachable: RwLock<HashSet<EntityId>>,
    requests: Mutex<Vec<String>>,
    fetch_count: AtomicUsize,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the entity configuration of `id`.
    pub fn publish_configuration(&self, id: &EntityId, token: impl Into<String>) {
        if let Ok(mut map) = self.configurations.write() {
            map.insert(id.clone(), token.into());
        }
    }

    /// Register (or replace) the statement `issuer` serves about `subject`.
    pub fn publish_subordinate(&self, issuer: &EntityId, subject: &EntityId, token: impl Into<String>) {
        if let Ok(mut map) = self.subordinates.write() {
            map.insert((issuer.clone(), subject.clone()), token.into());
        }
    }

    /// Make every request to `id` fail.
    pub fn set_unreachable(&self, id: &EntityId) {
        if let Ok(mut set) = self.unreachable.write() {
            set.insert(id.clone());
        }
    }

    /// Total number of fetches attempted.
    pub fn fetch_count(&self) -> usize {
        self.fetch_count.load(Ordering::SeqCst)
    }

    /// URLs requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    /// Whether any request was addressed to `id`.
    pub fn was_contacted(&self, id: &EntityId) -> bool {
        let prefix = id.as_str().trim_end_matches('/');
        self.requests().iter().any(|url| url.starts_with(prefix))
    }

    fn record(&self, url: &str) {
        self.fetch_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(url.to_string());
        }
    }

    fn check_reachable(&self, id: &EntityId, url: &str) -> Result<()> {
        let unreachable = self
            .unreachable
            .read()
            .map(|set| set.contains(id))
            .unwrap_or(false);
        if unreachable {
            return Err(FederationError::Network {
                url: url.to_string(),
                reason: "connection refused".into(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StatementFetcher for MemoryFetcher {
    async fn fetch_entity_configuration(&self, id: &EntityId) -> Result<String> {
        let url = id.well_known_url();
        self.record(&url);
        self.check_reachable(id, &url)?;
        self.configurations
            .read()
            .ok()
            .and_then(|map| map.get(id).cloned())
            .ok_or_else(|| FederationError::Network {
                url,
                reason: "404 Not Found".into(),
            })
    }

    async fn fetch_subordinate_statement(
        &self,
        issuer: &EntityId,
        subject: &EntityId,
    ) -> Result<String> {
        let url = format!(
            "{}/fetch?sub={subject}",
            issuer.as_str().trim_end_matches('/')
        );
        self.record(&url);
        self.check_reachable(issuer, &url)?;
        self.subordinates
            .read()
            .ok()
            .and_then(|map| map.get(&(issuer.clone(), subject.clone())).cloned())
            .ok_or_else(|| FederationError::Network {
                url,
                reason: "404 Not Found".into(),
            })
    }
}
