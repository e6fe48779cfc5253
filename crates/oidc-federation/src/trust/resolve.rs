//! Resolution entry point.
//!
//! A run resolves one subject under one anchor for one entity type:
//!
//! 1. Cache check: an active, unexpired stored chain carrying every
//!    required trust mark is re-verified offline and returned.
//! 2. Anchor configuration: from the store when fresh, else fetched;
//!    always validated under its own keys.
//! 3. Subject configuration: fetched, validated and bound to the subject id.
//! 4. Walk, select, verify trust marks, merge metadata, assemble.
//! 5. Persist the path statements and the chain record.
//!
//! Steps 1-4 run under the configured timeout. Nothing is persisted when
//! a run fails or times out. Store failures are logged and never fail a
//! run that otherwise succeeded.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ResolverConfig;
use crate::entity::{EntityId, EntityStatement, EntityType, StatementValidator};
use crate::error::{FederationError, InvalidTrustChainError, Result};
use crate::fetch::StatementFetcher;
use crate::storage::{StatementStore, StoredStatement};

use super::chain::TrustChain;
use super::discovery::Discovery;
use super::marks::verify_trust_marks;
use super::path::select_path;
use super::policy::apply_metadata_policy;
use super::walker::walk;

/// What to resolve.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveRequest {
    pub subject: EntityId,
    pub trust_anchor: EntityId,
    pub entity_type: EntityType,
    pub required_trust_marks: Vec<String>,
    /// Bypass the cache even when a usable chain is stored.
    pub force: bool,
}

impl ResolveRequest {
    pub fn new(subject: EntityId, trust_anchor: EntityId, entity_type: EntityType) -> Self {
        Self {
            subject,
            trust_anchor,
            entity_type,
            required_trust_marks: Vec::new(),
            force: false,
        }
    }

    pub fn require_trust_mark(mut self, id: impl Into<String>) -> Self {
        self.required_trust_marks.push(id.into());
        self
    }

    pub fn force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    fn invalid(&self, source: FederationError) -> InvalidTrustChainError {
        InvalidTrustChainError {
            subject: self.subject.clone(),
            trust_anchor: self.trust_anchor.clone(),
            entity_type: self.entity_type,
            source,
        }
    }
}

/// Resolve a trust chain with explicit collaborators.
pub async fn resolve_trust_chain(
    request: &ResolveRequest,
    fetcher: &dyn StatementFetcher,
    store: &dyn StatementStore,
    config: &ResolverConfig,
) -> std::result::Result<TrustChain, InvalidTrustChainError> {
    config.validate().map_err(|e| request.invalid(e))?;
    let now = crate::time::now_secs();
    let validator = StatementValidator::from_config(config, now);

    log::info!(
        "resolving {} under {} as {}{}",
        request.subject,
        request.trust_anchor,
        request.entity_type,
        if request.force { " (forced)" } else { "" }
    );

    let resolution = run(request, fetcher, store, config, &validator);
    let outcome = match config.resolution_timeout_secs {
        Some(secs) => tokio::time::timeout(Duration::from_secs(secs), resolution)
            .await
            .unwrap_or(Err(FederationError::Timeout(secs))),
        None => resolution.await,
    };

    match outcome {
        Ok(Resolved::Cached(chain)) => {
            log::info!("served {} from cache until {}", chain.subject(), chain.exp_datetime());
            Ok(chain)
        }
        Ok(Resolved::Fresh(chain)) => {
            persist(&chain, store, now).await;
            log::info!(
                "resolved {} in {} hops, valid until {}",
                chain.subject(),
                chain.path().hops(),
                chain.exp_datetime()
            );
            Ok(chain)
        }
        Err(e) => {
            log::warn!(
                "trust chain for {} under {} is invalid: {e}",
                request.subject,
                request.trust_anchor
            );
            Err(request.invalid(e))
        }
    }
}

enum Resolved {
    Cached(TrustChain),
    Fresh(TrustChain),
}

async fn run(
    request: &ResolveRequest,
    fetcher: &dyn StatementFetcher,
    store: &dyn StatementStore,
    config: &ResolverConfig,
    validator: &StatementValidator,
) -> Result<Resolved> {
    if !request.force {
        if let Some(chain) = cached(request, store, validator).await {
            return Ok(Resolved::Cached(chain));
        }
    }

    let anchor = Arc::new(anchor_configuration(request, fetcher, store, validator).await?);
    let subject_token = fetcher.fetch_entity_configuration(&request.subject).await?;
    let subject = Arc::new(validator.entity_configuration_of(&subject_token, &request.subject)?);

    let discovery = Discovery::new(fetcher, validator, Arc::clone(&anchor), config.max_authority_hints);
    let tree = walk(Arc::clone(&subject), &discovery).await?;
    let path = select_path(&tree, &anchor, validator)?;

    let marks = verify_trust_marks(
        path.subject_configuration(),
        path.anchor_configuration(),
        &request.required_trust_marks,
        fetcher,
        validator,
    )
    .await?;
    let metadata = apply_metadata_policy(&path, request.entity_type)?;

    Ok(Resolved::Fresh(TrustChain::new(
        path,
        request.entity_type,
        metadata,
        marks,
    )))
}

/// A stored chain that can be served as-is, if any.
async fn cached(
    request: &ResolveRequest,
    store: &dyn StatementStore,
    validator: &StatementValidator,
) -> Option<TrustChain> {
    let record = match store
        .get_trust_chain(&request.subject, &request.trust_anchor, request.entity_type)
        .await
    {
        Ok(record) => record?,
        Err(e) => {
            log::warn!("cache lookup for {} failed: {e}", request.subject);
            return None;
        }
    };

    if !record.is_usable_at(validator.now()) {
        log::debug!("stored chain for {} is {:?}; resolving again", record.sub, record.status);
        return None;
    }
    match TrustChain::from_record(&record, validator) {
        Ok(chain) if chain.satisfies(&request.required_trust_marks) => Some(chain),
        Ok(_) => {
            log::debug!("stored chain for {} lacks required trust marks", record.sub);
            None
        }
        Err(e) => {
            log::warn!("stored chain for {} no longer verifies: {e}", record.sub);
            None
        }
    }
}

async fn anchor_configuration(
    request: &ResolveRequest,
    fetcher: &dyn StatementFetcher,
    store: &dyn StatementStore,
    validator: &StatementValidator,
) -> Result<EntityStatement> {
    let anchor = &request.trust_anchor;
    if !request.force {
        match store.get(anchor, anchor).await {
            Ok(Some(stored)) if !stored.is_expired_at(validator.now()) => {
                match validator.entity_configuration_of(&stored.token, anchor) {
                    Ok(statement) => return Ok(statement),
                    Err(e) => log::warn!("stored configuration of {anchor} rejected: {e}"),
                }
            }
            Ok(_) => {}
            Err(e) => log::warn!("store lookup for {anchor} failed: {e}"),
        }
    }

    let token = fetcher.fetch_entity_configuration(anchor).await?;
    Ok(validator.entity_configuration_of(&token, anchor)?)
}

/// Write the path statements and the chain record. Failures are logged.
async fn persist(chain: &TrustChain, store: &dyn StatementStore, now: i64) {
    for statement in chain.trust_path() {
        let stored = StoredStatement {
            sub: statement.sub().clone(),
            iss: statement.iss().clone(),
            token: statement.token().to_string(),
            iat: statement.iat(),
            exp: statement.exp(),
        };
        if let Err(e) = store.put(stored).await {
            log::warn!(
                "failed to store statement by {} about {}: {e}",
                statement.iss(),
                statement.sub()
            );
        }
    }
    if let Err(e) = store.put_trust_chain(chain.to_record(now)).await {
        log::warn!("failed to store trust chain for {}: {e}", chain.subject());
    }
}

/// Resolver holding its collaborators and configuration.
pub struct TrustChainResolver {
    fetcher: Arc<dyn StatementFetcher>,
    store: Arc<dyn StatementStore>,
    config: ResolverConfig,
}

impl TrustChainResolver {
    pub fn new(
        fetcher: Arc<dyn StatementFetcher>,
        store: Arc<dyn StatementStore>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            fetcher,
            store,
            config,
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn StatementStore> {
        &self.store
    }

    pub async fn resolve(
        &self,
        request: &ResolveRequest,
    ) -> std::result::Result<TrustChain, InvalidTrustChainError> {
        resolve_trust_chain(request, self.fetcher.as_ref(), self.store.as_ref(), &self.config).await
    }

    /// Revoke a stored chain so the next request resolves it again.
    pub async fn revoke(
        &self,
        subject: &EntityId,
        trust_anchor: &EntityId,
        entity_type: EntityType,
    ) -> Result<bool> {
        let revoked = self
            .store
            .deactivate_trust_chain(subject, trust_anchor, entity_type)
            .await?;
        if revoked {
            log::info!("revoked trust chain for {subject} under {trust_anchor} ({entity_type})");
        }
        Ok(revoked)
    }
}
