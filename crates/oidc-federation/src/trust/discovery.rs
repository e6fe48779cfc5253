//! Superior discovery — one hop of the walk.
//!
//! For a validated entity configuration, follow its authority hints (in
//! listed order, duplicates collapsed, capped at `max_authority_hints`),
//! fetch each superior's configuration and the subordinate statement it
//! issued about the entity, and validate both. Candidates are fetched
//! concurrently; a failing candidate is recorded and never affects its
//! siblings.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use crate::entity::{EntityId, EntityStatement, StatementValidator};
use crate::error::{FederationError, Result};
use crate::fetch::StatementFetcher;

/// A validated superior of some descendant.
#[derive(Debug, Clone)]
pub struct Superior {
    pub configuration: Arc<EntityStatement>,
    /// The statement the superior issued about the descendant.
    pub statement: Arc<EntityStatement>,
}

/// Outcome of expanding one entity.
#[derive(Debug, Default)]
pub struct Discovered {
    /// Validated superiors, in hint order.
    pub superiors: Vec<Superior>,
    /// Rejected candidates with the reason.
    pub failures: Vec<(EntityId, FederationError)>,
}

/// Everything a hop needs; shared by every expansion in one run.
pub struct Discovery<'a> {
    fetcher: &'a dyn StatementFetcher,
    validator: &'a StatementValidator,
    anchor: Arc<EntityStatement>,
    max_authority_hints: usize,
}

impl<'a> Discovery<'a> {
    pub fn new(
        fetcher: &'a dyn StatementFetcher,
        validator: &'a StatementValidator,
        anchor: Arc<EntityStatement>,
        max_authority_hints: usize,
    ) -> Self {
        Self {
            fetcher,
            validator,
            anchor,
            max_authority_hints,
        }
    }

    pub fn anchor(&self) -> &Arc<EntityStatement> {
        &self.anchor
    }

    pub fn validator(&self) -> &StatementValidator {
        self.validator
    }

    /// The hints that will be followed: listed order, duplicates
    /// collapsed, truncated to the fan-out cap.
    pub fn candidates<'s>(&self, descendant: &'s EntityStatement) -> Vec<&'s EntityId> {
        let mut seen = HashSet::new();
        descendant
            .authority_hints()
            .iter()
            .filter(|hint| seen.insert(*hint))
            .take(self.max_authority_hints)
            .collect()
    }

    /// Expand `descendant`.
    ///
    /// `branch` holds the ids already on the descendant's branch; a hint
    /// among them is rejected as a cycle without any fetch. Hints in
    /// `skip` are dropped silently, also without a fetch.
    pub async fn superiors_of(
        &self,
        descendant: &EntityStatement,
        branch: &[EntityId],
        skip: &HashSet<EntityId>,
    ) -> Discovered {
        let mut discovered = Discovered::default();
        let mut pending = Vec::new();

        for hint in self.candidates(descendant) {
            if branch.contains(hint) {
                log::warn!("authority hint {hint} of {} closes a cycle", descendant.sub());
                discovered
                    .failures
                    .push((hint.clone(), FederationError::CycleDetected(hint.clone())));
            } else if !skip.contains(hint) {
                pending.push(hint);
            }
        }

        let results = join_all(
            pending
                .iter()
                .map(|hint| self.superior(hint, descendant)),
        )
        .await;

        for (hint, result) in pending.into_iter().zip(results) {
            match result {
                Ok(superior) => discovered.superiors.push(superior),
                Err(e) => {
                    log::warn!("rejected superior {hint} of {}: {e}", descendant.sub());
                    discovered.failures.push((hint.clone(), e));
                }
            }
        }
        discovered
    }

    /// Fetch and validate one superior and its statement about `descendant`.
    pub async fn superior(
        &self,
        hint: &EntityId,
        descendant: &EntityStatement,
    ) -> Result<Superior> {
        let configuration = if hint == self.anchor.sub() {
            Arc::clone(&self.anchor)
        } else {
            let token = self.fetcher.fetch_entity_configuration(hint).await?;
            Arc::new(self.validator.entity_configuration_of(&token, hint)?)
        };

        let token = self
            .fetcher
            .fetch_subordinate_statement(hint, descendant.sub())
            .await?;
        let statement =
            self.validator
                .subordinate_statement(&token, &configuration, descendant)?;

        log::debug!("validated {hint} as superior of {}", descendant.sub());
        Ok(Superior {
            configuration,
            statement: Arc::new(statement),
        })
    }
}
