//! Trust walker — bounded breadth-first expansion toward the anchor.
//!
//! The walk grows a [`TreeOfTrust`] one level at a time. Depth `d + 1` is
//! only started once every node at depth `d` has been expanded, and the
//! loop is bounded by the anchor's `constraints.max_path_length`:
//!
//! - `max_path_length == 0`: the subject must name the anchor directly;
//!   only that last hop is fetched and validated.
//! - otherwise: expand while `depth <= max_path_length`. An empty level
//!   ends the walk with the failure that emptied it; a level holding the
//!   anchor ends it successfully.
//!
//! Intermediates are expanded at most once per run (first discovery
//! wins). Anchor nodes are kept for every branch that reaches them so
//! that path selection can choose among alternative last hops.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;

use crate::entity::{EntityId, EntityStatement};
use crate::error::{FederationError, Result};

use super::discovery::{Discovered, Discovery};
use super::tree::{Node, TreeOfTrust};

/// Walk from `subject` toward the anchor held by `discovery`.
pub async fn walk(subject: Arc<EntityStatement>, discovery: &Discovery<'_>) -> Result<TreeOfTrust> {
    let anchor_id = discovery.anchor().sub().clone();
    let max_path_length = discovery.anchor().max_path_length().unwrap_or(0);
    let tree = TreeOfTrust::new(Arc::clone(&subject));

    if max_path_length == 0 {
        return last_hop(tree, &subject, discovery).await;
    }

    let mut tree = tree;
    let mut expanded: HashSet<EntityId> = HashSet::from([subject.sub().clone()]);
    let mut depth = 0usize;

    while depth <= max_path_length as usize {
        let level = tree.level(depth);
        let branches: Vec<Vec<EntityId>> =
            (0..level.len()).map(|i| tree.branch_ids(depth, i)).collect();

        let skip = &expanded;
        let outcomes: Vec<Option<Discovered>> =
            join_all(level.iter().zip(&branches).map(|(node, branch)| async move {
                let configuration = node.configuration();
                if configuration.authority_hints().is_empty() {
                    None
                } else {
                    Some(discovery.superiors_of(configuration, branch, skip).await)
                }
            }))
            .await;

        let mut next = Vec::new();
        let mut failures = Vec::new();
        for (index, (node, outcome)) in level.iter().zip(outcomes).enumerate() {
            let Some(discovered) = outcome else {
                log::debug!("{} has no authority hints; branch ends", node.id());
                failures.push(FederationError::NoAuthorityHints(node.id().clone()));
                continue;
            };
            let rejected = node.rejected() + discovered.failures.len();
            for superior in discovered.superiors {
                let id = superior.configuration.sub();
                if id != &anchor_id && !expanded.insert(id.clone()) {
                    continue;
                }
                next.push(Node::superior(
                    superior.configuration,
                    superior.statement,
                    index,
                    rejected,
                ));
            }
            failures.extend(discovered.failures.into_iter().map(|(_, e)| e));
        }

        log::debug!(
            "depth {} expanded: {} nodes, {} rejected candidates",
            depth + 1,
            next.len(),
            failures.len()
        );

        if next.is_empty() {
            return Err(no_path(failures, anchor_id));
        }
        let reached = next.iter().any(|node| node.id() == &anchor_id);
        tree = tree.with_level(next);
        if reached {
            return Ok(tree);
        }
        depth += 1;
    }

    Err(FederationError::MaxPathExceeded { max_path_length })
}

/// Direct subject-to-anchor linkage, used when no intermediates are allowed.
async fn last_hop(
    tree: TreeOfTrust,
    subject: &EntityStatement,
    discovery: &Discovery<'_>,
) -> Result<TreeOfTrust> {
    let anchor_id = discovery.anchor().sub();
    if subject.authority_hints().is_empty() {
        return Err(FederationError::NoAuthorityHints(subject.sub().clone()));
    }
    if !discovery.candidates(subject).contains(&anchor_id) {
        return Err(FederationError::AnchorUnreachable {
            anchor: anchor_id.clone(),
            attempts: 0,
        });
    }

    let superior = discovery.superior(anchor_id, subject).await?;
    Ok(tree.with_level(vec![Node::superior(
        superior.configuration,
        superior.statement,
        0,
        0,
    )]))
}

/// A single failure is reported as itself; several collapse into
/// `AnchorUnreachable`.
fn no_path(mut failures: Vec<FederationError>, anchor: EntityId) -> FederationError {
    let attempts = failures.len();
    match (failures.pop(), failures.is_empty()) {
        (Some(only), true) => only,
        _ => FederationError::AnchorUnreachable { anchor, attempts },
    }
}
