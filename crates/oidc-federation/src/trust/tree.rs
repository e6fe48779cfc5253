//! Tree of trust — the depth-indexed result of a walk.
//!
//! Level 0 holds exactly the subject's entity configuration. Every node
//! at level `d >= 1` is a superior reached from a node at level `d - 1`:
//! it holds that superior's configuration, the subordinate statement the
//! superior issued about the node below, and the index of that node.
//!
//! Levels are only ever appended; a finished level is never touched.

use std::sync::Arc;

use crate::entity::{EntityId, EntityStatement};

/// One validated superior (or the subject, at depth 0).
#[derive(Debug, Clone)]
pub struct Node {
    configuration: Arc<EntityStatement>,
    statement: Option<Arc<EntityStatement>>,
    descendant: Option<usize>,
    rejected: usize,
}

impl Node {
    pub(crate) fn subject(configuration: Arc<EntityStatement>) -> Self {
        Self {
            configuration,
            statement: None,
            descendant: None,
            rejected: 0,
        }
    }

    pub(crate) fn superior(
        configuration: Arc<EntityStatement>,
        statement: Arc<EntityStatement>,
        descendant: usize,
        rejected: usize,
    ) -> Self {
        Self {
            configuration,
            statement: Some(statement),
            descendant: Some(descendant),
            rejected,
        }
    }

    pub fn id(&self) -> &EntityId {
        self.configuration.sub()
    }

    /// The entity's own configuration.
    pub fn configuration(&self) -> &Arc<EntityStatement> {
        &self.configuration
    }

    /// The statement this entity issued about its descendant. `None` at depth 0.
    pub fn statement(&self) -> Option<&Arc<EntityStatement>> {
        self.statement.as_ref()
    }

    /// Index of the descendant node in the level below.
    pub fn descendant(&self) -> Option<usize> {
        self.descendant
    }

    /// Rejected sibling candidates accumulated along this branch.
    pub fn rejected(&self) -> usize {
        self.rejected
    }
}

/// Depth-indexed levels of validated nodes.
#[derive(Debug, Clone)]
pub struct TreeOfTrust {
    levels: Vec<Vec<Node>>,
}

impl TreeOfTrust {
    pub fn new(subject: Arc<EntityStatement>) -> Self {
        Self {
            levels: vec![vec![Node::subject(subject)]],
        }
    }

    /// Append the next level.
    pub(crate) fn with_level(mut self, level: Vec<Node>) -> Self {
        self.levels.push(level);
        self
    }

    /// Index of the deepest level.
    pub fn depth(&self) -> usize {
        self.levels.len() - 1
    }

    pub fn level(&self, depth: usize) -> &[Node] {
        self.levels.get(depth).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn subject(&self) -> &Arc<EntityStatement> {
        &self.levels[0][0].configuration
    }

    /// Nodes from `(depth, index)` down to the subject, inclusive.
    pub fn branch(&self, depth: usize, index: usize) -> Vec<&Node> {
        let mut nodes = Vec::with_capacity(depth + 1);
        let mut cursor = self.level(depth).get(index);
        let mut d = depth;
        while let Some(node) = cursor {
            nodes.push(node);
            match (node.descendant, d.checked_sub(1)) {
                (Some(below), Some(next)) => {
                    cursor = self.level(next).get(below);
                    d = next;
                }
                _ => cursor = None,
            }
        }
        nodes
    }

    /// Entity ids on the branch ending at `(depth, index)`.
    pub fn branch_ids(&self, depth: usize, index: usize) -> Vec<EntityId> {
        self.branch(depth, index)
            .into_iter()
            .map(|node| node.id().clone())
            .collect()
    }

    /// Indices of the nodes in the deepest level whose entity is `anchor`.
    pub fn anchor_nodes(&self, anchor: &EntityId) -> Vec<usize> {
        self.level(self.depth())
            .iter()
            .enumerate()
            .filter(|(_, node)| node.id() == anchor)
            .map(|(i, _)| i)
            .collect()
    }

    /// Total number of nodes across all levels.
    pub fn len(&self) -> usize {
        self.levels.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
