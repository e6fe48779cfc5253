//! Trust paths — the selected linear chain from subject to anchor.
//!
//! A path is ordered subject-first:
//!
//! ```text
//! [ subject configuration,
//!   statement(superior_1 about subject),
//!   statement(superior_2 about superior_1),
//!   ...
//!   statement(anchor about superior_n),
//!   anchor configuration ]
//! ```
//!
//! Each statement's issuer is the subject of the next one.

use std::sync::Arc;

use crate::entity::{EntityId, EntityStatement, StatementValidator};
use crate::error::{FederationError, Result, ValidationError};

use super::tree::TreeOfTrust;

/// An ordered, fully linked sequence of validated statements.
#[derive(Debug, Clone)]
pub struct TrustPath {
    statements: Vec<Arc<EntityStatement>>,
}

impl TrustPath {
    /// Link and check a path.
    ///
    /// Checks every adjacent pair, that the last subordinate statement was
    /// issued by the anchor, and that the anchor's path length constraint
    /// holds.
    pub fn new(statements: Vec<Arc<EntityStatement>>) -> Result<Self> {
        if statements.len() < 3 {
            return Err(ValidationError::MalformedToken(format!(
                "a trust path needs at least three statements, got {}",
                statements.len()
            ))
            .into());
        }
        let path = Self { statements };

        if !path.subject_configuration().is_self_issued() {
            let subject = path.subject_configuration();
            return Err(ValidationError::NotSelfIssued {
                iss: subject.iss().to_string(),
                sub: subject.sub().to_string(),
            }
            .into());
        }
        let anchor = path.anchor_configuration();
        if !anchor.is_self_issued() {
            return Err(ValidationError::NotSelfIssued {
                iss: anchor.iss().to_string(),
                sub: anchor.sub().to_string(),
            }
            .into());
        }

        for pair in path.statements.windows(2) {
            if pair[0].iss() != pair[1].sub() {
                return Err(ValidationError::IssuerMismatch {
                    expected: pair[1].sub().to_string(),
                    found: pair[0].iss().to_string(),
                }
                .into());
            }
        }

        let max_path_length = anchor.max_path_length().unwrap_or(0);
        if path.hops() - 1 > max_path_length as usize {
            return Err(FederationError::MaxPathExceeded { max_path_length });
        }
        Ok(path)
    }

    /// Re-verify a serialized chain without any fetch.
    ///
    /// The anchor configuration must be self-signed. Working down from the
    /// anchor, each subordinate statement must verify under the keys the
    /// statement above attests for its issuer. The subject configuration
    /// must verify under its own keys and under the keys its superior
    /// attests, and must name that superior as an authority hint.
    pub fn from_tokens(tokens: &[String], validator: &StatementValidator) -> Result<Self> {
        let (Some((anchor_token, rest)), true) = (tokens.split_last(), tokens.len() >= 3) else {
            return Err(ValidationError::MalformedToken(format!(
                "a trust chain needs at least three statements, got {}",
                tokens.len()
            ))
            .into());
        };
        let Some((subject_token, subordinates)) = rest.split_first() else {
            return Err(ValidationError::MalformedToken("trust chain has no subject".into()).into());
        };

        let anchor = Arc::new(validator.entity_configuration(anchor_token)?);
        let mut issuer = Arc::clone(&anchor);
        let mut verified = Vec::with_capacity(subordinates.len());
        for token in subordinates.iter().rev() {
            let keys = issuer.jwks().ok_or(ValidationError::MissingClaim("jwks"))?;
            let statement = Arc::new(validator.signed_by(token, keys)?);
            verified.push(Arc::clone(&statement));
            issuer = statement;
        }

        let subject = Arc::new(validator.entity_configuration(subject_token)?);
        let attested = issuer.jwks().ok_or(ValidationError::MissingClaim("jwks"))?;
        validator
            .signed_by(subject_token, attested)
            .map_err(|e| ValidationError::KeysNotAttested(e.to_string()))?;
        if !subject.authority_hints().contains(issuer.iss()) {
            return Err(ValidationError::NotAnAuthorityHint {
                issuer: issuer.iss().to_string(),
                subject: subject.sub().to_string(),
            }
            .into());
        }

        let mut statements = Vec::with_capacity(tokens.len());
        statements.push(subject);
        statements.extend(verified.into_iter().rev());
        statements.push(anchor);
        Self::new(statements)
    }

    /// All statements, subject first.
    pub fn statements(&self) -> &[Arc<EntityStatement>] {
        &self.statements
    }

    pub fn subject_configuration(&self) -> &EntityStatement {
        &self.statements[0]
    }

    pub fn anchor_configuration(&self) -> &EntityStatement {
        &self.statements[self.statements.len() - 1]
    }

    /// Subordinate statements, the one about the subject first.
    pub fn subordinate_statements(&self) -> &[Arc<EntityStatement>] {
        &self.statements[1..self.statements.len() - 1]
    }

    /// Number of subordinate statements in the path.
    pub fn hops(&self) -> usize {
        self.statements.len() - 2
    }

    pub fn subject(&self) -> &EntityId {
        self.subject_configuration().sub()
    }

    pub fn trust_anchor(&self) -> &EntityId {
        self.anchor_configuration().sub()
    }

    /// Earliest expiration over the whole path.
    pub fn exp(&self) -> i64 {
        self.statements
            .iter()
            .map(|s| s.exp())
            .min()
            .unwrap_or(i64::MIN)
    }

    /// Raw tokens, subject first.
    pub fn tokens(&self) -> Vec<String> {
        self.statements.iter().map(|s| s.token().to_string()).collect()
    }

    /// Entities on the path: the subject, every intermediate, the anchor.
    pub fn parties_involved(&self) -> Vec<EntityId> {
        std::iter::once(self.subject().clone())
            .chain(self.subordinate_statements().iter().map(|s| s.iss().clone()))
            .collect()
    }
}

/// Pick the path to use from a finished walk.
///
/// Candidates are the anchor nodes on the deepest level, which all share
/// the shortest length. The one with the fewest rejected siblings along
/// its branch wins; ties go to the first discovered.
pub fn select_path(
    tree: &TreeOfTrust,
    anchor: &EntityStatement,
    validator: &StatementValidator,
) -> Result<TrustPath> {
    let depth = tree.depth();
    let level = tree.level(depth);
    let chosen = tree
        .anchor_nodes(anchor.sub())
        .into_iter()
        .min_by_key(|&i| level[i].rejected())
        .ok_or_else(|| FederationError::AnchorUnreachable {
            anchor: anchor.sub().clone(),
            attempts: 0,
        })?;

    let branch = tree.branch(depth, chosen);
    let mut statements = Vec::with_capacity(depth + 2);
    statements.push(Arc::clone(tree.subject()));
    for node in branch.iter().rev() {
        if let Some(statement) = node.statement() {
            statements.push(Arc::clone(statement));
        }
    }

    let last = &statements[statements.len() - 1];
    if last.iss() != anchor.sub() {
        return Err(ValidationError::IssuerMismatch {
            expected: anchor.sub().to_string(),
            found: last.iss().to_string(),
        }
        .into());
    }
    statements.push(Arc::new(validator.entity_configuration(anchor.token())?));

    log::debug!(
        "selected path of {} hops to {} (rejected siblings: {})",
        depth,
        anchor.sub(),
        level[chosen].rejected()
    );
    TrustPath::new(statements)
}
