//! Federation fixtures shared by unit tests.

use serde_json::Value;

use crate::crypto::{Ed25519KeyPair, Jwks};
use crate::entity::{EntityId, EntityType, StatementBuilder, StatementValidator};
use crate::fetch::MemoryFetcher;

/// Fixed validation time for pure tests.
pub(crate) const NOW: i64 = 1_700_000_000;

/// Expiry far enough out that fixtures also validate at wall-clock time.
pub(crate) const FAR_EXP: i64 = 4_000_000_000;

pub(crate) fn validator() -> StatementValidator {
    StatementValidator::new(NOW, vec!["EdDSA".to_string()])
}

/// A federation participant with its signing key.
pub(crate) struct Member {
    pub id: EntityId,
    pub key: Ed25519KeyPair,
}

pub(crate) fn member(url: &str) -> Member {
    Member {
        id: EntityId::parse(url).unwrap(),
        key: Ed25519KeyPair::generate(),
    }
}

impl Member {
    pub fn jwks(&self) -> Jwks {
        Jwks::new(vec![self.key.public_jwk()])
    }

    /// Entity configuration builder with keys and a long lifetime set.
    pub fn configuration(&self) -> StatementBuilder {
        StatementBuilder::entity_configuration(self.id.clone())
            .lifetime(NOW - 10, FAR_EXP)
            .jwks(self.jwks())
    }

    pub fn configuration_with_hints(&self, hints: &[&Member]) -> String {
        self.configuration()
            .authority_hints(hints.iter().map(|m| m.id.clone()).collect())
            .sign(&self.key)
            .unwrap()
    }

    /// Builder for the statement this member issues about `subject`.
    pub fn subordinate(&self, subject: &Member) -> StatementBuilder {
        StatementBuilder::subordinate(self.id.clone(), subject.id.clone())
            .lifetime(NOW - 10, FAR_EXP)
            .jwks(subject.jwks())
    }

    pub fn subordinate_about(&self, subject: &Member) -> String {
        self.subordinate(subject).sign(&self.key).unwrap()
    }

    pub fn sign(&self, builder: StatementBuilder) -> String {
        builder.sign(&self.key).unwrap()
    }
}

/// Publish `subject`'s configuration with `hints` and a statement about it
/// from every hint.
pub(crate) fn publish_linked(fetcher: &MemoryFetcher, subject: &Member, hints: &[&Member]) {
    fetcher.publish_configuration(&subject.id, subject.configuration_with_hints(hints));
    for superior in hints {
        fetcher.publish_subordinate(&superior.id, &subject.id, superior.subordinate_about(subject));
    }
}

/// Publish an anchor configuration with the given path length constraint.
pub(crate) fn publish_anchor(fetcher: &MemoryFetcher, anchor: &Member, max_path_length: u32) {
    let token = anchor.sign(anchor.configuration().max_path_length(max_path_length));
    fetcher.publish_configuration(&anchor.id, token);
}

/// Publish a relying-party configuration carrying `metadata`.
pub(crate) fn publish_rp(
    fetcher: &MemoryFetcher,
    rp: &Member,
    hints: &[&Member],
    metadata: Value,
) {
    let token = rp.sign(
        rp.configuration()
            .authority_hints(hints.iter().map(|m| m.id.clone()).collect())
            .metadata(EntityType::OpenidRelyingParty, metadata),
    );
    fetcher.publish_configuration(&rp.id, token);
    for superior in hints {
        fetcher.publish_subordinate(&superior.id, &rp.id, superior.subordinate_about(rp));
    }
}
