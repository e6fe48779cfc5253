//! Shared federation fixtures for the workspace-level tests.
//!
//! Statements are issued with a wall-clock lifetime so they validate
//! when the resolver checks them against the current time.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use oidc_federation::crypto::{Ed25519KeyPair, Jwks};
use oidc_federation::trust::TrustMarkClaims;
use oidc_federation::{
    EntityId, EntityType, MemoryFetcher, ResolveRequest, ResolverConfig, StatementBuilder,
    StatementFetcher,
};

/// Expiry far beyond any test run.
pub const FAR_EXP: i64 = 4_000_000_000;

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

pub fn now() -> i64 {
    oidc_federation::time::now_secs()
}

/// A federation participant with its signing key.
pub struct Member {
    pub id: EntityId,
    pub key: Ed25519KeyPair,
}

pub fn member(url: &str) -> Member {
    Member {
        id: EntityId::parse(url).expect("fixture url should parse"),
        key: Ed25519KeyPair::generate(),
    }
}

impl Member {
    pub fn jwks(&self) -> Jwks {
        Jwks::new(vec![self.key.public_jwk()])
    }

    pub fn configuration(&self) -> StatementBuilder {
        StatementBuilder::entity_configuration(self.id.clone())
            .lifetime(now() - 60, FAR_EXP)
            .jwks(self.jwks())
    }

    pub fn subordinate(&self, subject: &Member) -> StatementBuilder {
        StatementBuilder::subordinate(self.id.clone(), subject.id.clone())
            .lifetime(now() - 60, FAR_EXP)
            .jwks(subject.jwks())
    }

    pub fn sign(&self, builder: StatementBuilder) -> String {
        builder.sign(&self.key).expect("fixture statement should sign")
    }

    pub fn trust_mark(&self, subject: &Member, id: &str) -> String {
        TrustMarkClaims::new(self.id.clone(), subject.id.clone(), id, now() - 60)
            .sign(&self.key)
            .expect("fixture trust mark should sign")
    }
}

fn hint_ids(hints: &[&Member]) -> Vec<EntityId> {
    hints.iter().map(|m| m.id.clone()).collect()
}

/// Publish `subject`'s configuration with `hints` and a statement about it
/// from every hint.
pub fn publish_linked(fetcher: &MemoryFetcher, subject: &Member, hints: &[&Member]) {
    let token = subject.sign(subject.configuration().authority_hints(hint_ids(hints)));
    fetcher.publish_configuration(&subject.id, token);
    publish_statements_about(fetcher, subject, hints);
}

pub fn publish_statements_about(fetcher: &MemoryFetcher, subject: &Member, issuers: &[&Member]) {
    for issuer in issuers {
        let token = issuer.sign(issuer.subordinate(subject));
        fetcher.publish_subordinate(&issuer.id, &subject.id, token);
    }
}

pub fn publish_anchor(fetcher: &MemoryFetcher, anchor: &Member, max_path_length: u32) {
    let token = anchor.sign(anchor.configuration().max_path_length(max_path_length));
    fetcher.publish_configuration(&anchor.id, token);
}

/// Publish a relying-party configuration carrying `metadata`, and a
/// statement about it from every hint.
pub fn publish_rp(fetcher: &MemoryFetcher, rp: &Member, hints: &[&Member], metadata: Value) {
    let token = rp.sign(
        rp.configuration()
            .authority_hints(hint_ids(hints))
            .metadata(EntityType::OpenidRelyingParty, metadata),
    );
    fetcher.publish_configuration(&rp.id, token);
    publish_statements_about(fetcher, rp, hints);
}

/// A linear federation `rp → ia[0] → … → ia[n-1] → ta`.
pub struct LinearFederation {
    pub fetcher: Arc<MemoryFetcher>,
    pub rp: Member,
    pub intermediates: Vec<Member>,
    pub ta: Member,
}

impl LinearFederation {
    pub fn new(intermediates: usize, max_path_length: u32) -> Self {
        let fetcher = Arc::new(MemoryFetcher::new());
        let rp = member("https://rp.example.org");
        let ta = member("https://ta.example.org");
        let intermediates: Vec<Member> = (0..intermediates)
            .map(|i| member(&format!("https://ia{i}.example.org")))
            .collect();

        let first = intermediates.first().unwrap_or(&ta);
        publish_rp(&fetcher, &rp, &[first], serde_json::json!({"client_name": "RP"}));
        for (i, ia) in intermediates.iter().enumerate() {
            let superior = intermediates.get(i + 1).unwrap_or(&ta);
            publish_linked(&fetcher, ia, &[superior]);
        }
        publish_anchor(&fetcher, &ta, max_path_length);

        Self {
            fetcher,
            rp,
            intermediates,
            ta,
        }
    }

    pub fn request(&self) -> ResolveRequest {
        ResolveRequest::new(
            self.rp.id.clone(),
            self.ta.id.clone(),
            EntityType::OpenidRelyingParty,
        )
    }
}

pub fn config() -> ResolverConfig {
    ResolverConfig::default()
}

/// Fetcher that waits before every request.
pub struct SlowFetcher {
    pub inner: Arc<MemoryFetcher>,
    pub delay: Duration,
}

#[async_trait]
impl StatementFetcher for SlowFetcher {
    async fn fetch_entity_configuration(&self, id: &EntityId) -> oidc_federation::Result<String> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_entity_configuration(id).await
    }

    async fn fetch_subordinate_statement(
        &self,
        issuer: &EntityId,
        subject: &EntityId,
    ) -> oidc_federation::Result<String> {
        tokio::time::sleep(self.delay).await;
        self.inner.fetch_subordinate_statement(issuer, subject).await
    }
}
