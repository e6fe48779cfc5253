//! Integration test: full resolution workflow.
//!
//! Covers the complete lifecycle of a trust chain:
//! 1. Publish a federation (relying party, intermediate, anchor)
//! 2. Resolve the chain and inspect the path
//! 3. Apply superior metadata policy
//! 4. Verify required trust marks
//! 5. Persist to disk and reload offline

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;
use std::time::Duration;

use oidc_federation::crypto::Ed25519KeyPair;
use oidc_federation::{
    resolve_trust_chain, ChainStatus, EntityType, FederationError, FileStatementStore,
    MemoryFetcher, MemoryStatementStore, ResolveRequest, StatementStore, TrustChain,
    TrustChainResolver,
};
use serde_json::json;

use common::{
    config, init_logging, member, publish_anchor, publish_linked, publish_rp, LinearFederation,
    SlowFetcher,
};

const CERTIFIED: &str = "https://ta.example.org/marks/certified";

#[tokio::test]
async fn full_workflow_resolve_through_intermediate() {
    init_logging();

    // ── Step 1: Publish the federation ──────────────────────────────────
    let federation = LinearFederation::new(1, 1);
    let store = MemoryStatementStore::new();

    // ── Step 2: Resolve ─────────────────────────────────────────────────
    let chain = resolve_trust_chain(
        &federation.request(),
        federation.fetcher.as_ref(),
        &store,
        &config(),
    )
    .await
    .expect("rp should resolve under ta through one intermediate");

    assert!(chain.is_valid());
    assert_eq!(chain.subject(), &federation.rp.id);
    assert_eq!(chain.trust_anchor(), &federation.ta.id);
    assert_eq!(chain.path().hops(), 2);
    assert_eq!(chain.trust_path().len(), 4);
    assert_eq!(
        chain.parties_involved(),
        vec![
            federation.rp.id.clone(),
            federation.intermediates[0].id.clone(),
            federation.ta.id.clone(),
        ]
    );
    assert_eq!(chain.final_metadata()["client_name"], json!("RP"));
    assert_eq!(chain.exp(), common::FAR_EXP);

    // The serialized form starts with the subject's configuration and ends
    // with the anchor's.
    let tokens = chain.serialize();
    assert_eq!(tokens.len(), 4);
    assert_eq!(chain.trust_path()[0].sub(), &federation.rp.id);
    assert_eq!(chain.trust_path()[3].iss(), &federation.ta.id);

    // ── Step 3: Persisted state ─────────────────────────────────────────
    let record = store
        .get_trust_chain(&federation.rp.id, &federation.ta.id, EntityType::OpenidRelyingParty)
        .await
        .unwrap()
        .expect("chain should be stored");
    assert_eq!(record.status, ChainStatus::Valid);
    assert!(record.is_active);
    assert_eq!(record.chain, tokens);
    assert_eq!(store.statement_count(), 4);
}

#[tokio::test]
async fn full_workflow_direct_anchor_without_intermediates() {
    init_logging();
    let federation = LinearFederation::new(0, 0);
    let store = MemoryStatementStore::new();

    let chain = resolve_trust_chain(&federation.request(), federation.fetcher.as_ref(), &store, &config())
        .await
        .expect("a direct subordinate of the anchor should resolve with max_path_length 0");
    assert_eq!(chain.path().hops(), 1);
    assert_eq!(chain.trust_path().len(), 3);
}

#[tokio::test]
async fn full_workflow_intermediate_rejected_when_path_length_zero() {
    init_logging();
    let federation = LinearFederation::new(1, 0);
    let store = MemoryStatementStore::new();

    let err = resolve_trust_chain(&federation.request(), federation.fetcher.as_ref(), &store, &config())
        .await
        .unwrap_err();
    assert!(matches!(
        err.cause(),
        FederationError::AnchorUnreachable { attempts: 0, .. }
    ));
    assert!(!err.cause().is_retryable());
    assert_eq!(store.chain_count(), 0);
}

#[tokio::test]
async fn full_workflow_subject_without_hints() {
    init_logging();
    let fetcher = MemoryFetcher::new();
    let rp = member("https://rp.example.org");
    let ta = member("https://ta.example.org");
    publish_linked(&fetcher, &rp, &[]);
    publish_anchor(&fetcher, &ta, 2);

    let request = ResolveRequest::new(rp.id.clone(), ta.id.clone(), EntityType::OpenidRelyingParty);
    let err = resolve_trust_chain(&request, &fetcher, &MemoryStatementStore::new(), &config())
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), FederationError::NoAuthorityHints(id) if id == &rp.id));
}

#[tokio::test]
async fn full_workflow_metadata_policy() {
    init_logging();
    let fetcher = MemoryFetcher::new();
    let rp = member("https://rp.example.org");
    let ta = member("https://ta.example.org");
    publish_anchor(&fetcher, &ta, 0);

    // rp declares grant types; ta forces a different value and defaults scope
    publish_rp(
        &fetcher,
        &rp,
        &[&ta],
        json!({"client_name": "RP", "grant_types": ["implicit"]}),
    );
    let request = ResolveRequest::new(rp.id.clone(), ta.id.clone(), EntityType::OpenidRelyingParty);

    let defaulting = ta.sign(ta.subordinate(&rp).metadata_policy(
        EntityType::OpenidRelyingParty,
        json!({
            "scopes_supported": {"default": ["openid"]},
            "grant_types": {"subset_of": ["authorization_code", "implicit"]}
        }),
    ));
    fetcher.publish_subordinate(&ta.id, &rp.id, defaulting);

    let chain = resolve_trust_chain(&request, &fetcher, &MemoryStatementStore::new(), &config())
        .await
        .expect("policy is satisfiable");
    assert_eq!(chain.final_metadata()["scopes_supported"], json!(["openid"]));
    assert_eq!(chain.final_metadata()["grant_types"], json!(["implicit"]));

    let conflicting = ta.sign(ta.subordinate(&rp).metadata_policy(
        EntityType::OpenidRelyingParty,
        json!({"grant_types": {"value": ["authorization_code"]}}),
    ));
    fetcher.publish_subordinate(&ta.id, &rp.id, conflicting);

    let err = resolve_trust_chain(&request, &fetcher, &MemoryStatementStore::new(), &config())
        .await
        .unwrap_err();
    assert!(matches!(
        err.cause(),
        FederationError::PolicyConflict { field, .. } if field == "grant_types"
    ));
}

#[tokio::test]
async fn full_workflow_required_trust_mark() {
    init_logging();
    let fetcher = MemoryFetcher::new();
    let rp = member("https://rp.example.org");
    let ta = member("https://ta.example.org");
    publish_anchor(&fetcher, &ta, 0);

    let with_mark = rp.sign(
        rp.configuration()
            .authority_hint(ta.id.clone())
            .trust_mark(CERTIFIED, ta.trust_mark(&rp, CERTIFIED)),
    );
    fetcher.publish_configuration(&rp.id, with_mark);
    common::publish_statements_about(&fetcher, &rp, &[&ta]);

    let request = ResolveRequest::new(rp.id.clone(), ta.id.clone(), EntityType::OpenidRelyingParty)
        .require_trust_mark(CERTIFIED);
    let chain = resolve_trust_chain(&request, &fetcher, &MemoryStatementStore::new(), &config())
        .await
        .expect("anchor-issued mark should verify");
    assert_eq!(chain.verified_trust_marks(), &[CERTIFIED.to_string()]);

    let other = request.clone().require_trust_mark("https://ta.example.org/marks/other");
    let err = resolve_trust_chain(&other, &fetcher, &MemoryStatementStore::new(), &config())
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), FederationError::MissingTrustMark(_)));
}

#[tokio::test]
async fn full_workflow_forged_statement_invalidates_only_branch() {
    init_logging();
    let federation = LinearFederation::new(1, 1);
    let ia = &federation.intermediates[0];

    // same kid as ia's real key, different key material
    let forger = Ed25519KeyPair::generate().with_kid(ia.key.kid());
    let forged = ia.subordinate(&federation.rp).sign(&forger).unwrap();
    federation
        .fetcher
        .publish_subordinate(&ia.id, &federation.rp.id, forged);

    let store = MemoryStatementStore::new();
    let err = resolve_trust_chain(&federation.request(), federation.fetcher.as_ref(), &store, &config())
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), FederationError::MalformedStatement(_)));
    assert!(!err.cause().is_retryable());
    assert_eq!(store.chain_count(), 0);
    assert_eq!(store.statement_count(), 0);
}

#[tokio::test]
async fn full_workflow_unreachable_anchor_is_retryable() {
    init_logging();
    let federation = LinearFederation::new(0, 0);
    federation.fetcher.set_unreachable(&federation.ta.id);

    let err = resolve_trust_chain(
        &federation.request(),
        federation.fetcher.as_ref(),
        &MemoryStatementStore::new(),
        &config(),
    )
    .await
    .unwrap_err();
    assert!(matches!(err.cause(), FederationError::Network { .. }));
    assert!(err.cause().is_retryable());
}

#[tokio::test]
async fn full_workflow_timeout_persists_nothing() {
    init_logging();
    let federation = LinearFederation::new(1, 1);
    let fetcher = SlowFetcher {
        inner: Arc::clone(&federation.fetcher),
        delay: Duration::from_millis(1500),
    };
    let store = MemoryStatementStore::new();
    let config = config().with_resolution_timeout(Some(1));

    let err = resolve_trust_chain(&federation.request(), &fetcher, &store, &config)
        .await
        .unwrap_err();
    assert!(matches!(err.cause(), FederationError::Timeout(1)));
    assert!(err.cause().is_retryable());
    assert_eq!(store.chain_count(), 0);
    assert_eq!(store.statement_count(), 0);
}

#[tokio::test]
async fn full_workflow_file_store_round_trip() {
    init_logging();
    let dir = tempfile::tempdir().unwrap();
    let federation = LinearFederation::new(2, 2);

    let resolver = TrustChainResolver::new(
        federation.fetcher.clone(),
        Arc::new(FileStatementStore::new(dir.path()).unwrap()),
        config(),
    );
    let chain = resolver.resolve(&federation.request()).await.unwrap();
    assert_eq!(chain.path().hops(), 3);

    // A fresh store over the same directory sees the chain, and the chain
    // re-verifies offline.
    let reopened = FileStatementStore::new(dir.path()).unwrap();
    let record = reopened
        .get_trust_chain(&federation.rp.id, &federation.ta.id, EntityType::OpenidRelyingParty)
        .await
        .unwrap()
        .expect("chain should survive reopening the store");
    let validator = oidc_federation::StatementValidator::from_config(&config(), common::now());
    let restored = TrustChain::from_record(&record, &validator).unwrap();
    assert_eq!(restored.serialize(), chain.serialize());
    assert_eq!(restored.final_metadata(), chain.final_metadata());
}
