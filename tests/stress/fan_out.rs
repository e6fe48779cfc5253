//! Stress test: wide federations with many authority hints.

#[path = "../common/mod.rs"]
mod common;

use oidc_federation::crypto::Ed25519KeyPair;
use oidc_federation::{
    resolve_trust_chain, EntityType, FederationError, MemoryFetcher, MemoryStatementStore,
    ResolveRequest,
};
use serde_json::json;

use common::{
    config, init_logging, member, publish_anchor, publish_linked, publish_rp, Member,
};

fn request(rp: &Member, ta: &Member) -> ResolveRequest {
    ResolveRequest::new(rp.id.clone(), ta.id.clone(), EntityType::OpenidRelyingParty)
}

#[tokio::test]
async fn stress_fan_out_cap_limits_contacted_superiors() {
    init_logging();
    let fetcher = MemoryFetcher::new();
    let rp = member("https://rp.example.org");
    let ta = member("https://ta.example.org");
    let intermediates: Vec<Member> = (0..5)
        .map(|i| member(&format!("https://ia{i}.example.org")))
        .collect();
    let hints: Vec<&Member> = intermediates.iter().collect();

    publish_rp(&fetcher, &rp, &hints, json!({"client_name": "RP"}));
    for ia in &intermediates {
        publish_linked(&fetcher, ia, &[&ta]);
    }
    publish_anchor(&fetcher, &ta, 1);

    let config = config().with_max_authority_hints(2);
    let chain = resolve_trust_chain(&request(&rp, &ta), &fetcher, &MemoryStatementStore::new(), &config)
        .await
        .unwrap();

    assert_eq!(chain.parties_involved()[1], intermediates[0].id);
    for ia in &intermediates[..2] {
        assert!(fetcher.was_contacted(&ia.id));
    }
    for ia in &intermediates[2..] {
        assert!(!fetcher.was_contacted(&ia.id), "{} is beyond the cap", ia.id);
    }
}

#[tokio::test]
async fn stress_fan_out_forged_branch_with_surviving_sibling() {
    init_logging();
    let fetcher = MemoryFetcher::new();
    let rp = member("https://rp.example.org");
    let ta = member("https://ta.example.org");
    let ia1 = member("https://ia1.example.org");
    let ia2 = member("https://ia2.example.org");

    publish_rp(&fetcher, &rp, &[&ia1, &ia2], json!({"client_name": "RP"}));
    publish_linked(&fetcher, &ia1, &[&ta]);
    publish_linked(&fetcher, &ia2, &[&ta]);
    publish_anchor(&fetcher, &ta, 1);

    let forger = Ed25519KeyPair::generate().with_kid(ia1.key.kid());
    let forged = ia1.subordinate(&rp).sign(&forger).unwrap();
    fetcher.publish_subordinate(&ia1.id, &rp.id, forged);

    let chain = resolve_trust_chain(&request(&rp, &ta), &fetcher, &MemoryStatementStore::new(), &config())
        .await
        .expect("the honest branch through ia2 should still resolve");
    assert_eq!(
        chain.parties_involved(),
        vec![rp.id.clone(), ia2.id.clone(), ta.id.clone()]
    );
}

#[tokio::test]
async fn stress_fan_out_every_branch_failing() {
    init_logging();
    let fetcher = MemoryFetcher::new();
    let rp = member("https://rp.example.org");
    let ta = member("https://ta.example.org");
    let intermediates: Vec<Member> = (0..4)
        .map(|i| member(&format!("https://ia{i}.example.org")))
        .collect();
    let hints: Vec<&Member> = intermediates.iter().collect();

    publish_rp(&fetcher, &rp, &hints, json!({}));
    for ia in &intermediates {
        fetcher.set_unreachable(&ia.id);
    }
    publish_anchor(&fetcher, &ta, 2);

    let err = resolve_trust_chain(&request(&rp, &ta), &fetcher, &MemoryStatementStore::new(), &config())
        .await
        .unwrap_err();
    assert!(matches!(
        err.cause(),
        FederationError::AnchorUnreachable { attempts: 4, .. }
    ));
}

#[tokio::test]
async fn stress_fan_out_cycles_are_pruned() {
    init_logging();
    let fetcher = MemoryFetcher::new();
    let rp = member("https://rp.example.org");
    let ta = member("https://ta.example.org");
    let a = member("https://a.example.org");
    let b = member("https://b.example.org");
    let c = member("https://c.example.org");

    // rp → a → b → a (cycle), b → c → ta
    publish_rp(&fetcher, &rp, &[&a], json!({}));
    publish_linked(&fetcher, &a, &[&b]);
    publish_linked(&fetcher, &b, &[&a, &c]);
    publish_linked(&fetcher, &c, &[&ta]);
    publish_anchor(&fetcher, &ta, 4);

    let chain = resolve_trust_chain(&request(&rp, &ta), &fetcher, &MemoryStatementStore::new(), &config())
        .await
        .unwrap();
    assert_eq!(
        chain.parties_involved(),
        vec![rp.id.clone(), a.id.clone(), b.id.clone(), c.id.clone(), ta.id.clone()]
    );

    // a's configuration was fetched once, when it was first discovered
    let a_configuration = a.id.well_known_url();
    assert_eq!(
        fetcher
            .requests()
            .iter()
            .filter(|url| **url == a_configuration)
            .count(),
        1
    );
}

#[tokio::test]
async fn stress_fan_out_diamond_expands_shared_superior_once() {
    init_logging();
    let fetcher = MemoryFetcher::new();
    let rp = member("https://rp.example.org");
    let ta = member("https://ta.example.org");
    let shared = member("https://shared.example.org");
    let branches: Vec<Member> = (0..6)
        .map(|i| member(&format!("https://branch{i}.example.org")))
        .collect();
    let hints: Vec<&Member> = branches.iter().collect();

    publish_rp(&fetcher, &rp, &hints, json!({}));
    for branch in &branches {
        publish_linked(&fetcher, branch, &[&shared]);
    }
    publish_linked(&fetcher, &shared, &[&ta]);
    publish_anchor(&fetcher, &ta, 2);

    let chain = resolve_trust_chain(&request(&rp, &ta), &fetcher, &MemoryStatementStore::new(), &config())
        .await
        .unwrap();
    assert_eq!(chain.path().hops(), 3);

    // only one statement about the shared superior is requested from the anchor
    let asked = format!("sub={}", shared.id);
    assert_eq!(
        fetcher
            .requests()
            .iter()
            .filter(|url| url.ends_with(&asked))
            .count(),
        1
    );
}
