//! Stress test: many concurrent resolutions sharing one resolver.

#[path = "../common/mod.rs"]
mod common;

use std::sync::Arc;

use oidc_federation::{
    EntityType, MemoryFetcher, MemoryStatementStore, ResolveRequest, TrustChainResolver,
};
use serde_json::json;

use common::{config, init_logging, member, publish_anchor, publish_linked, publish_rp, Member};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_concurrent_same_subject() {
    init_logging();
    let federation = common::LinearFederation::new(2, 2);
    let store = Arc::new(MemoryStatementStore::new());
    let resolver = Arc::new(TrustChainResolver::new(
        federation.fetcher.clone(),
        store.clone(),
        config(),
    ));
    let request = federation.request();

    let mut handles = Vec::with_capacity(32);
    for _ in 0..32 {
        let resolver = Arc::clone(&resolver);
        let request = request.clone();
        handles.push(tokio::spawn(async move { resolver.resolve(&request).await }));
    }

    let mut serialized = Vec::new();
    for handle in handles {
        let chain = handle
            .await
            .expect("task should not panic")
            .expect("every concurrent resolution should succeed");
        serialized.push(chain.serialize());
    }

    assert!(serialized.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(store.chain_count(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn stress_concurrent_distinct_subjects() {
    init_logging();
    let subjects = 50;
    let fetcher = Arc::new(MemoryFetcher::new());
    let ta = member("https://ta.example.org");
    let ia = member("https://ia.example.org");
    publish_linked(&fetcher, &ia, &[&ta]);
    publish_anchor(&fetcher, &ta, 1);

    let rps: Vec<Member> = (0..subjects)
        .map(|i| member(&format!("https://rp{i}.example.org")))
        .collect();
    for (i, rp) in rps.iter().enumerate() {
        publish_rp(&fetcher, rp, &[&ia], json!({"client_name": format!("RP {i}")}));
    }

    let store = Arc::new(MemoryStatementStore::new());
    let resolver = Arc::new(TrustChainResolver::new(fetcher.clone(), store.clone(), config()));

    let mut handles = Vec::with_capacity(subjects);
    for rp in &rps {
        let resolver = Arc::clone(&resolver);
        let request =
            ResolveRequest::new(rp.id.clone(), ta.id.clone(), EntityType::OpenidRelyingParty);
        handles.push(tokio::spawn(async move { resolver.resolve(&request).await }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let chain = handle.await.unwrap().unwrap();
        assert_eq!(chain.subject(), &rps[i].id);
        assert_eq!(chain.final_metadata()["client_name"], json!(format!("RP {i}")));
        assert_eq!(chain.path().hops(), 2);
    }
    assert_eq!(store.chain_count(), subjects);
}
