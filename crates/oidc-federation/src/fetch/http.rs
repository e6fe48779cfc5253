//! HTTP statement fetcher.
//!
//! Entity configurations are served at `<entity>/.well-known/openid-federation`.
//! Subordinate statements come from the superior's fetch endpoint, which
//! is learned from the `federation_entity.federation_fetch_endpoint`
//! metadata of its configuration and defaults to `<issuer>/fetch`.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::HttpConfig;
use crate::entity::{EntityId, EntityType, StatementValidator};
use crate::error::{FederationError, Result};

use super::StatementFetcher;

const STATEMENT_CONTENT_TYPE: &str = "application/entity-statement+jwt";

/// Fetches statements over HTTPS with `reqwest`.
pub struct HttpFetcher {
    client: reqwest::Client,
    fetch_endpoints: Mutex<HashMap<EntityId, String>>,
}

impl HttpFetcher {
    /// Build a fetcher with the given transport parameters.
    pub fn new(config: &HttpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| FederationError::Config(format!("http client: {e}")))?;
        Ok(Self {
            client,
            fetch_endpoints: Mutex::new(HashMap::new()),
        })
    }

    async fn get(&self, url: &str, query: &[(&str, &str)]) -> Result<String> {
        let network = |reason: String| FederationError::Network {
            url: url.to_string(),
            reason,
        };

        let response = self
            .client
            .get(url)
            .query(query)
            .header(reqwest::header::ACCEPT, STATEMENT_CONTENT_TYPE)
            .send()
            .await
            .map_err(|e| network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(network(format!("HTTP {status}")));
        }
        let body = response.text().await.map_err(|e| network(e.to_string()))?;
        Ok(body.trim().to_string())
    }

    /// Remember where `id` serves subordinate statements.
    ///
    /// The claims are read unverified: the endpoint only decides where to
    /// ask, and whatever it returns is validated by the resolver.
    fn learn_fetch_endpoint(&self, id: &EntityId, token: &str) {
        let endpoint = StatementValidator::decode_unverified(token)
            .ok()
            .and_then(|claims| claims.metadata)
            .and_then(|metadata| {
                metadata
                    .get(EntityType::FederationEntity.as_str())
                    .and_then(|m| m.get("federation_fetch_endpoint"))
                    .and_then(|v| v.as_str())
                    .map(str::to_string)
            });
        if let (Some(endpoint), Ok(mut endpoints)) = (endpoint, self.fetch_endpoints.lock()) {
            endpoints.insert(id.clone(), endpoint);
        }
    }

    fn fetch_endpoint(&self, issuer: &EntityId) -> String {
        self.fetch_endpoints
            .lock()
            .ok()
            .and_then(|endpoints| endpoints.get(issuer).cloned())
            .unwrap_or_else(|| format!("{}/fetch", issuer.as_str().trim_end_matches('/')))
    }
}

#[async_trait]
impl StatementFetcher for HttpFetcher {
    async fn fetch_entity_configuration(&self, id: &EntityId) -> Result<String> {
        let url = id.well_known_url();
        log::debug!("fetching entity configuration {url}");
        let token = self.get(&url, &[]).await?;
        self.learn_fetch_endpoint(id, &token);
        Ok(token)
    }

    async fn fetch_subordinate_statement(
        &self,
        issuer: &EntityId,
        subject: &EntityId,
    ) -> Result<String> {
        let endpoint = self.fetch_endpoint(issuer);
        log::debug!("fetching statement about {subject} from {endpoint}");
        self.get(
            &endpoint,
            &[("sub", subject.as_str()), ("iss", issuer.as_str())],
        )
        .await
    }
}
