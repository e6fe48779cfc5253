//! Statement fetching — the network-facing collaborator of the resolver.
//!
//! The resolver only ever asks for two things: an entity's self-issued
//! configuration, and the subordinate statement a superior issued about
//! one of its subordinates. Transport configuration (timeouts, TLS) lives
//! inside the implementation and is opaque to the core.
//!
//! # Implementations
//!
//! - [`MemoryFetcher`] — tokens registered in memory; used by tests and by
//!   callers that already hold statements.
//! - [`HttpFetcher`] — `reqwest` client (behind the `http` feature).

use async_trait::async_trait;

use crate::entity::EntityId;
use crate::error::Result;

pub mod memory;

#[cfg(feature = "http")]
pub mod http;

pub use memory::MemoryFetcher;

#[cfg(feature = "http")]
pub use http::HttpFetcher;

/// Source of raw signed statements.
///
/// Failures must be reported as [`crate::FederationError::Network`].
#[async_trait]
pub trait StatementFetcher: Send + Sync {
    /// Fetch the entity configuration `id` publishes about itself.
    async fn fetch_entity_configuration(&self, id: &EntityId) -> Result<String>;

    /// Fetch the subordinate statement `issuer` issued about `subject`.
    async fn fetch_subordinate_statement(
        &self,
        issuer: &EntityId,
        subject: &EntityId,
    ) -> Result<String>;
}
