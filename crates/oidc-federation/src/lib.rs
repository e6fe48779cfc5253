//! oidc-federation — trust chain resolution for OpenID federations.
//!
//! Resolves the chain of signed entity statements linking a subject
//! entity to a trust anchor, validates every statement on it, applies the
//! metadata policies of its superiors, and packages the result as a
//! [`TrustChain`] with a well-defined expiration.
//!
//! Fetching and persistence are collaborators behind the
//! [`StatementFetcher`] and [`StatementStore`] traits.

pub mod config;
pub mod crypto;
pub mod entity;
pub mod error;
pub mod fetch;
pub mod storage;
pub mod time;
pub mod trust;

#[cfg(test)]
mod test_support;

// Re-export primary types
pub use config::{HttpConfig, ResolverConfig};
pub use entity::{EntityId, EntityStatement, EntityType, StatementBuilder, StatementValidator};
pub use error::{FederationError, InvalidTrustChainError, Result, ValidationError};
pub use fetch::{MemoryFetcher, StatementFetcher};
pub use storage::{
    ChainStatus, FileStatementStore, MemoryStatementStore, StatementStore, StoredStatement,
    TrustChainRecord,
};
pub use trust::{
    resolve_trust_chain, ResolveRequest, TrustChain, TrustChainResolver, TrustMarkClaims,
    TrustPath,
};

#[cfg(feature = "http")]
pub use fetch::HttpFetcher;
