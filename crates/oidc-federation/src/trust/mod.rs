//! Trust chain resolution — from a subject to a trust anchor.
//!
//! The trust module provides:
//! - Superior discovery from authority hints
//! - Bounded breadth-first walk producing a tree of trust
//! - Path selection and offline path verification
//! - Metadata policy combination and application
//! - Required trust mark verification
//! - The trust chain aggregate and the resolution entry point

pub mod chain;
pub mod discovery;
pub mod marks;
pub mod path;
pub mod policy;
pub mod resolve;
pub mod tree;
pub mod walker;

pub use chain::TrustChain;
pub use discovery::{Discovered, Discovery, Superior};
pub use marks::{verify_trust_marks, TrustMarkClaims};
pub use path::{select_path, TrustPath};
pub use policy::{apply_metadata_policy, combine_policies, MetadataPolicy, PolicyOperators};
pub use resolve::{resolve_trust_chain, ResolveRequest, TrustChainResolver};
pub use tree::{Node, TreeOfTrust};
pub use walker::walk;
