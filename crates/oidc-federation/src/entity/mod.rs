//! Federation entities and the statements they sign.
//!
//! The entity module provides:
//! - Validated entity identifiers
//! - Entity types keying metadata and metadata policy
//! - The entity statement claim set and its validated form
//! - A builder for signing statements
//! - The statement validator

pub mod builder;
pub mod id;
pub mod kind;
pub mod statement;
pub mod validate;

pub use builder::StatementBuilder;
pub use id::EntityId;
pub use kind::EntityType;
pub use statement::{Constraints, EntityStatement, StatementClaims, TrustMarkRef};
pub use validate::StatementValidator;
