//! Cryptographic primitives for signed federation statements.
//!
//! This module provides:
//! - Ed25519 key pairs and their `jsonwebtoken` signing keys
//! - JSON Web Keys and key sets with RFC 7638 thumbprints
//! - Compact JWS encoding, decoding and key lookup by `kid`

pub mod jwk;
pub mod jws;
pub mod keys;

pub use jwk::{Jwk, Jwks};
pub use jws::{DecodedJws, JwsHeader, ALG_EDDSA, TYP_ENTITY_STATEMENT, TYP_TRUST_MARK};
pub use keys::Ed25519KeyPair;
