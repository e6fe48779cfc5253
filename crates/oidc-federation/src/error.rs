//! Error types for trust chain resolution.
//!
//! All errors are strongly typed and propagated without panicking.
//! Private key material is never included in error messages.

use crate::entity::{EntityId, EntityType};

/// Why a single signed statement was rejected.
///
/// A validation error only ever excludes the candidate branch that
/// produced it; sibling branches keep being explored.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Unexpected token type: {0}")]
    UnexpectedType(String),

    #[error("No key with id {0} in the issuer's key set")]
    UnknownKey(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Missing required claim: {0}")]
    MissingClaim(&'static str),

    #[error("Statement expired at {exp}")]
    Expired { exp: i64 },

    #[error("Statement not valid before {iat}")]
    NotYetValid { iat: i64 },

    #[error("Statement lifetime is empty: exp {exp} <= iat {iat}")]
    EmptyLifetime { iat: i64, exp: i64 },

    #[error("Entity configuration is not self-issued: iss {iss}, sub {sub}")]
    NotSelfIssued { iss: String, sub: String },

    #[error("Issuer mismatch: expected {expected}, found {found}")]
    IssuerMismatch { expected: String, found: String },

    #[error("Subject mismatch: expected {expected}, found {found}")]
    SubjectMismatch { expected: String, found: String },

    #[error("{issuer} is not among the authority hints of {subject}")]
    NotAnAuthorityHint { issuer: String, subject: String },

    #[error("Descendant keys not attested by superior: {0}")]
    KeysNotAttested(String),
}

/// Federation error kinds covering every stage of a resolution run.
#[derive(Debug, thiserror::Error)]
pub enum FederationError {
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Malformed statement: {0}")]
    MalformedStatement(#[from] ValidationError),

    #[error("{0} has no authority hints")]
    NoAuthorityHints(EntityId),

    #[error("Maximum path length {max_path_length} exceeded before reaching the trust anchor")]
    MaxPathExceeded { max_path_length: u32 },

    #[error("Trust anchor {anchor} unreachable ({attempts} candidate branches failed)")]
    AnchorUnreachable { anchor: EntityId, attempts: usize },

    #[error("Cycle detected: {0} already appears on this branch")]
    CycleDetected(EntityId),

    #[error("Metadata policy conflict on {field}: {reason}")]
    PolicyConflict { field: String, reason: String },

    #[error("Missing or invalid trust mark: {0}")]
    MissingTrustMark(String),

    #[error("Invalid entity identifier {value}: {reason}")]
    InvalidEntityId { value: String, reason: String },

    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Trust chain resolution timed out after {0}s")]
    Timeout(u64),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl FederationError {
    /// Network failures and timeouts may succeed when the caller retries;
    /// every other kind is a property of the statements themselves.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Network { .. } | Self::Timeout(_))
    }
}

/// The single caller-visible failure of a resolution run.
///
/// Carries the root cause so callers can distinguish a retryable network
/// failure from a federation that simply does not trust the subject.
#[derive(Debug, thiserror::Error)]
#[error("Trust chain for {subject} under {trust_anchor} ({entity_type}) is not valid: {source}")]
pub struct InvalidTrustChainError {
    pub subject: EntityId,
    pub trust_anchor: EntityId,
    pub entity_type: EntityType,
    #[source]
    pub source: FederationError,
}

impl InvalidTrustChainError {
    /// The error that made the run fail.
    pub fn cause(&self) -> &FederationError {
        &self.source
    }
}

/// Convenience Result alias.
pub type Result<T> = std::result::Result<T, FederationError>;
