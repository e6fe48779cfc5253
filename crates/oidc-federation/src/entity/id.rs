//! Entity identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{FederationError, Result};

/// Path of the entity configuration relative to the entity identifier.
pub const WELL_KNOWN_PATH: &str = ".well-known/openid-federation";

/// Identifier of a federation participant.
///
/// Must be an absolute `https` (or `http`) URL with a host and no
/// fragment. Compared as an exact string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Parse and validate an entity identifier.
    pub fn parse(value: impl Into<String>) -> Result<Self> {
        let value = value.into();
        let invalid = |reason: &str| FederationError::InvalidEntityId {
            value: value.clone(),
            reason: reason.to_string(),
        };

        let url = url::Url::parse(&value).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(invalid("scheme must be https or http"));
        }
        if url.host_str().map_or(true, str::is_empty) {
            return Err(invalid("missing host"));
        }
        if url.fragment().is_some() {
            return Err(invalid("fragment not allowed"));
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// URL of the entity configuration document.
    pub fn well_known_url(&self) -> String {
        format!("{}/{WELL_KNOWN_PATH}", self.0.trim_end_matches('/'))
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityId {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = FederationError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
