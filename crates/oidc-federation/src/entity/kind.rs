//! Entity types — the keys of the `metadata` and `metadata_policy` claims.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::FederationError;

/// Role an entity plays in the federation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    OpenidProvider,
    OpenidRelyingParty,
    OauthResource,
    FederationEntity,
}

impl EntityType {
    pub const ALL: [EntityType; 4] = [
        EntityType::OpenidProvider,
        EntityType::OpenidRelyingParty,
        EntityType::OauthResource,
        EntityType::FederationEntity,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenidProvider => "openid_provider",
            Self::OpenidRelyingParty => "openid_relying_party",
            Self::OauthResource => "oauth_resource",
            Self::FederationEntity => "federation_entity",
        }
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityType {
    type Err = FederationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| FederationError::UnknownEntityType(s.to_string()))
    }
}
