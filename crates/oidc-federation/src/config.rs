//! Resolver configuration.
//!
//! Passed explicitly to every resolution run; there is no ambient or
//! process-wide configuration. Loadable from TOML:
//!
//! ```toml
//! max_authority_hints = 10
//! allowed_algorithms = ["EdDSA"]
//! clock_skew_secs = 0
//! resolution_timeout_secs = 30
//!
//! [http]
//! timeout_secs = 10
//! connect_timeout_secs = 5
//! user_agent = "oidc-federation/0.1"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::crypto::ALG_EDDSA;
use crate::error::{FederationError, Result};

fn default_max_authority_hints() -> usize {
    10
}

fn default_allowed_algorithms() -> Vec<String> {
    vec![ALG_EDDSA.to_string()]
}

fn default_resolution_timeout_secs() -> Option<u64> {
    Some(30)
}

/// Transport parameters handed to HTTP fetchers. Opaque to the core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            connect_timeout_secs: 5,
            user_agent: concat!("oidc-federation/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

/// Limits and policy for trust chain resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// How many authority hints to follow per entity. Hints beyond this
    /// are ignored in listed order.
    #[serde(default = "default_max_authority_hints")]
    pub max_authority_hints: usize,
    /// JWS algorithms accepted on statements and trust marks.
    #[serde(default = "default_allowed_algorithms")]
    pub allowed_algorithms: Vec<String>,
    /// Tolerance for `iat` values in the future.
    pub clock_skew_secs: i64,
    /// Wall-clock bound on a whole run; `None` disables it.
    #[serde(default = "default_resolution_timeout_secs")]
    pub resolution_timeout_secs: Option<u64>,
    pub http: HttpConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_authority_hints: default_max_authority_hints(),
            allowed_algorithms: default_allowed_algorithms(),
            clock_skew_secs: 0,
            resolution_timeout_secs: default_resolution_timeout_secs(),
            http: HttpConfig::default(),
        }
    }
}

impl ResolverConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| FederationError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn with_max_authority_hints(mut self, max: usize) -> Self {
        self.max_authority_hints = max;
        self
    }

    pub fn with_resolution_timeout(mut self, secs: Option<u64>) -> Self {
        self.resolution_timeout_secs = secs;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_authority_hints == 0 {
            return Err(FederationError::Config(
                "max_authority_hints must be at least 1".into(),
            ));
        }
        if self.allowed_algorithms.is_empty() {
            return Err(FederationError::Config(
                "allowed_algorithms must not be empty".into(),
            ));
        }
        if self.clock_skew_secs < 0 {
            return Err(FederationError::Config(
                "clock_skew_secs must not be negative".into(),
            ));
        }
        Ok(())
    }
}
