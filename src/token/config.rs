use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::config::CommonConfig;

/// Signed API token configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct TokenConfig {
    /// Whether `Authorization: Bearer dstok_...` headers are accepted.
    /// Default: true
    #[serde(default = "TokenConfig::default_enabled")]
    pub enabled: bool,

    /// Maximum lifetime of a token in seconds. Longer durations are capped, and
    /// tokens without an expiry are treated as expiring after this many seconds.
    /// Default: 0, meaning no limit.
    #[serde(default = "TokenConfig::default_max_ttl")]
    pub max_ttl: u64,
}

impl CommonConfig for TokenConfig {
    fn default() -> Self {
        Self {
            enabled: Self::default_enabled(),
            max_ttl: Self::default_max_ttl(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        Ok(())
    }
}

impl TokenConfig {
    pub fn default_enabled() -> bool {
        true
    }

    pub fn default_max_ttl() -> u64 {
        0
    }

    /// Applies the configured maximum TTL to a token duration.
    pub fn effective_duration(&self, duration: Option<u64>) -> Option<u64> {
        let max_ttl = self.max_ttl;
        match duration {
            Some(0) | None if max_ttl > 0 => Some(max_ttl),
            Some(0) | None => None,
            Some(d) if max_ttl > 0 && d > max_ttl => Some(max_ttl),
            Some(d) => Some(d),
        }
    }
}
