use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::config::CommonConfig;

/// Authorization related configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AuthzConfig {
    /// Grant every action to the actor with id "root". Broad allow-block denies
    /// and provider denies still apply.
    /// Defaults to false.
    #[serde(default = "AuthzConfig::default_root_enabled")]
    pub root_enabled: bool,

    /// Deny every action that no rule explicitly allows, ignoring the static
    /// defaults of the actions.
    /// Defaults to false.
    #[serde(default = "AuthzConfig::default_default_deny")]
    pub default_deny: bool,

    /// Whether arbitrary SQL may be executed when no `allow_sql` block or
    /// provider decides. When false, `execute-sql` defaults to deny.
    /// Defaults to true.
    #[serde(default = "AuthzConfig::default_default_allow_sql")]
    pub default_allow_sql: bool,

    /// How many recent permission checks the audit log keeps.
    /// Defaults to 30. Must be in range [1, 10000].
    #[serde(default = "AuthzConfig::default_audit_capacity")]
    pub audit_capacity: usize,
}

impl CommonConfig for AuthzConfig {
    fn default() -> Self {
        Self {
            root_enabled: Self::default_root_enabled(),
            default_deny: Self::default_default_deny(),
            default_allow_sql: Self::default_default_allow_sql(),
            audit_capacity: Self::default_audit_capacity(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        if self.audit_capacity < Self::MIN_AUDIT_CAPACITY {
            bail!(
                "audit_capacity must be greater than or equal to {}",
                Self::MIN_AUDIT_CAPACITY
            );
        }
        if self.audit_capacity > Self::MAX_AUDIT_CAPACITY {
            bail!(
                "audit_capacity must be less than or equal to {}",
                Self::MAX_AUDIT_CAPACITY
            );
        }
        Ok(())
    }
}

impl AuthzConfig {
    const MIN_AUDIT_CAPACITY: usize = 1;
    const MAX_AUDIT_CAPACITY: usize = 10_000;

    pub fn default_root_enabled() -> bool {
        false
    }

    pub fn default_default_deny() -> bool {
        false
    }

    pub fn default_default_allow_sql() -> bool {
        true
    }

    pub fn default_audit_capacity() -> usize {
        30
    }
}
