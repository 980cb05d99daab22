mod chain;
mod permissions;
mod root;
mod union;

pub mod config;
pub mod factory;
pub mod resolver;

pub use chain::{ChainOutcome, ChainProvider};
pub use permissions::ConfigPermissionsProvider;
pub use root::RootProvider;
pub use union::UnionProvider;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::action::Action;
use crate::actor::Actor;
use crate::resource::Resource;

/// A pluggable source of authorization decisions.
///
/// Providers are polled in registration order for every permission check
/// that survives the token and allow-block gates. Returning an error is
/// equivalent to [`Verdict::Abstain`]: the failure is logged and the next
/// provider is asked.
///
/// Implementations must be thread-safe; the same provider serves concurrent
/// requests.
#[async_trait]
pub trait DecisionProvider: Send + Sync {
    /// A short name identifying the provider in audit traces.
    fn name(&self) -> &str;

    /// Decides on a permission check.
    ///
    /// # Arguments
    /// * `req` - The actor, action and resource being checked
    ///
    /// # Returns
    /// * `Result<Verdict>` - The provider's opinion
    async fn decide(&self, req: &AuthzRequest<'_>) -> Result<Verdict>;
}

/// A permission check handed to decision providers.
#[derive(Debug, Clone, Copy)]
pub struct AuthzRequest<'a> {
    /// The actor, `None` for anonymous requests
    pub actor: Option<&'a Actor>,
    /// The registered action being performed
    pub action: &'a Action,
    /// The resource the action targets, already checked against the action scope
    pub resource: &'a Resource,
}

/// A decision provider's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// The action is permitted, unless another provider denies it
    Allow,
    /// The action is forbidden; this wins over any number of allows
    Deny,
    /// No opinion, defer to the other providers and the defaults
    Abstain,
}
