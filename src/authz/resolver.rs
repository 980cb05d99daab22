use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use log::{debug, error};
use thiserror::Error;

use crate::action::{Action, ActionRegistry, EXECUTE_SQL, PERMISSIONS_DEBUG};
use crate::actor::Actor;
use crate::audit::{AuditEntry, AuditLog, Outcome, TraceStep};
use crate::resource::Resource;
use crate::rules::InstanceRules;

use super::chain::ChainProvider;
use super::config::AuthzConfig;
use super::{AuthzRequest, Verdict};

const SOURCE_TOKEN: &str = "token restrictions";
const SOURCE_DEFAULT: &str = "default";

/// A permission check that could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveError {
    #[error("unknown action '{0}'")]
    UnknownAction(String),
    #[error("action '{action}' expects a {expected} resource, got {found}")]
    ResourceMismatch {
        action: String,
        expected: &'static str,
        found: &'static str,
    },
    #[error("permission check deadline exceeded")]
    DeadlineExceeded,
}

/// Returned by the gating helpers when the actor may not proceed. Carries the
/// action that was checked first.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("forbidden: {0}")]
pub struct Forbidden(pub String);

/// The visibility of a resource to an actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Visibility {
    /// The actor may see the resource.
    pub visible: bool,
    /// The resource is visible to the actor but not to anonymous users.
    pub private: bool,
}

struct Decision {
    allowed: bool,
    used_default: bool,
    decided_by: String,
    trace: Vec<TraceStep>,
}

impl Decision {
    fn deny(decided_by: impl Into<String>, trace: Vec<TraceStep>) -> Self {
        Self {
            allowed: false,
            used_default: false,
            decided_by: decided_by.into(),
            trace,
        }
    }

    fn allow(decided_by: impl Into<String>, trace: Vec<TraceStep>) -> Self {
        Self {
            allowed: true,
            used_default: false,
            decided_by: decided_by.into(),
            trace,
        }
    }
}

/// Answers "may this actor perform this action on this resource?".
///
/// A resolution runs these steps, stopping at the first that decides:
/// 1. Token restrictions: a restricted token that does not list the action
///    denies.
/// 2. Allow blocks along the resource path, broadest first: the first block
///    the actor does not match denies. Matching blocks leave a candidate allow.
/// 3. Decision providers: any deny vetoes, otherwise any allow allows.
/// 4. The candidate allow from step 2, if any.
/// 5. The action's effective default.
///
/// Every resolution is recorded in the audit log.
pub struct PermissionResolver {
    registry: Arc<ActionRegistry>,
    rules: Arc<InstanceRules>,
    chain: ChainProvider,
    audit: Arc<AuditLog>,
    cfg: AuthzConfig,
}

impl PermissionResolver {
    pub fn new(
        registry: Arc<ActionRegistry>,
        rules: Arc<InstanceRules>,
        chain: ChainProvider,
        audit: Arc<AuditLog>,
        cfg: AuthzConfig,
    ) -> Self {
        Self {
            registry,
            rules,
            chain,
            audit,
            cfg,
        }
    }

    pub fn registry(&self) -> &ActionRegistry {
        &self.registry
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Resolves a permission check. Usage errors are logged and resolve to
    /// deny; use [`PermissionResolver::try_resolve`] to tell them apart.
    pub async fn resolve(&self, actor: Option<&Actor>, action: &str, resource: &Resource) -> bool {
        match self.try_resolve(actor, action, resource).await {
            Ok(allowed) => allowed,
            Err(e) => {
                error!("Permission check '{action}' on {resource} is invalid: {e}");
                false
            }
        }
    }

    pub async fn try_resolve(
        &self,
        actor: Option<&Actor>,
        action: &str,
        resource: &Resource,
    ) -> Result<bool, ResolveError> {
        let entry = self.check(actor, action, resource).await?;
        Ok(entry.allowed)
    }

    /// Like [`PermissionResolver::try_resolve`], but gives up after `timeout`.
    /// A resolution that misses the deadline is never an allow.
    pub async fn resolve_within(
        &self,
        actor: Option<&Actor>,
        action: &str,
        resource: &Resource,
        timeout: Duration,
    ) -> Result<bool, ResolveError> {
        match tokio::time::timeout(timeout, self.try_resolve(actor, action, resource)).await {
            Ok(result) => result,
            Err(_) => {
                error!("Permission check '{action}' on {resource} exceeded {timeout:?}");
                Err(ResolveError::DeadlineExceeded)
            }
        }
    }

    /// Resolves a permission check and returns the recorded audit entry.
    pub async fn check(
        &self,
        actor: Option<&Actor>,
        action: &str,
        resource: &Resource,
    ) -> Result<AuditEntry, ResolveError> {
        let action = self
            .registry
            .get(action)
            .ok_or_else(|| ResolveError::UnknownAction(action.to_string()))?;
        if !action.scope.accepts(resource) {
            return Err(ResolveError::ResourceMismatch {
                action: action.name.clone(),
                expected: action.scope.expected_shape(),
                found: resource.shape(),
            });
        }

        let decision = self.decide(actor, &action, resource).await;
        debug!(
            "Permission check '{}' on {} for {}: allowed={}, decided by {}",
            action.name,
            resource,
            actor_label(actor),
            decision.allowed,
            decision.decided_by
        );

        let entry = AuditEntry {
            when: Utc::now().to_rfc3339(),
            actor: actor.cloned(),
            action: action.name.clone(),
            resource: resource.clone(),
            allowed: decision.allowed,
            used_default: decision.used_default,
            decided_by: decision.decided_by,
            trace: decision.trace,
        };
        self.audit.record(entry.clone());
        Ok(entry)
    }

    async fn decide(&self, actor: Option<&Actor>, action: &Action, resource: &Resource) -> Decision {
        let mut trace = vec![];

        if let Some(restrictions) = actor.and_then(Actor::restrictions) {
            if !restrictions.allows(action, resource) {
                trace.push(TraceStep::new(SOURCE_TOKEN, Outcome::Deny));
                return Decision::deny(SOURCE_TOKEN, trace);
            }
            trace.push(TraceStep::new(SOURCE_TOKEN, Outcome::Allow));
        }

        let mut candidate: Option<String> = None;
        for (scope, block) in self.rules.gate_chain(action, resource) {
            if !block.matches(actor) {
                trace.push(TraceStep::new(scope.as_str(), Outcome::Deny));
                return Decision::deny(scope, trace);
            }
            trace.push(TraceStep::new(scope.as_str(), Outcome::Allow));
            candidate = Some(scope);
        }

        let req = AuthzRequest {
            actor,
            action,
            resource,
        };
        let polled = self.chain.poll(&req).await;
        trace.extend(polled.trace);
        let provider = polled.decided_by.unwrap_or_default();
        match polled.verdict {
            Verdict::Deny => return Decision::deny(provider, trace),
            Verdict::Allow => return Decision::allow(provider, trace),
            Verdict::Abstain => {}
        }

        if let Some(scope) = candidate {
            return Decision::allow(scope, trace);
        }

        Decision {
            allowed: self.effective_default(action),
            used_default: true,
            decided_by: String::from(SOURCE_DEFAULT),
            trace,
        }
    }

    /// The answer for `action` when no rule source decides.
    pub fn effective_default(&self, action: &Action) -> bool {
        if self.cfg.default_deny {
            return false;
        }
        if action.name == EXECUTE_SQL && !self.cfg.default_allow_sql {
            return false;
        }
        action.default_allow
    }

    /// Passes when any of `checks` is allowed. Otherwise fails with the first
    /// action of the list.
    pub async fn ensure_permissions(
        &self,
        actor: Option<&Actor>,
        checks: &[(&str, Resource)],
    ) -> Result<(), Forbidden> {
        for (action, resource) in checks.iter() {
            if self.resolve(actor, action, resource).await {
                return Ok(());
            }
        }

        let first = checks
            .first()
            .map(|(action, _)| action.to_string())
            .unwrap_or_default();
        Err(Forbidden(first))
    }

    /// Checks whether `actor` can see `resource` and whether it is hidden from
    /// anonymous users.
    pub async fn check_visibility(
        &self,
        actor: Option<&Actor>,
        action: &str,
        resource: &Resource,
    ) -> Visibility {
        if !self.resolve(actor, action, resource).await {
            return Visibility {
                visible: false,
                private: false,
            };
        }

        let anonymous = self.resolve(None, action, resource).await;
        Visibility {
            visible: true,
            private: !anonymous,
        }
    }

    /// Returns up to `n` recent audit entries, most recent first. Requires
    /// the `permissions-debug` action.
    pub async fn audit_for(
        &self,
        actor: Option<&Actor>,
        n: usize,
    ) -> Result<Vec<AuditEntry>, Forbidden> {
        if !self.resolve(actor, PERMISSIONS_DEBUG, &Resource::Instance).await {
            return Err(Forbidden(String::from(PERMISSIONS_DEBUG)));
        }
        Ok(self.audit.recent(n))
    }
}

fn actor_label(actor: Option<&Actor>) -> String {
    match actor {
        Some(actor) => match actor.id() {
            Some(id) => format!("actor '{id}'"),
            None => String::from("actor without id"),
        },
        None => String::from("anonymous"),
    }
}
