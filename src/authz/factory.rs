use std::sync::Arc;

use anyhow::{Context, Result};

use crate::action::ActionRegistry;
use crate::audit::AuditLog;
use crate::config::Config;
use crate::rules::InstanceRules;
use crate::token::cookie::ActorCookie;
use crate::token::signer::Signer;
use crate::token::TokenCodec;

use super::chain::ChainProvider;
use super::permissions::ConfigPermissionsProvider;
use super::resolver::PermissionResolver;
use super::root::RootProvider;
use super::union::UnionProvider;
use super::DecisionProvider;

/// Builds the authorization services from a completed [`Config`].
pub struct AuthzFactory {
    registry: Arc<ActionRegistry>,
    rules: Arc<InstanceRules>,
    signer: Arc<Signer>,
}

impl AuthzFactory {
    /// Validates the configured rules against `registry` and prepares the
    /// shared state.
    pub fn new(cfg: &Config, registry: ActionRegistry) -> Result<Self> {
        registry
            .validate_rules(&cfg.rules)
            .context("validate permission rules")?;

        Ok(Self {
            registry: Arc::new(registry),
            rules: Arc::new(cfg.rules.clone()),
            signer: Arc::new(Signer::new(cfg.secret.as_str())),
        })
    }

    pub fn registry(&self) -> Arc<ActionRegistry> {
        self.registry.clone()
    }

    /// Builds the resolver. Built-in providers are polled before `plugins`,
    /// which keep their order.
    pub fn build_resolver(
        &self,
        cfg: &Config,
        plugins: Vec<Box<dyn DecisionProvider>>,
    ) -> PermissionResolver {
        let mut providers = vec![];

        if cfg.authz.root_enabled {
            providers.push(UnionProvider::Root(RootProvider::new()));
        }

        if !self.rules.permission_actions().is_empty() {
            let permissions = ConfigPermissionsProvider::new(self.rules.clone());
            providers.push(UnionProvider::Permissions(permissions));
        }

        providers.extend(plugins.into_iter().map(UnionProvider::Plugin));

        let audit = Arc::new(AuditLog::new(cfg.authz.audit_capacity));
        PermissionResolver::new(
            self.registry.clone(),
            self.rules.clone(),
            ChainProvider::new(providers),
            audit,
            cfg.authz.clone(),
        )
    }

    pub fn build_token_codec(&self, cfg: &Config) -> TokenCodec {
        TokenCodec::new(self.signer.clone(), self.registry.clone(), cfg.token.clone())
    }

    pub fn build_actor_cookie(&self) -> ActorCookie {
        ActorCookie::new(self.signer.clone())
    }
}
