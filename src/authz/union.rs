use anyhow::Result;
use async_trait::async_trait;

use super::permissions::ConfigPermissionsProvider;
use super::root::RootProvider;
use super::{AuthzRequest, DecisionProvider, Verdict};

pub enum UnionProvider {
    Root(RootProvider),
    Permissions(ConfigPermissionsProvider),
    Plugin(Box<dyn DecisionProvider>),
}

#[async_trait]
impl DecisionProvider for UnionProvider {
    fn name(&self) -> &str {
        match self {
            UnionProvider::Root(r) => r.name(),
            UnionProvider::Permissions(p) => p.name(),
            UnionProvider::Plugin(p) => p.name(),
        }
    }

    async fn decide(&self, req: &AuthzRequest<'_>) -> Result<Verdict> {
        match self {
            UnionProvider::Root(r) => r.decide(req).await,
            UnionProvider::Permissions(p) => p.decide(req).await,
            UnionProvider::Plugin(p) => p.decide(req).await,
        }
    }
}
