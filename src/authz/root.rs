use anyhow::Result;
use async_trait::async_trait;

use super::{AuthzRequest, DecisionProvider, Verdict};

/// Allows everything for the actor whose id is "root".
pub struct RootProvider;

impl RootProvider {
    pub const ROOT_ID: &'static str = "root";

    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl DecisionProvider for RootProvider {
    fn name(&self) -> &str {
        "root"
    }

    async fn decide(&self, req: &AuthzRequest<'_>) -> Result<Verdict> {
        let is_root = req
            .actor
            .and_then(|actor| actor.id())
            .is_some_and(|id| id == Self::ROOT_ID);
        if is_root {
            return Ok(Verdict::Allow);
        }

        Ok(Verdict::Abstain)
    }
}
