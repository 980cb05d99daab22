use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::rules::InstanceRules;

use super::{AuthzRequest, DecisionProvider, Verdict};

/// An authorizer that handles the per-action `permissions` blocks of the
/// configuration.
///
/// The most specific block configured for the action decides:
/// - No block anywhere on the resource path: abstain
/// - The actor matches the block: allow
/// - Otherwise: deny
pub struct ConfigPermissionsProvider {
    rules: Arc<InstanceRules>,
}

impl ConfigPermissionsProvider {
    pub fn new(rules: Arc<InstanceRules>) -> Self {
        Self { rules }
    }
}

#[async_trait]
impl DecisionProvider for ConfigPermissionsProvider {
    fn name(&self) -> &str {
        "config permissions"
    }

    async fn decide(&self, req: &AuthzRequest<'_>) -> Result<Verdict> {
        let block = match self.rules.permission_block(req.action, req.resource) {
            Some((_, block)) => block,
            None => return Ok(Verdict::Abstain),
        };

        if block.matches(req.actor) {
            return Ok(Verdict::Allow);
        }
        Ok(Verdict::Deny)
    }
}

#[cfg(test)]
mod tests {
    use crate::action::ActionRegistry;
    use crate::actor::Actor;
    use crate::resource::Resource;

    use super::*;

    #[tokio::test]
    async fn test_permissions_provider() {
        let rules: InstanceRules = serde_yaml::from_str(
            r#"
permissions:
  create-table:
    id: editor
databases:
  fixtures:
    permissions:
      ct:
        id: admin
    tables:
      logs:
        permissions:
          insert-row: true
"#,
        )
        .unwrap();
        let provider = ConfigPermissionsProvider::new(Arc::new(rules));
        let registry = ActionRegistry::builtin();
        let create_table = registry.get("create-table").unwrap();
        let insert_row = registry.get("insert-row").unwrap();
        let editor = Actor::with_id("editor");
        let admin = Actor::with_id("admin");

        // Test case 1: Instance block applies to other databases
        let resource = Resource::database("other");
        let req = AuthzRequest {
            actor: Some(&editor),
            action: &create_table,
            resource: &resource,
        };
        assert_eq!(provider.decide(&req).await.unwrap(), Verdict::Allow);

        // Test case 2: Database block, keyed by abbreviation, overrides the instance one
        let resource = Resource::database("fixtures");
        let req = AuthzRequest {
            resource: &resource,
            ..req
        };
        assert_eq!(provider.decide(&req).await.unwrap(), Verdict::Deny);
        let req = AuthzRequest {
            actor: Some(&admin),
            ..req
        };
        assert_eq!(provider.decide(&req).await.unwrap(), Verdict::Allow);

        // Test case 3: Table block
        let resource = Resource::child("fixtures", "logs");
        let req = AuthzRequest {
            actor: None,
            action: &insert_row,
            resource: &resource,
        };
        assert_eq!(provider.decide(&req).await.unwrap(), Verdict::Allow);

        // Test case 4: No block for the action
        let resource = Resource::child("fixtures", "other");
        let req = AuthzRequest {
            resource: &resource,
            ..req
        };
        assert_eq!(provider.decide(&req).await.unwrap(), Verdict::Abstain);
    }
}
