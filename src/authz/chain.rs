use log::warn;

use crate::audit::{Outcome, TraceStep};

use super::union::UnionProvider;
use super::{AuthzRequest, DecisionProvider, Verdict};

/// The combined opinion of a provider chain.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainOutcome {
    pub verdict: Verdict,
    /// The provider that decided: the first denier, else the first allower.
    pub decided_by: Option<String>,
    /// One step per polled provider, in poll order.
    pub trace: Vec<TraceStep>,
}

/// Polls decision providers in registration order.
///
/// Every provider is asked even after a decision is known, so the trace
/// always shows the full picture. Any deny vetoes; otherwise any allow
/// allows; otherwise the chain abstains.
pub struct ChainProvider {
    providers: Vec<UnionProvider>,
}

impl ChainProvider {
    pub fn new(providers: Vec<UnionProvider>) -> Self {
        Self { providers }
    }

    pub async fn poll(&self, req: &AuthzRequest<'_>) -> ChainOutcome {
        let mut trace = Vec::with_capacity(self.providers.len());
        let mut denied_by: Option<String> = None;
        let mut allowed_by: Option<String> = None;

        for provider in self.providers.iter() {
            let name = provider.name().to_string();
            let outcome = match provider.decide(req).await {
                Ok(Verdict::Allow) => {
                    allowed_by.get_or_insert_with(|| name.clone());
                    Outcome::Allow
                }
                Ok(Verdict::Deny) => {
                    denied_by.get_or_insert_with(|| name.clone());
                    Outcome::Deny
                }
                Ok(Verdict::Abstain) => Outcome::Abstain,
                Err(e) => {
                    warn!(
                        "Decision provider '{name}' failed on '{}' for {}: {e:#}",
                        req.action.name, req.resource
                    );
                    Outcome::Error
                }
            };
            trace.push(TraceStep::new(name, outcome));
        }

        let (verdict, decided_by) = match (denied_by, allowed_by) {
            (Some(name), _) => (Verdict::Deny, Some(name)),
            (None, Some(name)) => (Verdict::Allow, Some(name)),
            (None, None) => (Verdict::Abstain, None),
        };

        ChainOutcome {
            verdict,
            decided_by,
            trace,
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::{bail, Result};
    use async_trait::async_trait;

    use crate::action::ActionRegistry;
    use crate::resource::Resource;

    use super::*;

    struct Fixed {
        name: &'static str,
        verdict: Option<Verdict>,
    }

    #[async_trait]
    impl DecisionProvider for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        async fn decide(&self, _req: &AuthzRequest<'_>) -> Result<Verdict> {
            match self.verdict {
                Some(verdict) => Ok(verdict),
                None => bail!("backend unavailable"),
            }
        }
    }

    fn fixed(name: &'static str, verdict: Option<Verdict>) -> UnionProvider {
        UnionProvider::Plugin(Box::new(Fixed { name, verdict }))
    }

    #[tokio::test]
    async fn test_chain_poll() {
        let registry = ActionRegistry::builtin();
        let action = registry.get("view-table").unwrap();
        let resource = Resource::child("mydb", "mytable");
        let req = AuthzRequest {
            actor: None,
            action: &action,
            resource: &resource,
        };

        // Test case 1: Empty chain abstains
        let chain = ChainProvider::new(vec![]);
        let outcome = chain.poll(&req).await;
        assert_eq!(outcome.verdict, Verdict::Abstain);
        assert!(outcome.trace.is_empty());

        // Test case 2: Deny vetoes an earlier allow
        let chain = ChainProvider::new(vec![
            fixed("a", Some(Verdict::Allow)),
            fixed("b", Some(Verdict::Deny)),
            fixed("c", Some(Verdict::Allow)),
        ]);
        let outcome = chain.poll(&req).await;
        assert_eq!(outcome.verdict, Verdict::Deny);
        assert_eq!(outcome.decided_by.as_deref(), Some("b"));
        assert_eq!(outcome.trace.len(), 3);

        // Test case 3: Errors count as abstain
        let chain = ChainProvider::new(vec![
            fixed("broken", None),
            fixed("ok", Some(Verdict::Allow)),
        ]);
        let outcome = chain.poll(&req).await;
        assert_eq!(outcome.verdict, Verdict::Allow);
        assert_eq!(outcome.decided_by.as_deref(), Some("ok"));
        assert_eq!(outcome.trace[0].outcome, Outcome::Error);

        // Test case 4: All abstain
        let chain = ChainProvider::new(vec![fixed("a", Some(Verdict::Abstain)), fixed("b", None)]);
        let outcome = chain.poll(&req).await;
        assert_eq!(outcome.verdict, Verdict::Abstain);
        assert_eq!(outcome.decided_by, None);
    }
}
