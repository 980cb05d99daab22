use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use once_cell::sync::Lazy;
use permgate::audit::Outcome;
use permgate::config::CommonConfig;
use permgate::{
    ActionRegistry, Actor, AuthzFactory, AuthzRequest, Config, DecisionProvider, PermissionResolver,
    Resource, Restrictions, TokenError, Verdict,
};

const SECRET: &str = "integration secret";

static REGISTRY: Lazy<ActionRegistry> = Lazy::new(ActionRegistry::builtin);

fn config(s: &str) -> Config {
    let mut cfg: Config = serde_yaml::from_str(s).unwrap();
    if cfg.secret.is_empty() {
        cfg.secret = SECRET.to_string();
    }
    cfg.complete().unwrap();
    cfg
}

fn build_resolver(cfg: &Config, plugins: Vec<Box<dyn DecisionProvider>>) -> PermissionResolver {
    let factory = AuthzFactory::new(cfg, REGISTRY.clone()).unwrap();
    factory.build_resolver(cfg, plugins)
}

struct Fixed {
    name: &'static str,
    verdict: Verdict,
    only_action: Option<&'static str>,
}

#[async_trait]
impl DecisionProvider for Fixed {
    fn name(&self) -> &str {
        self.name
    }

    async fn decide(&self, req: &AuthzRequest<'_>) -> Result<Verdict> {
        if let Some(action) = self.only_action {
            if req.action.name != action {
                return Ok(Verdict::Abstain);
            }
        }
        Ok(self.verdict)
    }
}

fn fixed(name: &'static str, verdict: Verdict) -> Box<dyn DecisionProvider> {
    Box::new(Fixed {
        name,
        verdict,
        only_action: None,
    })
}

#[tokio::test]
async fn test_no_rules_no_providers() {
    let cfg = config("{}");
    let resolver = build_resolver(&cfg, vec![]);
    let table = Resource::child("mydb", "mytable");

    assert!(resolver.resolve(None, "view-table", &table).await);
    assert!(!resolver.resolve(None, "insert-row", &table).await);
    assert!(!resolver.resolve(None, "permissions-debug", &Resource::Instance).await);
}

#[tokio::test]
async fn test_instance_allow_block() {
    let cfg = config("allow: {id: root}");
    let resolver = build_resolver(&cfg, vec![]);
    let root = Actor::with_id("root");
    let trevor = Actor::with_id("trevor");
    let db = Resource::database("mydb");

    assert!(!resolver.resolve(Some(&trevor), "view-database", &db).await);
    assert!(resolver.resolve(Some(&root), "view-database", &db).await);
}

#[tokio::test]
async fn test_broad_deny_beats_narrow_allow() {
    let cfg = config(
        r#"
allow:
  id: root
databases:
  public:
    allow: true
"#,
    );
    let resolver = build_resolver(&cfg, vec![]);
    let trevor = Actor::with_id("trevor");

    let entry = resolver
        .check(Some(&trevor), "view-database", &Resource::database("public"))
        .await
        .unwrap();
    assert!(!entry.allowed);
    assert_eq!(entry.decided_by, "allow");
}

#[tokio::test]
async fn test_provider_veto() {
    let cfg = config("{}");
    let resolver = build_resolver(
        &cfg,
        vec![
            fixed("allower", Verdict::Allow),
            fixed("denier", Verdict::Deny),
            fixed("abstainer", Verdict::Abstain),
        ],
    );
    let entry = resolver
        .check(None, "view-instance", &Resource::Instance)
        .await
        .unwrap();
    assert!(!entry.allowed);
    assert_eq!(entry.decided_by, "denier");
    let outcomes: Vec<Outcome> = entry.trace.iter().map(|s| s.outcome).collect();
    assert_eq!(outcomes, vec![Outcome::Allow, Outcome::Deny, Outcome::Abstain]);

    // A provider allow overrides a default deny
    let resolver = default_resolver(vec![Box::new(Fixed {
        name: "writer",
        verdict: Verdict::Allow,
        only_action: Some("insert-row"),
    })]);
    let table = Resource::child("mydb", "t");
    assert!(resolver.resolve(None, "insert-row", &table).await);
    assert!(!resolver.resolve(None, "delete-row", &table).await);

    // All abstain falls back to the default
    let resolver = default_resolver(vec![fixed("a", Verdict::Abstain), fixed("b", Verdict::Abstain)]);
    let entry = resolver.check(None, "view-table", &table).await.unwrap();
    assert!(entry.allowed);
    assert!(entry.used_default);
}

fn default_resolver(plugins: Vec<Box<dyn DecisionProvider>>) -> PermissionResolver {
    build_resolver(&config("{}"), plugins)
}

#[tokio::test]
async fn test_token_flow() {
    let cfg = config("{}");
    let factory = AuthzFactory::new(&cfg, REGISTRY.clone()).unwrap();
    let codec = factory.build_token_codec(&cfg);
    let resolver = factory.build_resolver(&cfg, vec![]);
    let db = Resource::database("mydb");
    let table = Resource::child("mydb", "mytable");

    // Restricted token
    let restrictions = Restrictions::new().allow_all("view-table");
    let token = codec.sign("simon", &restrictions, None).unwrap();
    let header = format!("Bearer {token}");
    let actor = codec.actor_from_authorization(&header).unwrap();
    assert_eq!(actor.id().as_deref(), Some("simon"));
    assert!(actor.is_token_actor());
    assert!(resolver.resolve(Some(&actor), "view-table", &table).await);
    assert!(!resolver.resolve(Some(&actor), "execute-sql", &db).await);

    // Token actors cannot mint tokens
    let err = codec
        .create_for_actor(&actor, &Restrictions::new(), None)
        .unwrap_err();
    assert_eq!(err.downcast_ref::<TokenError>(), Some(&TokenError::TokenActor));

    // Unrestricted token
    let token = codec.sign("simon", &Restrictions::new(), None).unwrap();
    let actor = codec.verify(&token).unwrap().into_actor();
    assert!(resolver.resolve(Some(&actor), "execute-sql", &db).await);

    // Expired token
    let issued = Utc::now().timestamp() - 3600;
    let token = codec
        .sign_at("simon", &Restrictions::new(), Some(60), issued)
        .unwrap();
    assert_eq!(codec.verify(&token).unwrap_err(), TokenError::Expired);
    assert!(codec
        .actor_from_authorization(&format!("Bearer {token}"))
        .is_none());
}

#[tokio::test]
async fn test_disabled_tokens() {
    let cfg = config("token: {enabled: false}");
    let factory = AuthzFactory::new(&cfg, REGISTRY.clone()).unwrap();
    let codec = factory.build_token_codec(&cfg);

    let token = codec.sign("simon", &Restrictions::new(), None).unwrap();
    assert!(codec.verify(&token).is_ok());
    assert!(codec
        .actor_from_authorization(&format!("Bearer {token}"))
        .is_none());
}

#[tokio::test]
async fn test_concurrent_resolutions() {
    let cfg = config(
        r#"
authz:
  audit_capacity: 16
databases:
  staff:
    allow:
      roles: staff
"#,
    );
    let resolver = Arc::new(build_resolver(&cfg, vec![]));

    let handles: Vec<_> = (0..32)
        .map(|i| {
            let resolver = resolver.clone();
            tokio::spawn(async move {
                let actor = if i % 2 == 0 {
                    Actor::with_id(format!("user{i}")).attr("roles", vec!["staff"])
                } else {
                    Actor::with_id(format!("user{i}"))
                };
                let allowed = resolver
                    .resolve(Some(&actor), "view-database", &Resource::database("staff"))
                    .await;
                (i, allowed)
            })
        })
        .collect();

    for handle in handles {
        let (i, allowed) = handle.await.unwrap();
        assert_eq!(allowed, i % 2 == 0, "user{i}");
    }
    assert_eq!(resolver.audit().len(), 16);
}

#[tokio::test]
async fn test_deadline() {
    struct Stuck;

    #[async_trait]
    impl DecisionProvider for Stuck {
        fn name(&self) -> &str {
            "stuck"
        }

        async fn decide(&self, _req: &AuthzRequest<'_>) -> Result<Verdict> {
            std::future::pending::<()>().await;
            Ok(Verdict::Allow)
        }
    }

    let resolver = default_resolver(vec![Box::new(Stuck)]);
    let result = resolver
        .resolve_within(
            None,
            "view-instance",
            &Resource::Instance,
            Duration::from_millis(50),
        )
        .await;
    assert!(result.is_err());
}
