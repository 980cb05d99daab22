use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::Args;

use permgate::action::ActionRegistry;
use permgate::actor::Actor;
use permgate::authz::factory::AuthzFactory;
use permgate::config::Config;
use permgate::resource::Resource;

use super::{pretty_json, ConfigArgs, RunCommand};

/// Resolve a permission check against the configuration and print the audit entry, with
/// the trace of every rule source consulted, as JSON.
#[derive(Args)]
pub struct CheckArgs {
    /// The action name or abbreviation, e.g. "view-table" or "vt".
    pub action: String,

    /// The database the action targets.
    pub database: Option<String>,

    /// The table, view or canned query inside the database.
    pub child: Option<String>,

    /// The actor as a JSON object, e.g. '{"id": "simon", "roles": ["staff"]}'. Omit for an
    /// anonymous check.
    #[arg(short, long, conflicts_with = "token")]
    pub actor: Option<String>,

    /// Check as the actor of this API token instead.
    #[arg(short, long)]
    pub token: Option<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait]
impl RunCommand for CheckArgs {
    async fn run(&self) -> Result<()> {
        let cfg = self.config.load()?;
        let factory = AuthzFactory::new(&cfg, ActionRegistry::builtin())?;

        let actor = self.actor(&cfg, &factory)?;

        let resolver = factory.build_resolver(&cfg, vec![]);
        let entry = resolver
            .check(actor.as_ref(), &self.action, &self.resource()?)
            .await?;

        pretty_json(entry)
    }
}

impl CheckArgs {
    fn actor(&self, cfg: &Config, factory: &AuthzFactory) -> Result<Option<Actor>> {
        if let Some(json) = self.actor.as_ref() {
            let actor: Actor = serde_json::from_str(json).context("parse actor json")?;
            return Ok(Some(actor));
        }

        let token = match self.token.as_ref() {
            Some(token) => token.trim(),
            None => return Ok(None),
        };
        if !cfg.token.enabled {
            bail!("signed tokens are disabled in the configuration, the token would be ignored");
        }
        let codec = factory.build_token_codec(cfg);
        let payload = codec.verify(token).context("verify token")?;
        Ok(Some(payload.into_actor()))
    }

    fn resource(&self) -> Result<Resource> {
        match (self.database.as_ref(), self.child.as_ref()) {
            (None, None) => Ok(Resource::Instance),
            (Some(db), None) => Ok(Resource::database(db.as_str())),
            (Some(db), Some(child)) => Ok(Resource::child(db.as_str(), child.as_str())),
            (None, Some(_)) => bail!("child resource requires a database"),
        }
    }
}
