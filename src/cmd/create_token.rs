use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use clap::{ArgAction, Args};
use log::warn;

use permgate::action::ActionRegistry;
use permgate::authz::factory::AuthzFactory;
use permgate::token::Restrictions;

use super::{ConfigArgs, RunCommand};

/// Create a signed API token acting as the given actor id. The token is printed to stdout
/// and is accepted as an `Authorization: Bearer` header value.
#[derive(Args)]
pub struct CreateTokenArgs {
    /// The id of the actor the token acts as.
    pub id: String,

    /// Token lifetime, e.g. "1h" or "30m". Without it, the token only expires when the
    /// configuration imposes a max_ttl.
    #[arg(short, long)]
    pub expires_after: Option<String>,

    /// Restrict the token to this action on every resource. Can be repeated.
    #[arg(short, long, value_name = "ACTION")]
    pub all: Vec<String>,

    /// Restrict the token to an action on one database. Can be repeated.
    #[arg(short, long, num_args = 2, value_names = ["DB", "ACTION"], action = ArgAction::Append)]
    pub database: Vec<String>,

    /// Restrict the token to an action on one table or query. Can be repeated.
    #[arg(short, long, num_args = 3, value_names = ["DB", "RESOURCE", "ACTION"], action = ArgAction::Append)]
    pub resource: Vec<String>,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait]
impl RunCommand for CreateTokenArgs {
    async fn run(&self) -> Result<()> {
        let cfg = self.config.load()?;
        if !cfg.token.enabled {
            warn!("Signed tokens are disabled in the configuration, the token will be rejected");
        }

        let registry = ActionRegistry::builtin();
        let restrictions = self.build_restrictions(&registry)?;
        let expires_after = self.parse_expires_after()?;

        let factory = AuthzFactory::new(&cfg, registry)?;
        let codec = factory.build_token_codec(&cfg);
        let token = codec.sign(&self.id, &restrictions, expires_after)?;

        println!("{token}");
        Ok(())
    }
}

impl CreateTokenArgs {
    fn build_restrictions(&self, registry: &ActionRegistry) -> Result<Restrictions> {
        let check = |action: &str| -> Result<()> {
            if registry.get(action).is_none() {
                bail!("unknown action '{action}'");
            }
            Ok(())
        };

        let mut restrictions = Restrictions::new();
        for action in self.all.iter() {
            check(action)?;
            restrictions = restrictions.allow_all(action.as_str());
        }
        for pair in self.database.chunks_exact(2) {
            check(&pair[1])?;
            restrictions = restrictions.allow_database(pair[0].as_str(), pair[1].as_str());
        }
        for triple in self.resource.chunks_exact(3) {
            check(&triple[2])?;
            restrictions = restrictions.allow_resource(
                triple[0].as_str(),
                triple[1].as_str(),
                triple[2].as_str(),
            );
        }

        Ok(restrictions)
    }

    fn parse_expires_after(&self) -> Result<Option<u64>> {
        let s = match self.expires_after {
            Some(ref s) => s,
            None => return Ok(None),
        };
        let duration = humantime::parse_duration(s)
            .with_context(|| format!("parse expires_after '{s}'"))?;
        if duration.as_secs() == 0 {
            bail!("expires_after must be at least one second");
        }
        Ok(Some(duration.as_secs()))
    }
}
