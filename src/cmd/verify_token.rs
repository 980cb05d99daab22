use anyhow::{Context, Result};
use async_trait::async_trait;
use clap::Args;

use permgate::action::ActionRegistry;
use permgate::authz::factory::AuthzFactory;

use super::{pretty_json, ConfigArgs, RunCommand};

/// Verify an API token and print the actor it stands for as JSON.
#[derive(Args)]
pub struct VerifyTokenArgs {
    /// The token, including the "dstok_" prefix.
    pub token: String,

    #[command(flatten)]
    pub config: ConfigArgs,
}

#[async_trait]
impl RunCommand for VerifyTokenArgs {
    async fn run(&self) -> Result<()> {
        let cfg = self.config.load()?;
        let factory = AuthzFactory::new(&cfg, ActionRegistry::builtin())?;
        let codec = factory.build_token_codec(&cfg);

        let payload = codec.verify(self.token.trim()).context("verify token")?;
        pretty_json(payload.into_actor())
    }
}
