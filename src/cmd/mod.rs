mod check;
mod create_token;
mod verify_token;

use std::path::PathBuf;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Args, Parser, Subcommand};
use log::debug;
use serde::Serialize;

use permgate::config::Config;
use permgate::logs;

#[async_trait]
pub trait RunCommand {
    async fn run(&self) -> Result<()>;
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    /// Path to the configuration file. The format follows the extension: toml, json, yaml
    /// or yml. When omitted, the defaults are used and a random secret is generated.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the log level of the configuration: error, warn, info or debug.
    #[arg(long)]
    pub log_level: Option<String>,
}

impl ConfigArgs {
    /// Installs the logger and loads the configuration.
    pub fn load(&self) -> Result<Config> {
        logs::init(self.log_level.as_deref().unwrap_or("info"))?;

        let cfg = Config::load(self.config.as_deref())?;
        if self.log_level.is_none() {
            logs::set_level(&cfg.log_level)?;
        }
        debug!("Use config: {:?}", cfg.rules);

        Ok(cfg)
    }
}

#[derive(Parser)]
#[command(author, about, version)]
pub struct App {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    Check(check::CheckArgs),
    CreateToken(create_token::CreateTokenArgs),
    VerifyToken(verify_token::VerifyTokenArgs),
}

#[async_trait]
impl RunCommand for App {
    async fn run(&self) -> Result<()> {
        match &self.command {
            Commands::Check(args) => args.run().await,
            Commands::CreateToken(args) => args.run().await,
            Commands::VerifyToken(args) => args.run().await,
        }
    }
}

pub fn pretty_json<T: Serialize>(o: T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&o)?);
    Ok(())
}
