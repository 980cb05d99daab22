use std::fs;
use std::io;
use std::path::Path;

use anyhow::{bail, Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};

use crate::authz::config::AuthzConfig;
use crate::rules::InstanceRules;
use crate::token::config::TokenConfig;

mod defaults;

/// Configuration sections share this shape: a default constructor used when
/// the section is missing, and a `complete` pass that normalizes and validates
/// values after deserialization.
pub trait CommonConfig {
    fn default() -> Self;
    fn complete(&mut self) -> Result<()>;
}

/// See: [`shellexpand::full`].
pub fn expandenv(name: &str, s: impl AsRef<str>) -> Result<String> {
    let s =
        shellexpand::full(s.as_ref()).with_context(|| format!("expand env value for '{name}'"))?;
    Ok(s.to_string())
}

/// The whole configuration file.
///
/// Settings live in their own sections; the permission rules (`allow`,
/// `allow_sql`, `permissions`, `databases`) sit at the top level.
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct Config {
    /// Secret used to sign tokens and cookies. Supports env expansion, e.g.
    /// `$PERMGATE_SECRET`. When empty a random secret is generated, which means
    /// tokens do not survive a restart.
    #[serde(default = "defaults::empty_string")]
    pub secret: String,

    /// One of `error`, `warn`, `info`, `debug`.
    /// Default: "info"
    #[serde(default = "defaults::log_level")]
    pub log_level: String,

    #[serde(default = "AuthzConfig::default")]
    pub authz: AuthzConfig,

    #[serde(default = "TokenConfig::default")]
    pub token: TokenConfig,

    #[serde(flatten)]
    pub rules: InstanceRules,
}

impl CommonConfig for Config {
    fn default() -> Self {
        Self {
            secret: defaults::empty_string(),
            log_level: defaults::log_level(),
            authz: AuthzConfig::default(),
            token: TokenConfig::default(),
            rules: InstanceRules::default(),
        }
    }

    fn complete(&mut self) -> Result<()> {
        self.secret = expandenv("secret", &self.secret)?;
        if self.secret.is_empty() {
            warn!("No secret configured, using a random one; tokens will not survive a restart");
            self.secret = defaults::random_secret();
        }

        if !defaults::LOG_LEVELS.contains(&self.log_level.as_str()) {
            bail!(
                "invalid log_level '{}', expect one of {:?}",
                self.log_level,
                defaults::LOG_LEVELS
            );
        }

        self.authz.complete().context("validate authz config")?;
        self.token.complete().context("validate token config")?;
        Ok(())
    }
}

impl Config {
    /// Loads the configuration from `path`. The format follows the file
    /// extension: `.toml`, `.json`, `.yaml` or `.yml`. A missing file yields
    /// the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path,
            None => {
                let mut cfg = <Self as CommonConfig>::default();
                cfg.complete().context("validate config")?;
                return Ok(cfg);
            }
        };

        let mut cfg = match fs::read_to_string(path) {
            Ok(s) => Self::parse(&s, path)
                .with_context(|| format!("parse config file '{}'", path.display()))?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                warn!("Config file '{}' not found, using defaults", path.display());
                <Self as CommonConfig>::default()
            }
            Err(err) => {
                return Err(err).with_context(|| format!("read config file '{}'", path.display()));
            }
        };

        cfg.complete().context("validate config")?;
        Ok(cfg)
    }

    fn parse(s: &str, path: &Path) -> Result<Self> {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        let cfg = match ext {
            "toml" => toml::from_str(s).context("parse toml")?,
            "json" => serde_json::from_str(s).context("parse json")?,
            "yaml" | "yml" => serde_yaml::from_str(s).context("parse yaml")?,
            _ => bail!("unsupported config format '{ext}', expect toml, json or yaml"),
        };
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use crate::allow::AllowBlock;

    use super::*;

    #[test]
    fn test_parse_formats() {
        let yaml = r#"
secret: s3cret
authz:
  root_enabled: true
token:
  max_ttl: 3600
allow:
  id: "*"
databases:
  fixtures:
    allow_sql: false
"#;
        let cfg = Config::parse(yaml, &PathBuf::from("permgate.yaml")).unwrap();
        assert_eq!(cfg.secret, "s3cret");
        assert!(cfg.authz.root_enabled);
        assert_eq!(cfg.token.max_ttl, 3600);
        assert!(cfg.token.enabled);
        assert!(cfg.rules.allow.is_some());
        assert_eq!(
            cfg.rules.databases["fixtures"].allow_sql,
            Some(AllowBlock::Always(false))
        );

        let toml = r#"
secret = "s3cret"
allow_sql = false

[authz]
default_deny = true

[databases.fixtures.tables.secrets]
allow = { id = "root" }
"#;
        let cfg = Config::parse(toml, &PathBuf::from("permgate.toml")).unwrap();
        assert!(cfg.authz.default_deny);
        assert_eq!(cfg.rules.allow_sql, Some(AllowBlock::Always(false)));
        assert!(cfg.rules.databases["fixtures"].tables["secrets"]
            .allow
            .is_some());

        let json = r#"{"permissions": {"create-table": {"id": "root"}}}"#;
        let cfg = Config::parse(json, &PathBuf::from("permgate.json")).unwrap();
        assert_eq!(cfg.rules.permissions.len(), 1);
        assert_eq!(cfg.log_level, "info");

        assert!(Config::parse(json, &PathBuf::from("permgate.ini")).is_err());
    }

    #[test]
    fn test_complete() {
        let mut cfg = <Config as CommonConfig>::default();
        cfg.complete().unwrap();
        assert_eq!(cfg.secret.len(), 64);

        let mut cfg = <Config as CommonConfig>::default();
        cfg.log_level = String::from("verbose");
        assert!(cfg.complete().is_err());

        let mut cfg = <Config as CommonConfig>::default();
        cfg.authz.audit_capacity = 0;
        assert!(cfg.complete().is_err());
    }

    #[test]
    fn test_load_missing() {
        let cfg = Config::load(Some(Path::new("/nonexistent/permgate.yaml"))).unwrap();
        assert!(!cfg.secret.is_empty());
        assert!(cfg.rules.databases.is_empty());
    }
}
