//! Layered agent configuration.
//!
//! Values are resolved in this order, later layers winning:
//! 1. Built-in defaults ([`Conf::default`])
//! 2. The TOML file named by `--config` / `IPQ_CONFIG_PATH`, if any
//! 3. `IPQ_`-prefixed environment variables (`IPQ_COPY_MODE=packet`, ...)

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cli::Cli;
use crate::protocol::{CopyMode, Decision};

/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "IPQ_";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Conf {
    /// How much of each packet the kernel copies to the agent.
    pub copy_mode: CopyMode,
    /// Copy range in bytes; 0 copies whole packets in `packet` mode.
    pub range: usize,
    /// Netlink port to bind and write into headers. Defaults to the process id.
    pub origin_id: Option<u32>,
    /// Decision of the built-in static policy.
    pub default_verdict: Decision,
    /// Path of the file the configuration was loaded from.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Conf {
    fn default() -> Self {
        Self {
            copy_mode: CopyMode::Meta,
            range: 0,
            origin_id: None,
            default_verdict: Decision::Accept,
            config_path: None,
        }
    }
}

impl Conf {
    /// Resolve the configuration for the given command line.
    pub fn new(cli: &Cli) -> Result<Self, ConfigError> {
        let mut figment = Figment::new().merge(Serialized::defaults(Conf::default()));

        if let Some(config_path) = &cli.config {
            validate_config_path(config_path)?;
            figment = figment.merge(Toml::file(config_path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX).ignore(&["config_path", "log_level"]));

        let mut conf: Conf = figment.extract()?;
        conf.config_path = cli.config.clone();
        Ok(conf)
    }

    /// Origin id to use, falling back to the process id.
    pub fn resolved_origin_id(&self) -> u32 {
        self.origin_id.unwrap_or_else(std::process::id)
    }
}

fn validate_config_path(path: &Path) -> Result<(), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::NoConfigFile(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(ConfigError::InvalidConfigPath(path.to_path_buf()));
    }
    Ok(())
}

#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file does not exist.
    #[error("config file '{}' does not exist", .0.display())]
    NoConfigFile(PathBuf),
    /// The path exists but is not a file.
    #[error("path '{}' is not a valid file", .0.display())]
    InvalidConfigPath(PathBuf),
    /// A layer could not be parsed or extracted.
    #[error("configuration error: {0}")]
    Extraction(#[from] Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(e: figment::Error) -> Self {
        ConfigError::Extraction(Box::new(e))
    }
}
