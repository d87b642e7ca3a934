use std::net::SocketAddr;
use std::path::Path;

use anyhow::{Context, Result, bail};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::core::remapper::MIN_NAME_LENGTH;
use crate::daemon::WireContract;

/// Prefix of environment variables that override config values.
pub const ENV_PREFIX: &str = "DBAAS_BACKUP_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Base URL of the backup daemon.
    pub daemon_url: String,
    /// Address the HTTP API listens on.
    pub bind: SocketAddr,
    /// Application segment accepted in API routes (e.g. `postgresql`).
    pub app_name: String,
    pub wire_contract: WireContract,
    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
    /// Upper bound for generated database names.
    pub max_name_length: usize,
    pub verbose: bool,
    pub json_logs: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            daemon_url: "http://localhost:8080".to_string(),
            bind: SocketAddr::from(([0, 0, 0, 0], 8088)),
            app_name: "postgresql".to_string(),
            wire_contract: WireContract::V2,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
            max_name_length: 63,
            verbose: false,
            json_logs: false,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from defaults, an optional TOML file, the
    /// environment and finally `overrides` (usually CLI arguments).
    pub fn new<T: Serialize>(file: Option<&Path>, overrides: Option<&T>) -> Result<Self> {
        let mut figment = Figment::from(Serialized::defaults(AppConfig::default()));

        if let Some(path) = file {
            if !path.exists() {
                bail!("Config file not found: {}", path.display());
            }
            figment = figment.merge(Toml::file(path));
        }

        figment = figment.merge(Env::prefixed(ENV_PREFIX));

        if let Some(overrides) = overrides {
            figment = figment.merge(Serialized::defaults(overrides));
        }

        let config: AppConfig = figment.extract().context("Failed to load configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let url = Url::parse(&self.daemon_url)
            .with_context(|| format!("Invalid daemon_url: {}", self.daemon_url))?;
        if url.cannot_be_a_base() {
            bail!("daemon_url cannot be used as a base URL: {}", self.daemon_url);
        }
        if self.max_name_length < MIN_NAME_LENGTH {
            bail!(
                "max_name_length must be at least {MIN_NAME_LENGTH}, got {}",
                self.max_name_length
            );
        }
        if self.request_timeout_secs == 0 {
            bail!("request_timeout_secs must be greater than zero");
        }
        if self.app_name.trim().is_empty() {
            bail!("app_name must not be empty");
        }
        Ok(())
    }
}
