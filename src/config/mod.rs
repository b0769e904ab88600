//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

pub use cli::{
    CliArgs, Command, GetArgs, GlobalOverrides, NameArgs, RenderDirectoryArgs, SetArgs,
};

use std::{num::NonZeroU32, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::context::Deployment;
use crate::domain::sites::{NetworkId, SiteId};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "kinship";
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 4;
const DEFAULT_NONCE_SECRET: &str = "kinship-development-nonce-secret";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub deployment: DeploymentSettings,
    pub nonce: NonceSettings,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeploymentSettings {
    pub multisite: bool,
    pub multiblog: bool,
    pub root_site: SiteId,
    pub current_site: SiteId,
    pub network: NetworkId,
}

impl DeploymentSettings {
    pub fn deployment(&self) -> Deployment {
        if self.multisite {
            Deployment::Multisite {
                root_site: self.root_site,
                current_site: self.current_site,
                network: self.network,
                multiblog: self.multiblog,
            }
        } else {
            Deployment::Single {
                root_site: self.root_site,
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct NonceSettings {
    pub secret: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("KINSHIP").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_overrides(&cli.overrides);

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    deployment: RawDeploymentSettings,
    nonce: RawNonceSettings,
}

impl RawSettings {
    fn apply_overrides(&mut self, overrides: &GlobalOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(id) = overrides.root_site_id {
            self.deployment.root_site_id = Some(id);
        }
        if let Some(id) = overrides.current_site_id {
            self.deployment.current_site_id = Some(id);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            logging,
            database,
            deployment,
            nonce,
        } = raw;

        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let deployment = build_deployment_settings(deployment)?;
        let nonce = build_nonce_settings(nonce)?;

        Ok(Self {
            logging,
            database,
            deployment,
            nonce,
        })
    }
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_deployment_settings(
    deployment: RawDeploymentSettings,
) -> Result<DeploymentSettings, LoadError> {
    let multisite = deployment.multisite.unwrap_or(false);
    let multiblog = deployment.multiblog.unwrap_or(false);
    if multiblog && !multisite {
        return Err(LoadError::invalid(
            "deployment.multiblog",
            "requires deployment.multisite",
        ));
    }

    let root_site = SiteId(non_zero_id(
        deployment.root_site_id,
        SiteId::ROOT.0,
        "deployment.root_site_id",
    )?);
    let current_site = SiteId(non_zero_id(
        deployment.current_site_id,
        root_site.0,
        "deployment.current_site_id",
    )?);
    let network = NetworkId(non_zero_id(
        deployment.network_id,
        NetworkId::MAIN.0,
        "deployment.network_id",
    )?);

    Ok(DeploymentSettings {
        multisite,
        multiblog,
        root_site,
        current_site,
        network,
    })
}

fn build_nonce_settings(nonce: RawNonceSettings) -> Result<NonceSettings, LoadError> {
    let secret = nonce
        .secret
        .unwrap_or_else(|| DEFAULT_NONCE_SECRET.to_string());
    if secret.trim().is_empty() {
        return Err(LoadError::invalid("nonce.secret", "must not be empty"));
    }
    Ok(NonceSettings { secret })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDeploymentSettings {
    multisite: Option<bool>,
    multiblog: Option<bool>,
    root_site_id: Option<u64>,
    current_site_id: Option<u64>,
    network_id: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawNonceSettings {
    secret: Option<String>,
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn non_zero_id(value: Option<u64>, default: u64, key: &'static str) -> Result<u64, LoadError> {
    match value.unwrap_or(default) {
        0 => Err(LoadError::invalid(key, "ids start at 1")),
        id => Ok(id),
    }
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
