//! Repository traits describing the settings storage adapters.

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::options::{OptionTable, OptionValue};
use crate::domain::sites::{NetworkId, SiteId};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("stored value for `{name}` could not be decoded: {message}")]
    Decode { name: String, message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }

    pub fn decode(name: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Decode {
            name: name.into(),
            message: err.to_string(),
        }
    }
}

/// Per-site key/value settings.
///
/// `add` never overwrites; `update` inserts missing keys and reports `false`
/// when the stored value is already equal; `delete` reports `false` when the
/// key was absent.
#[async_trait]
pub trait SiteOptionStore: Send + Sync {
    async fn add(&self, site: SiteId, name: &str, value: &OptionValue) -> Result<bool, RepoError>;

    async fn get(&self, site: SiteId, name: &str) -> Result<Option<OptionValue>, RepoError>;

    async fn update(
        &self,
        site: SiteId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError>;

    async fn delete(&self, site: SiteId, name: &str) -> Result<bool, RepoError>;

    /// Batch read; keys that are not stored are simply missing from the result.
    async fn get_many(&self, site: SiteId, names: &[String]) -> Result<OptionTable, RepoError>;
}

/// Network-level settings for multi-site deployments.
#[async_trait]
pub trait NetworkOptionStore: Send + Sync {
    async fn add(
        &self,
        network: NetworkId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError>;

    async fn get(&self, network: NetworkId, name: &str)
    -> Result<Option<OptionValue>, RepoError>;

    async fn update(
        &self,
        network: NetworkId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError>;

    async fn delete(&self, network: NetworkId, name: &str) -> Result<bool, RepoError>;

    async fn get_many(
        &self,
        network: NetworkId,
        names: &[String],
    ) -> Result<OptionTable, RepoError>;
}
