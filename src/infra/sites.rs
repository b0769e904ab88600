//! Site directory backed by a TOML fixture.
//!
//! ```toml
//! directory_permalink = "https://example.test/sites/"
//! members_root = "https://example.test/members/"
//!
//! [[sites]]
//! id = 2
//! name = "Field notes"
//! permalink = "https://example.test/field-notes/"
//! owner_ids = [3]
//! last_active = "2 hours ago"
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::application::directory::SiteDirectorySource;
use crate::application::repos::RepoError;
use crate::domain::sites::{SiteSummary, UserId};

use super::error::InfraError;

#[derive(Debug, Clone, Deserialize)]
pub struct StaticSiteDirectory {
    directory_permalink: String,
    members_root: String,
    #[serde(default)]
    sites: Vec<SiteSummary>,
}

impl StaticSiteDirectory {
    pub fn new(
        directory_permalink: impl Into<String>,
        members_root: impl Into<String>,
        sites: Vec<SiteSummary>,
    ) -> Self {
        Self {
            directory_permalink: directory_permalink.into(),
            members_root: members_root.into(),
            sites,
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, InfraError> {
        toml::from_str(raw).map_err(|err| InfraError::fixture(err.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self, InfraError> {
        let raw = std::fs::read_to_string(path).map_err(|err| InfraError::read(path, err))?;
        let directory = Self::from_toml_str(&raw)?;
        info!(
            target = "infra::sites",
            path = %path.display(),
            sites = directory.sites.len(),
            "site fixture loaded"
        );
        Ok(directory)
    }
}

#[async_trait]
impl SiteDirectorySource for StaticSiteDirectory {
    async fn total_site_count(&self) -> Result<u64, RepoError> {
        Ok(self.sites.len() as u64)
    }

    async fn site_count_for_user(&self, user: UserId) -> Result<u64, RepoError> {
        Ok(self.sites.iter().filter(|site| site.is_owned_by(user)).count() as u64)
    }

    fn directory_permalink(&self) -> String {
        self.directory_permalink.clone()
    }

    fn user_sites_link(&self, user: UserId) -> String {
        format!("{}/{user}/sites/", self.members_root.trim_end_matches('/'))
    }

    async fn list_sites(&self) -> Result<Vec<SiteSummary>, RepoError> {
        Ok(self.sites.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
directory_permalink = "https://example.test/sites/"
members_root = "https://example.test/members/"

[[sites]]
id = 1
name = "Main"
permalink = "https://example.test/"
owner_ids = [1]

[[sites]]
id = 2
name = "Field notes"
permalink = "https://example.test/field-notes/"
owner_ids = [1, 3]
last_active = "2 hours ago"
"#;

    #[tokio::test]
    async fn counts_sites_per_owner() {
        let directory = StaticSiteDirectory::from_toml_str(FIXTURE).expect("fixture parses");

        assert_eq!(directory.total_site_count().await.unwrap(), 2);
        assert_eq!(directory.site_count_for_user(UserId(1)).await.unwrap(), 2);
        assert_eq!(directory.site_count_for_user(UserId(3)).await.unwrap(), 1);
        assert_eq!(directory.site_count_for_user(UserId(9)).await.unwrap(), 0);
        assert_eq!(
            directory.user_sites_link(UserId(3)),
            "https://example.test/members/3/sites/"
        );
    }

    #[test]
    fn malformed_fixture_is_rejected() {
        let err = StaticSiteDirectory::from_toml_str("sites = 3").unwrap_err();
        assert!(matches!(err, InfraError::Fixture { .. }));
    }

    #[test]
    fn missing_fixture_names_the_path() {
        let err = StaticSiteDirectory::load(Path::new("/nonexistent/sites.toml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/sites.toml"));
    }
}
