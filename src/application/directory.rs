//! Resolves the sites directory view and hands it to the renderer.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::application::error::AppError;
use crate::application::repos::RepoError;
use crate::domain::sites::{SiteSummary, UserId};
use crate::presentation::directory::{
    DirectoryHooks, DirectoryView, NONCE_ACTION, TemplateParts, ViewerView,
    render_blogs_directory,
};
use crate::presentation::l10n::Localizer;
use crate::presentation::nonce::NonceIssuer;

const SOURCE: &str = "application::directory::BlogsDirectoryService";

/// Where directory data comes from.
#[async_trait]
pub trait SiteDirectorySource: Send + Sync {
    async fn total_site_count(&self) -> Result<u64, RepoError>;

    async fn site_count_for_user(&self, user: UserId) -> Result<u64, RepoError>;

    fn directory_permalink(&self) -> String;

    fn user_sites_link(&self, user: UserId) -> String;

    async fn list_sites(&self) -> Result<Vec<SiteSummary>, RepoError>;
}

/// One directory request.
#[derive(Debug, Clone, Default)]
pub struct DirectoryRequest {
    pub viewer: Option<UserId>,
    pub referer: String,
    pub search_terms: Option<String>,
}

#[derive(Clone)]
pub struct BlogsDirectoryService {
    source: Arc<dyn SiteDirectorySource>,
    hooks: Arc<DirectoryHooks>,
    parts: Arc<dyn TemplateParts>,
    localizer: Arc<dyn Localizer>,
    nonces: NonceIssuer,
}

impl BlogsDirectoryService {
    pub fn new(
        source: Arc<dyn SiteDirectorySource>,
        hooks: Arc<DirectoryHooks>,
        parts: Arc<dyn TemplateParts>,
        localizer: Arc<dyn Localizer>,
        nonces: NonceIssuer,
    ) -> Self {
        Self {
            source,
            hooks,
            parts,
            localizer,
            nonces,
        }
    }

    pub fn hooks(&self) -> &Arc<DirectoryHooks> {
        &self.hooks
    }

    pub async fn directory_view(
        &self,
        request: &DirectoryRequest,
    ) -> Result<DirectoryView, AppError> {
        let total_sites = self
            .source
            .total_site_count()
            .await
            .map_err(|err| repo_failure("total_site_count", err))?;

        let viewer = match request.viewer {
            Some(user) => {
                let site_count = self
                    .source
                    .site_count_for_user(user)
                    .await
                    .map_err(|err| repo_failure("site_count_for_user", err))?;
                Some(ViewerView {
                    user_id: user,
                    site_count,
                    sites_link: self.source.user_sites_link(user),
                })
            }
            None => None,
        };

        let sites = self
            .source
            .list_sites()
            .await
            .map_err(|err| repo_failure("list_sites", err))?;

        Ok(DirectoryView {
            total_sites,
            directory_permalink: self.source.directory_permalink(),
            viewer,
            nonce: self.nonces.create(NONCE_ACTION, request.viewer),
            referer: request.referer.clone(),
            search_terms: request.search_terms.clone(),
            sites,
        })
    }

    pub async fn render(&self, request: &DirectoryRequest) -> Result<String, AppError> {
        let view = self.directory_view(request).await?;
        debug!(
            target = SOURCE,
            total_sites = view.total_sites,
            listed = view.sites.len(),
            signed_in = view.viewer.is_some(),
            "rendering sites directory"
        );
        render_blogs_directory(&view, &self.hooks, self.parts.as_ref(), self.localizer.as_ref())
            .map_err(AppError::from)
    }
}

fn repo_failure(operation: &'static str, err: RepoError) -> AppError {
    AppError::repo(SOURCE, operation, err)
}
