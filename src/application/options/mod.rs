//! Option registry: installs the default option set, intercepts reads so
//! in-memory overrides win, and wraps the root site's settings storage.
//!
//! Nothing here returns an error to callers. Failed reads resolve to the
//! caller's default and failed writes report `false`; the underlying
//! [`RepoError`](crate::application::repos::RepoError) is logged.

mod flags;
mod root;

pub use flags::FeatureFlags;
pub use root::{
    CACHE_NAMESPACE, NETWORK_OPTIONS_FILTER, ROOT_OPTIONS_CACHE_KEY, ROOT_OPTIONS_FILTER,
    network_option_defaults, platform_option_defaults,
};

use std::slice;
use std::sync::Arc;

use metrics::counter;
use tracing::{debug, info, warn};

use crate::application::context::CommunityContext;
use crate::application::hooks::{DEFAULT_PRIORITY, FilterContext, Hooks};
use crate::application::repos::{NetworkOptionStore, RepoError, SiteOptionStore};
use crate::cache::ObjectCache;
use crate::domain::options::{OptionKey, OptionName, OptionTable, OptionValue};
use crate::domain::sites::SiteId;

pub const DEFAULT_OPTIONS_FILTER: &str = "bp_get_default_options";
pub const GET_OPTION_FILTER: &str = "bp_get_option";
pub const ADD_OPTIONS_ACTION: &str = "bp_add_options";
pub const DELETE_OPTIONS_ACTION: &str = "bp_delete_options";
pub const SETUP_OPTION_FILTERS_ACTION: &str = "bp_setup_option_filters";
pub const PRE_OPTION_PREFIX: &str = "pre_option_";

const PRE_GET_OPTION_ID: &str = "bp_pre_get_option";
const TARGET: &str = "application::options";

pub fn pre_option_hook(name: &str) -> String {
    format!("{PRE_OPTION_PREFIX}{name}")
}

/// Read interception installed by [`OptionService::setup_option_filters`].
///
/// The option name comes from the slot being applied. A non-empty override
/// wins; otherwise `fallback` is returned untouched.
pub fn pre_get_option(
    context: &CommunityContext,
    fallback: Option<OptionValue>,
    filter: &FilterContext<'_>,
) -> Option<OptionValue> {
    let name = filter
        .hook
        .strip_prefix(PRE_OPTION_PREFIX)
        .unwrap_or(filter.hook);

    match context.override_value(name) {
        Some(value) if !value.is_empty() => Some(value),
        _ => fallback,
    }
}

#[derive(Clone)]
pub struct OptionService {
    sites: Arc<dyn SiteOptionStore>,
    network: Arc<dyn NetworkOptionStore>,
    cache: Arc<dyn ObjectCache>,
    hooks: Arc<Hooks>,
    context: Arc<CommunityContext>,
}

impl OptionService {
    pub fn new(
        sites: Arc<dyn SiteOptionStore>,
        network: Arc<dyn NetworkOptionStore>,
        cache: Arc<dyn ObjectCache>,
        hooks: Arc<Hooks>,
        context: Arc<CommunityContext>,
    ) -> Self {
        Self {
            sites,
            network,
            cache,
            hooks,
            context,
        }
    }

    pub fn hooks(&self) -> &Arc<Hooks> {
        &self.hooks
    }

    pub fn context(&self) -> &Arc<CommunityContext> {
        &self.context
    }

    fn root_site(&self) -> SiteId {
        self.context.deployment().root_site()
    }

    /// The default option set, after extensions had their chance to append.
    pub fn default_options(&self) -> OptionTable {
        self.hooks
            .tables
            .apply(DEFAULT_OPTIONS_FILTER, OptionKey::defaults(), &[])
    }

    /// Seed every default that is not already stored. Existing values stay.
    pub async fn add_options(&self) {
        let mut added = 0_usize;
        for (name, value) in self.default_options() {
            if self.add_option(name.as_str(), value).await {
                added += 1;
            }
        }
        info!(target = TARGET, added, site = %self.root_site(), "default options installed");

        self.hooks.actions.fire(ADD_OPTIONS_ACTION);
    }

    /// Remove every default option from storage.
    pub async fn delete_options(&self) {
        let mut removed = 0_usize;
        for name in self.default_options().into_keys() {
            if self.delete_option(name.as_str()).await {
                removed += 1;
            }
        }
        info!(target = TARGET, removed, site = %self.root_site(), "default options deleted");

        self.hooks.actions.fire(DELETE_OPTIONS_ACTION);
    }

    /// Route reads of every default option through the override table.
    pub fn setup_option_filters(&self) {
        let mut installed = 0_usize;
        for name in self.default_options().into_keys() {
            let context = Arc::clone(&self.context);
            let fresh = self.hooks.pre_option.add_unique(
                pre_option_hook(&name),
                PRE_GET_OPTION_ID,
                DEFAULT_PRIORITY,
                move |fallback, filter| pre_get_option(&context, fallback, filter),
            );
            if fresh {
                installed += 1;
            }
        }
        debug!(target = TARGET, installed, "option read filters installed");

        self.hooks.actions.fire(SETUP_OPTION_FILTERS_ACTION);
    }

    /// Host read path for one site: interception first, then storage, then
    /// `default`.
    pub async fn read_site_option(
        &self,
        site: SiteId,
        name: &str,
        default: OptionValue,
    ) -> OptionValue {
        let hook = pre_option_hook(name);
        let intercepted = self.hooks.pre_option.apply(&hook, None, slice::from_ref(&default));
        if let Some(value) = intercepted {
            return value;
        }

        match self.sites.get(site, name).await {
            Ok(Some(value)) => value,
            Ok(None) => default,
            Err(err) => {
                warn!(
                    target = TARGET,
                    option = name,
                    site = %site,
                    error = %err,
                    "option read failed; using default"
                );
                default
            }
        }
    }

    /// Read an option from the root site, defaulting to the empty string.
    pub async fn get_option(&self, name: impl Into<OptionName>) -> OptionValue {
        self.get_option_or(name, OptionValue::empty_text()).await
    }

    pub async fn get_option_or(
        &self,
        name: impl Into<OptionName>,
        default: impl Into<OptionValue>,
    ) -> OptionValue {
        let name = name.into();
        let value = self
            .read_site_option(self.root_site(), name.as_str(), default.into())
            .await;

        self.hooks.values.apply(
            GET_OPTION_FILTER,
            value,
            &[OptionValue::from(name.as_str())],
        )
    }

    pub async fn add_option(
        &self,
        name: impl Into<OptionName>,
        value: impl Into<OptionValue>,
    ) -> bool {
        let name = name.into();
        let site = self.root_site();
        let result = self.sites.add(site, name.as_str(), &value.into()).await;
        self.finish_write("add", &name, site, result)
    }

    pub async fn update_option(
        &self,
        name: impl Into<OptionName>,
        value: impl Into<OptionValue>,
    ) -> bool {
        let name = name.into();
        let site = self.root_site();
        let result = self.sites.update(site, name.as_str(), &value.into()).await;
        self.finish_write("update", &name, site, result)
    }

    pub async fn delete_option(&self, name: impl Into<OptionName>) -> bool {
        let name = name.into();
        let site = self.root_site();
        let result = self.sites.delete(site, name.as_str()).await;
        self.finish_write("delete", &name, site, result)
    }

    fn finish_write(
        &self,
        op: &'static str,
        name: &OptionName,
        site: SiteId,
        result: Result<bool, RepoError>,
    ) -> bool {
        match result {
            Ok(changed) => {
                let outcome = if changed { "changed" } else { "unchanged" };
                counter!("kinship_option_write_total", "op" => op, "outcome" => outcome)
                    .increment(1);
                if changed && self.is_root_option(name.as_str()) {
                    self.clear_root_options_cache();
                }
                changed
            }
            Err(err) => {
                warn!(
                    target = TARGET,
                    op,
                    option = %name,
                    site = %site,
                    error = %err,
                    "option write failed"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_get_option_prefers_non_empty_override() {
        let context = CommunityContext::default();
        context.set_override(OptionKey::DisableAccountDeletion, OptionValue::Bool(true));
        let filter = FilterContext {
            hook: "pre_option_bp-disable-account-deletion",
            args: &[],
        };

        assert_eq!(
            pre_get_option(&context, None, &filter),
            Some(OptionValue::Bool(true))
        );
    }

    #[test]
    fn pre_get_option_returns_fallback_for_empty_override() {
        let context = CommunityContext::default();
        context.set_override(OptionKey::ThemePackageId, OptionValue::empty_text());
        let filter = FilterContext {
            hook: "pre_option__bp_theme_package_id",
            args: &[],
        };

        assert_eq!(pre_get_option(&context, None, &filter), None);
        assert_eq!(
            pre_get_option(&context, Some(OptionValue::from("legacy")), &filter),
            Some(OptionValue::from("legacy"))
        );
    }
}
