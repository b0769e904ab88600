//! Root options: the installation-wide settings resolved in one batch per
//! request and cached under `bp` / `root_blog_options`.

use tracing::{debug, warn};

use super::{OptionService, TARGET};
use crate::domain::options::{OptionTable, OptionValue};

pub const CACHE_NAMESPACE: &str = "bp";
pub const ROOT_OPTIONS_CACHE_KEY: &str = "root_blog_options";
pub const ROOT_OPTIONS_FILTER: &str = "bp_core_get_root_options";
pub const NETWORK_OPTIONS_FILTER: &str = "bp_core_network_options";

/// Host settings resolved alongside the community defaults.
pub fn platform_option_defaults() -> OptionTable {
    OptionTable::from([
        ("registration".to_string(), OptionValue::from("0")),
        ("avatar_default".to_string(), OptionValue::from("mysteryman")),
    ])
}

/// Keys always read from network storage in multi-site deployments.
pub fn network_option_defaults() -> OptionTable {
    OptionTable::from([
        ("tags_blog_id".to_string(), OptionValue::from("0")),
        ("sitewide_tags_blog".to_string(), OptionValue::empty_text()),
        ("registration".to_string(), OptionValue::from("0")),
        ("fileupload_maxk".to_string(), OptionValue::from("1500")),
    ])
}

impl OptionService {
    /// Defaults plus platform keys, then stored site values, then stored
    /// network values; later sources win.
    pub async fn root_options(&self) -> OptionTable {
        let resolved = match self.cache.get(CACHE_NAMESPACE, ROOT_OPTIONS_CACHE_KEY) {
            Some(cached) => cached,
            None => {
                let resolved = self.load_root_options().await;
                self.cache
                    .set(CACHE_NAMESPACE, ROOT_OPTIONS_CACHE_KEY, resolved.clone());
                resolved
            }
        };

        self.hooks.tables.apply(ROOT_OPTIONS_FILTER, resolved, &[])
    }

    async fn load_root_options(&self) -> OptionTable {
        let deployment = *self.context.deployment();

        let mut resolved = self.default_options();
        resolved.extend(platform_option_defaults());
        let keys: Vec<String> = resolved.keys().cloned().collect();

        let site = deployment.root_options_site();
        match self.sites.get_many(site, &keys).await {
            Ok(stored) => {
                debug!(target = TARGET, site = %site, found = stored.len(), "root options loaded");
                resolved.extend(stored);
            }
            Err(err) => warn!(
                target = TARGET,
                site = %site,
                error = %err,
                "root options batch read failed; using defaults"
            ),
        }

        if let Some(network) = deployment.network() {
            let network_keys: Vec<String> = self
                .hooks
                .tables
                .apply(NETWORK_OPTIONS_FILTER, network_option_defaults(), &[])
                .into_keys()
                .collect();

            // Merged second so the network's `registration` wins.
            match self.network.get_many(network, &network_keys).await {
                Ok(stored) => {
                    debug!(
                        target = TARGET,
                        network = %network,
                        found = stored.len(),
                        "network options loaded"
                    );
                    resolved.extend(stored);
                }
                Err(err) => warn!(
                    target = TARGET,
                    network = %network,
                    error = %err,
                    "network options batch read failed"
                ),
            }
        }

        resolved
    }

    /// One root option; resolves the whole set on first use in this request.
    /// Unknown keys yield the empty string.
    pub async fn root_option(&self, name: &str) -> OptionValue {
        if !self.context.has_site_options() {
            let table = self.root_options().await;
            self.context.store_site_options(table);
        }

        self.context
            .site_option(name)
            .unwrap_or_else(OptionValue::empty_text)
    }

    /// Fill every key whose resolved root value is empty from storage,
    /// falling back to the default given for it, and persist the result.
    ///
    /// Returns `true` only when every write changed storage; an empty `keys`
    /// table returns `false`.
    pub async fn activate_site_options(&self, keys: &OptionTable) -> bool {
        if keys.is_empty() {
            return false;
        }

        // Writes to root keys drop the memo, so work on a copy and put it back.
        let mut resolved = match self.context.site_options() {
            Some(table) => table,
            None => self.root_options().await,
        };

        let mut filled = 0_usize;
        let mut failed = 0_usize;
        for (name, default) in keys {
            if resolved.get(name).is_some_and(|value| !value.is_empty()) {
                continue;
            }
            let value = self.get_option_or(name.as_str(), default.clone()).await;
            if !self.update_option(name.as_str(), value.clone()).await {
                failed += 1;
            }
            resolved.insert(name.clone(), value);
            filled += 1;
        }
        self.context.store_site_options(resolved);

        debug!(target = TARGET, filled, failed, "site options activated");
        failed == 0
    }

    pub fn clear_root_options_cache(&self) {
        if self.cache.delete(CACHE_NAMESPACE, ROOT_OPTIONS_CACHE_KEY) {
            debug!(target = TARGET, "root options cache cleared");
        }
        self.context.forget_site_options();
    }

    pub(super) fn is_root_option(&self, name: &str) -> bool {
        if platform_option_defaults().contains_key(name) {
            return true;
        }
        if self.context.deployment().is_multisite() && network_option_defaults().contains_key(name)
        {
            return true;
        }
        self.default_options().contains_key(name)
    }
}
