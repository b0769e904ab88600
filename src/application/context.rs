//! Request-scoped community state.
//!
//! Built by the request-handling layer and handed to the option service and
//! the directory renderer, so neither reaches for process-wide globals.

use std::sync::{Arc, RwLock};

use crate::domain::options::{OptionName, OptionTable, OptionValue};
use crate::domain::sites::{NetworkId, SiteId};
use crate::util::sync::{read_lock, write_lock};

const SOURCE: &str = "application::context";

/// How the host is deployed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    Single {
        root_site: SiteId,
    },
    Multisite {
        root_site: SiteId,
        current_site: SiteId,
        network: NetworkId,
        /// Each site keeps its own community settings.
        multiblog: bool,
    },
}

impl Default for Deployment {
    fn default() -> Self {
        Deployment::Single {
            root_site: SiteId::ROOT,
        }
    }
}

impl Deployment {
    /// The site holding installation-wide settings.
    pub fn root_site(&self) -> SiteId {
        match self {
            Deployment::Single { root_site } | Deployment::Multisite { root_site, .. } => {
                *root_site
            }
        }
    }

    pub fn current_site(&self) -> SiteId {
        match self {
            Deployment::Single { root_site } => *root_site,
            Deployment::Multisite { current_site, .. } => *current_site,
        }
    }

    pub fn network(&self) -> Option<NetworkId> {
        match self {
            Deployment::Single { .. } => None,
            Deployment::Multisite { network, .. } => Some(*network),
        }
    }

    pub fn is_multisite(&self) -> bool {
        matches!(self, Deployment::Multisite { .. })
    }

    pub fn is_multiblog(&self) -> bool {
        matches!(
            self,
            Deployment::Multisite {
                multiblog: true,
                ..
            }
        )
    }

    /// Site whose settings table feeds the root options batch read.
    pub fn root_options_site(&self) -> SiteId {
        if self.is_multiblog() {
            self.current_site()
        } else {
            self.root_site()
        }
    }
}

pub struct CommunityContext {
    deployment: Deployment,
    overrides: RwLock<OptionTable>,
    site_options: RwLock<Option<OptionTable>>,
}

impl CommunityContext {
    pub fn new(deployment: Deployment) -> Self {
        Self {
            deployment,
            overrides: RwLock::new(OptionTable::new()),
            site_options: RwLock::new(None),
        }
    }

    pub fn shared(deployment: Deployment) -> Arc<Self> {
        Arc::new(Self::new(deployment))
    }

    pub fn deployment(&self) -> &Deployment {
        &self.deployment
    }

    /// Preset a value that shadows storage once option filters are installed.
    pub fn set_override(&self, name: impl Into<OptionName>, value: OptionValue) {
        let name = name.into();
        write_lock(&self.overrides, SOURCE, "set_override").insert(name.to_string(), value);
    }

    pub fn clear_override(&self, name: impl Into<OptionName>) -> Option<OptionValue> {
        let name = name.into();
        write_lock(&self.overrides, SOURCE, "clear_override").remove(name.as_str())
    }

    pub fn override_value(&self, name: &str) -> Option<OptionValue> {
        read_lock(&self.overrides, SOURCE, "override_value")
            .get(name)
            .cloned()
    }

    pub(crate) fn has_site_options(&self) -> bool {
        read_lock(&self.site_options, SOURCE, "has_site_options").is_some()
    }

    pub(crate) fn site_option(&self, name: &str) -> Option<OptionValue> {
        read_lock(&self.site_options, SOURCE, "site_option")
            .as_ref()
            .and_then(|table| table.get(name).cloned())
    }

    pub(crate) fn site_options(&self) -> Option<OptionTable> {
        read_lock(&self.site_options, SOURCE, "site_options").clone()
    }

    pub(crate) fn store_site_options(&self, table: OptionTable) {
        *write_lock(&self.site_options, SOURCE, "store_site_options") = Some(table);
    }

    pub(crate) fn forget_site_options(&self) {
        *write_lock(&self.site_options, SOURCE, "forget_site_options") = None;
    }
}

impl Default for CommunityContext {
    fn default() -> Self {
        Self::new(Deployment::default())
    }
}
