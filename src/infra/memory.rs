//! In-process option storage.
//!
//! Backs the binary when no database is configured and every test that does
//! not need Postgres. Both stores share one type so a single handle can be
//! passed as the site and the network adapter.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::application::repos::{NetworkOptionStore, RepoError, SiteOptionStore};
use crate::domain::options::{OptionTable, OptionValue};
use crate::domain::sites::{NetworkId, SiteId};
use crate::util::sync::{read_lock, write_lock};

const SOURCE: &str = "infra::memory";

type Scoped = HashMap<u64, OptionTable>;

#[derive(Default)]
pub struct MemoryOptionStore {
    sites: RwLock<Scoped>,
    networks: RwLock<Scoped>,
}

impl MemoryOptionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a site value directly, bypassing add/update semantics.
    pub fn with_site_option(self, site: SiteId, name: &str, value: impl Into<OptionValue>) -> Self {
        write_lock(&self.sites, SOURCE, "with_site_option")
            .entry(site.0)
            .or_default()
            .insert(name.to_string(), value.into());
        self
    }

    pub fn with_network_option(
        self,
        network: NetworkId,
        name: &str,
        value: impl Into<OptionValue>,
    ) -> Self {
        write_lock(&self.networks, SOURCE, "with_network_option")
            .entry(network.0)
            .or_default()
            .insert(name.to_string(), value.into());
        self
    }

    /// Everything stored for `site`.
    pub fn site_snapshot(&self, site: SiteId) -> OptionTable {
        read_lock(&self.sites, SOURCE, "site_snapshot")
            .get(&site.0)
            .cloned()
            .unwrap_or_default()
    }
}

fn add(map: &RwLock<Scoped>, scope: u64, name: &str, value: &OptionValue) -> bool {
    let mut guard = write_lock(map, SOURCE, "add");
    let table = guard.entry(scope).or_default();
    if table.contains_key(name) {
        return false;
    }
    table.insert(name.to_string(), value.clone());
    true
}

fn get(map: &RwLock<Scoped>, scope: u64, name: &str) -> Option<OptionValue> {
    read_lock(map, SOURCE, "get")
        .get(&scope)
        .and_then(|table| table.get(name).cloned())
}

fn update(map: &RwLock<Scoped>, scope: u64, name: &str, value: &OptionValue) -> bool {
    let mut guard = write_lock(map, SOURCE, "update");
    let table = guard.entry(scope).or_default();
    if table.get(name) == Some(value) {
        return false;
    }
    table.insert(name.to_string(), value.clone());
    true
}

fn delete(map: &RwLock<Scoped>, scope: u64, name: &str) -> bool {
    write_lock(map, SOURCE, "delete")
        .get_mut(&scope)
        .is_some_and(|table| table.remove(name).is_some())
}

fn get_many(map: &RwLock<Scoped>, scope: u64, names: &[String]) -> OptionTable {
    let guard = read_lock(map, SOURCE, "get_many");
    let Some(table) = guard.get(&scope) else {
        return OptionTable::new();
    };
    names
        .iter()
        .filter_map(|name| table.get(name).map(|value| (name.clone(), value.clone())))
        .collect()
}

#[async_trait]
impl SiteOptionStore for MemoryOptionStore {
    async fn add(&self, site: SiteId, name: &str, value: &OptionValue) -> Result<bool, RepoError> {
        Ok(add(&self.sites, site.0, name, value))
    }

    async fn get(&self, site: SiteId, name: &str) -> Result<Option<OptionValue>, RepoError> {
        Ok(get(&self.sites, site.0, name))
    }

    async fn update(
        &self,
        site: SiteId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError> {
        Ok(update(&self.sites, site.0, name, value))
    }

    async fn delete(&self, site: SiteId, name: &str) -> Result<bool, RepoError> {
        Ok(delete(&self.sites, site.0, name))
    }

    async fn get_many(&self, site: SiteId, names: &[String]) -> Result<OptionTable, RepoError> {
        Ok(get_many(&self.sites, site.0, names))
    }
}

#[async_trait]
impl NetworkOptionStore for MemoryOptionStore {
    async fn add(
        &self,
        network: NetworkId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError> {
        Ok(add(&self.networks, network.0, name, value))
    }

    async fn get(
        &self,
        network: NetworkId,
        name: &str,
    ) -> Result<Option<OptionValue>, RepoError> {
        Ok(get(&self.networks, network.0, name))
    }

    async fn update(
        &self,
        network: NetworkId,
        name: &str,
        value: &OptionValue,
    ) -> Result<bool, RepoError> {
        Ok(update(&self.networks, network.0, name, value))
    }

    async fn delete(&self, network: NetworkId, name: &str) -> Result<bool, RepoError> {
        Ok(delete(&self.networks, network.0, name))
    }

    async fn get_many(
        &self,
        network: NetworkId,
        names: &[String],
    ) -> Result<OptionTable, RepoError> {
        Ok(get_many(&self.networks, network.0, names))
    }
}
