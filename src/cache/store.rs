//! Namespaced object cache.
//!
//! The host keeps a per-request object cache; options are cached there under
//! a namespace and key so that resolved tables do not survive the request.

use std::collections::HashMap;
use std::sync::RwLock;

use metrics::counter;

use crate::domain::options::OptionTable;
use crate::util::sync::{read_lock, write_lock};

const SOURCE: &str = "cache::store";

/// Namespace-scoped get/set by string key.
pub trait ObjectCache: Send + Sync {
    fn get(&self, namespace: &str, key: &str) -> Option<OptionTable>;
    fn set(&self, namespace: &str, key: &str, value: OptionTable);
    fn delete(&self, namespace: &str, key: &str) -> bool;
    fn flush(&self);
}

/// Request-lifetime cache; create one per request and drop it afterwards.
#[derive(Default)]
pub struct RequestCache {
    entries: RwLock<HashMap<(String, String), OptionTable>>,
}

impl RequestCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        read_lock(&self.entries, SOURCE, "len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ObjectCache for RequestCache {
    fn get(&self, namespace: &str, key: &str) -> Option<OptionTable> {
        let found = read_lock(&self.entries, SOURCE, "get")
            .get(&(namespace.to_string(), key.to_string()))
            .cloned();

        let outcome = if found.is_some() { "hit" } else { "miss" };
        counter!(
            "kinship_object_cache_lookup_total",
            "namespace" => namespace.to_string(),
            "outcome" => outcome
        )
        .increment(1);

        found
    }

    fn set(&self, namespace: &str, key: &str, value: OptionTable) {
        write_lock(&self.entries, SOURCE, "set")
            .insert((namespace.to_string(), key.to_string()), value);
    }

    fn delete(&self, namespace: &str, key: &str) -> bool {
        write_lock(&self.entries, SOURCE, "delete")
            .remove(&(namespace.to_string(), key.to_string()))
            .is_some()
    }

    fn flush(&self) {
        write_lock(&self.entries, SOURCE, "flush").clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::options::OptionValue;

    fn table(value: &str) -> OptionTable {
        let mut table = OptionTable::new();
        table.insert("registration".to_string(), OptionValue::from(value));
        table
    }

    #[test]
    fn entries_are_scoped_by_namespace() {
        let cache = RequestCache::new();
        cache.set("bp", "root_blog_options", table("1"));

        assert_eq!(cache.get("bp", "root_blog_options"), Some(table("1")));
        assert!(cache.get("other", "root_blog_options").is_none());
    }

    #[test]
    fn delete_reports_presence() {
        let cache = RequestCache::new();
        cache.set("bp", "root_blog_options", table("0"));

        assert!(cache.delete("bp", "root_blog_options"));
        assert!(!cache.delete("bp", "root_blog_options"));
        assert!(cache.is_empty());
    }

    #[test]
    fn flush_drops_everything() {
        let cache = RequestCache::new();
        cache.set("bp", "a", table("0"));
        cache.set("bp", "b", table("1"));
        assert_eq!(cache.len(), 2);

        cache.flush();
        assert!(cache.is_empty());
    }
}
