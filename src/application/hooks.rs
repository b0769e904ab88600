//! Named extension slots.
//!
//! Filters transform a value: callbacks run in ascending priority (ties in
//! registration order) and each receives the previous callback's output.
//! Actions are payload-less notifications broadcast to every listener.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::domain::options::{OptionTable, OptionValue};
use crate::util::sync::{read_lock, write_lock};

const SOURCE: &str = "application::hooks";

pub const DEFAULT_PRIORITY: i32 = 10;

/// What a filter callback knows about the slot it runs in.
#[derive(Debug, Clone, Copy)]
pub struct FilterContext<'a> {
    /// Name of the slot being applied.
    pub hook: &'a str,
    /// Extra arguments passed alongside the value.
    pub args: &'a [OptionValue],
}

pub type FilterCallback<T> = Arc<dyn Fn(T, &FilterContext<'_>) -> T + Send + Sync>;
pub type ActionCallback = Arc<dyn Fn() + Send + Sync>;

pub(crate) struct Registration<C> {
    pub(crate) id: Option<String>,
    pub(crate) priority: i32,
    pub(crate) callback: C,
}

type Slots<C> = HashMap<String, Vec<Registration<C>>>;

pub(crate) fn insert_ordered<C>(list: &mut Vec<Registration<C>>, registration: Registration<C>) {
    let position = list.partition_point(|existing| existing.priority <= registration.priority);
    list.insert(position, registration);
}

pub struct FilterRegistry<T> {
    slots: RwLock<Slots<FilterCallback<T>>>,
}

impl<T> Default for FilterRegistry<T> {
    fn default() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
        }
    }
}

impl<T> FilterRegistry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, hook: impl Into<String>, priority: i32, callback: F)
    where
        F: Fn(T, &FilterContext<'_>) -> T + Send + Sync + 'static,
    {
        self.register(hook.into(), None, priority, Arc::new(callback));
    }

    /// Register `callback` under `id` unless that id is already present on
    /// `hook`. Returns whether a registration happened.
    pub fn add_unique<F>(
        &self,
        hook: impl Into<String>,
        id: &str,
        priority: i32,
        callback: F,
    ) -> bool
    where
        F: Fn(T, &FilterContext<'_>) -> T + Send + Sync + 'static,
    {
        let hook = hook.into();
        let exists = read_lock(&self.slots, SOURCE, "filter.add_unique")
            .get(&hook)
            .is_some_and(|list| list.iter().any(|entry| entry.id.as_deref() == Some(id)));
        if exists {
            return false;
        }
        self.register(hook, Some(id.to_string()), priority, Arc::new(callback));
        true
    }

    fn register(
        &self,
        hook: String,
        id: Option<String>,
        priority: i32,
        callback: FilterCallback<T>,
    ) {
        trace!(hook = %hook, priority, id = id.as_deref(), "filter registered");
        let mut slots = write_lock(&self.slots, SOURCE, "filter.register");
        insert_ordered(
            slots.entry(hook).or_default(),
            Registration {
                id,
                priority,
                callback,
            },
        );
    }

    /// Whether any callback is registered for `hook`.
    pub fn has(&self, hook: &str) -> bool {
        read_lock(&self.slots, SOURCE, "filter.has")
            .get(hook)
            .is_some_and(|list| !list.is_empty())
    }

    pub fn len(&self, hook: &str) -> usize {
        read_lock(&self.slots, SOURCE, "filter.len")
            .get(hook)
            .map_or(0, Vec::len)
    }

    /// Drop every callback registered for `hook`, returning how many there were.
    pub fn remove_all(&self, hook: &str) -> usize {
        write_lock(&self.slots, SOURCE, "filter.remove_all")
            .remove(hook)
            .map_or(0, |list| list.len())
    }

    pub fn apply(&self, hook: &str, value: T, args: &[OptionValue]) -> T {
        // Callbacks may re-enter the registry, so the lock is released first.
        let callbacks: Vec<FilterCallback<T>> = read_lock(&self.slots, SOURCE, "filter.apply")
            .get(hook)
            .map(|list| list.iter().map(|entry| Arc::clone(&entry.callback)).collect())
            .unwrap_or_default();

        let context = FilterContext { hook, args };
        callbacks
            .iter()
            .fold(value, |current, callback| callback(current, &context))
    }
}

#[derive(Default)]
pub struct ActionRegistry {
    slots: RwLock<Slots<ActionCallback>>,
    fired: RwLock<HashMap<String, usize>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<F>(&self, hook: impl Into<String>, priority: i32, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let hook = hook.into();
        trace!(hook = %hook, priority, "action registered");
        let callback: ActionCallback = Arc::new(callback);
        let mut slots = write_lock(&self.slots, SOURCE, "action.add");
        insert_ordered(
            slots.entry(hook).or_default(),
            Registration {
                id: None,
                priority,
                callback,
            },
        );
    }

    pub fn has(&self, hook: &str) -> bool {
        read_lock(&self.slots, SOURCE, "action.has")
            .get(hook)
            .is_some_and(|list| !list.is_empty())
    }

    pub fn fire(&self, hook: &str) {
        *write_lock(&self.fired, SOURCE, "action.fire.count")
            .entry(hook.to_string())
            .or_default() += 1;

        let listeners: Vec<ActionCallback> = read_lock(&self.slots, SOURCE, "action.fire")
            .get(hook)
            .map(|list| list.iter().map(|entry| Arc::clone(&entry.callback)).collect())
            .unwrap_or_default();

        trace!(hook, listeners = listeners.len(), "action fired");
        for listener in listeners {
            listener();
        }
    }

    /// How many times `hook` has fired.
    pub fn count(&self, hook: &str) -> usize {
        read_lock(&self.fired, SOURCE, "action.count")
            .get(hook)
            .copied()
            .unwrap_or(0)
    }
}

/// Every extension slot used by the options layer.
#[derive(Default)]
pub struct Hooks {
    /// Single-value filters (`bp_get_option`, per-flag filters).
    pub values: FilterRegistry<OptionValue>,
    /// Read interception (`pre_option_<name>`); `Some` short-circuits storage.
    pub pre_option: FilterRegistry<Option<OptionValue>>,
    /// Whole-table filters (`bp_get_default_options`, `bp_core_get_root_options`).
    pub tables: FilterRegistry<OptionTable>,
    pub actions: ActionRegistry,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}
