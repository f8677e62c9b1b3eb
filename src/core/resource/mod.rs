//! Resource Loaders
//!
//! One [`ResourceHook`] owns the loading/error/data state of one resource
//! list (environments, campaigns, sessions). Loads run as spawned tasks that
//! report back over a channel; the owner commits them by calling
//! [`ResourceHook::poll`] from its tick, the same way the views poll their
//! async data.
//!
//! Guarantees:
//! - the initial load fires once per hook, however often `mount` is called
//! - search edits are debounced; a newer edit cancels the pending reload
//! - only the most recently issued load may commit; older completions are
//!   dropped when they arrive
//! - after `teardown` (or drop) no state is written, even if loads that were
//!   already in flight complete later

pub mod clock;
pub mod debounce;
pub mod scope;

#[cfg(test)]
mod tests;

use std::fmt::Debug;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::core::gateway::{Gateway, Operation};

pub use clock::{Clock, ManualClock, SystemClock};
pub use debounce::Debouncer;
pub use scope::Scope;

// ============================================================================
// State
// ============================================================================

/// Where a loader is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadPhase {
    #[default]
    Idle,
    Loading,
    Loaded,
    Errored,
}

/// Observable state of a resource list.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceState<T> {
    pub items: Vec<T>,
    pub phase: LoadPhase,
    /// A non-search load (initial, retry, key change) is in flight.
    pub is_loading: bool,
    /// A debounced search reload is in flight.
    pub is_searching: bool,
    pub error: Option<String>,
    pub search_query: String,
    /// Items are the configured fallback set, not backend data.
    pub is_using_defaults: bool,
}

impl<T> Default for ResourceState<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            phase: LoadPhase::Idle,
            is_loading: false,
            is_searching: false,
            error: None,
            search_query: String::new(),
            is_using_defaults: false,
        }
    }
}

// ============================================================================
// Source
// ============================================================================

/// Describes how one resource type is fetched and decoded.
pub trait ResourceSource: Send + Sync + 'static {
    type Item: Clone + Send + 'static;
    /// Dependent key the list is scoped by (`()` when there is none).
    type Key: Clone + PartialEq + Debug + Send + Sync + 'static;

    fn name(&self) -> &'static str;

    fn operation(&self) -> Operation;

    fn payload(&self, query: &str, key: &Self::Key) -> Option<Value>;

    fn parse(&self, data: Value) -> Result<Vec<Self::Item>, String>;

    /// Fallback list for failed or empty loads. `None` means an empty
    /// success really is empty.
    fn defaults(&self) -> Option<Vec<Self::Item>> {
        None
    }
}

/// Decode a list that arrives either as a bare array or under `field`.
pub fn extract_list<T: DeserializeOwned>(data: Value, field: &str) -> Result<Vec<T>, String> {
    let list = match data {
        Value::Array(items) => Value::Array(items),
        Value::Object(mut map) => match map.remove(field) {
            Some(Value::Null) | None => return Ok(Vec::new()),
            Some(list) => list,
        },
        Value::Null => return Ok(Vec::new()),
        other => {
            return Err(format!(
                "Unexpected response shape: expected '{field}' list, got {other}"
            ))
        }
    };
    serde_json::from_value(list).map_err(|e| format!("Invalid '{field}' list: {e}"))
}

// ============================================================================
// Hook
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadKind {
    Initial,
    Search,
    Reload,
}

struct Completion<T> {
    generation: u64,
    outcome: Result<Vec<T>, String>,
}

pub struct ResourceHook<S: ResourceSource> {
    source: Arc<S>,
    gateway: Arc<dyn Gateway>,
    clock: Arc<dyn Clock>,
    key: S::Key,
    state: ResourceState<S::Item>,
    debouncer: Debouncer<String>,
    scope: Scope,
    mounted: bool,
    /// Generation of the most recently issued load.
    generation: u64,
    /// Generation still awaiting its completion.
    awaiting: Option<u64>,
    /// Number of state writes so far.
    revision: u64,
    done_tx: mpsc::UnboundedSender<Completion<S::Item>>,
    done_rx: mpsc::UnboundedReceiver<Completion<S::Item>>,
}

impl<S: ResourceSource> ResourceHook<S> {
    pub fn new(
        source: S,
        gateway: Arc<dyn Gateway>,
        clock: Arc<dyn Clock>,
        key: S::Key,
        search_debounce: Duration,
    ) -> Self {
        let (done_tx, done_rx) = mpsc::unbounded_channel();
        Self {
            source: Arc::new(source),
            gateway,
            clock,
            key,
            state: ResourceState::default(),
            debouncer: Debouncer::new(search_debounce),
            scope: Scope::new(),
            mounted: false,
            generation: 0,
            awaiting: None,
            revision: 0,
            done_tx,
            done_rx,
        }
    }

    pub fn state(&self) -> &ResourceState<S::Item> {
        &self.state
    }

    pub fn items(&self) -> &[S::Item] {
        &self.state.items
    }

    pub fn key(&self) -> &S::Key {
        &self.key
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn is_alive(&self) -> bool {
        self.scope.is_alive()
    }

    pub fn has_load_in_flight(&self) -> bool {
        self.awaiting.is_some()
    }

    /// A load is in flight or a debounced reload is pending.
    pub fn is_busy(&self) -> bool {
        self.is_alive() && (self.awaiting.is_some() || self.debouncer.is_pending())
    }

    /// Fire the initial load. Only the first call on a live hook does
    /// anything; returns whether a load was issued.
    pub fn mount(&mut self) -> bool {
        if self.mounted || !self.is_alive() {
            return false;
        }
        self.mounted = true;
        let query = self.state.search_query.clone();
        self.dispatch(LoadKind::Initial, query);
        true
    }

    /// Update the search query. A non-empty query reloads after the debounce
    /// window; clearing the query reloads right away.
    pub fn set_search_query(&mut self, query: impl Into<String>) {
        if !self.is_alive() {
            return;
        }
        let query = query.into();
        if query == self.state.search_query {
            return;
        }
        self.state.search_query = query.clone();
        self.revision += 1;

        if !self.mounted {
            return;
        }
        if query.is_empty() {
            self.debouncer.cancel();
            self.dispatch(LoadKind::Reload, query);
        } else {
            debug!(resource = self.source.name(), %query, "search reload scheduled");
            self.debouncer.schedule(self.clock.now(), query);
        }
    }

    /// Change the dependent key. Resets the search query and reloads
    /// immediately with the new key.
    pub fn set_key(&mut self, key: S::Key) {
        if !self.is_alive() || key == self.key {
            return;
        }
        debug!(resource = self.source.name(), ?key, "dependent key changed");
        self.key = key;
        self.debouncer.cancel();
        self.state.search_query.clear();
        self.revision += 1;

        if self.mounted {
            self.dispatch(LoadKind::Reload, String::new());
        }
    }

    /// Re-issue the load with the current query and key.
    pub fn retry(&mut self) {
        if !self.is_alive() {
            return;
        }
        self.mounted = true;
        self.debouncer.cancel();
        let query = self.state.search_query.clone();
        self.dispatch(LoadKind::Reload, query);
    }

    /// Fire a due debounced reload and commit finished loads. Returns whether
    /// state changed.
    pub fn poll(&mut self) -> bool {
        if !self.is_alive() {
            return false;
        }
        let mut changed = false;

        if let Some(query) = self.debouncer.poll(self.clock.now()) {
            self.dispatch(LoadKind::Search, query);
            changed = true;
        }

        while let Ok(completion) = self.done_rx.try_recv() {
            if completion.generation != self.generation {
                debug!(
                    resource = self.source.name(),
                    generation = completion.generation,
                    latest = self.generation,
                    "dropping superseded load"
                );
                continue;
            }
            self.commit(completion.outcome);
            changed = true;
        }

        changed
    }

    /// Poll until nothing is in flight or pending.
    pub async fn settle(&mut self, interval: Duration) {
        loop {
            self.poll();
            if !self.is_busy() {
                return;
            }
            tokio::time::sleep(interval).await;
        }
    }

    /// Stop all state writes. In-flight loads finish but are discarded.
    pub fn teardown(&mut self) {
        if self.is_alive() {
            debug!(resource = self.source.name(), "loader torn down");
        }
        self.scope.close();
        self.debouncer.cancel();
    }

    fn dispatch(&mut self, kind: LoadKind, query: String) {
        self.generation += 1;
        let generation = self.generation;
        self.awaiting = Some(generation);

        match kind {
            LoadKind::Search => self.state.is_searching = true,
            LoadKind::Initial | LoadKind::Reload => {
                self.state.is_loading = true;
                self.state.phase = LoadPhase::Loading;
            }
        }
        self.revision += 1;

        let operation = self.source.operation();
        let payload = self.source.payload(&query, &self.key);
        debug!(
            resource = self.source.name(),
            %operation,
            ?kind,
            generation,
            "dispatching load"
        );

        let gateway = self.gateway.clone();
        let source = self.source.clone();
        let scope = self.scope.clone();
        let tx = self.done_tx.clone();

        tokio::spawn(async move {
            let result = gateway.call(operation, payload).await;
            if !scope.is_alive() {
                debug!(resource = source.name(), generation, "load finished after teardown");
                return;
            }
            let outcome = result.into_result().and_then(|data| source.parse(data));
            let _ = tx.send(Completion {
                generation,
                outcome,
            });
        });
    }

    fn commit(&mut self, outcome: Result<Vec<S::Item>, String>) {
        self.awaiting = None;
        self.state.is_loading = false;
        self.state.is_searching = false;

        match outcome {
            Ok(items) if !items.is_empty() => {
                self.state.items = items;
                self.state.error = None;
                self.state.is_using_defaults = false;
                self.state.phase = LoadPhase::Loaded;
            }
            Ok(_) => {
                self.fill_fallback();
                self.state.error = None;
                self.state.phase = LoadPhase::Loaded;
            }
            Err(error) => {
                warn!(resource = self.source.name(), %error, "load failed");
                self.fill_fallback();
                self.state.error = Some(error);
                self.state.phase = LoadPhase::Errored;
            }
        }
        self.revision += 1;
    }

    fn fill_fallback(&mut self) {
        match self.source.defaults() {
            Some(defaults) => {
                self.state.items = defaults;
                self.state.is_using_defaults = true;
            }
            None => {
                self.state.items.clear();
                self.state.is_using_defaults = false;
            }
        }
    }
}

impl<S: ResourceSource> Drop for ResourceHook<S> {
    fn drop(&mut self) {
        self.scope.close();
    }
}
