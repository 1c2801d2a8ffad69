//! The owning context: registry, weather lookup, persistence and
//! notifications wired together.
//!
//! Every mutation happens under the registry lock, and the snapshot written to
//! storage is taken under that same lock, so storage never lags behind a
//! separately tracked copy of the widget list.

use std::sync::Arc;

use parking_lot::Mutex;
use skydeck_core::StorageError;
use skydeck_weather::{WeatherLookup, WeatherReading};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::notify::{Notifier, NOT_FOUND_MESSAGE};
use crate::persistence::WidgetStorage;
use crate::registry::{RegistrySnapshot, RequestTicket, UpdateOutcome, WidgetRegistry};
use crate::store::KeyValueStore;
use crate::widget::{WidgetId, WidgetSlot, WidgetView};

/// Result of one lookup round-trip for a slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Reading bound to the slot and persisted
    Applied,
    /// Nothing to look up: slot missing or unbound
    Skipped,
    /// Result arrived but a newer one, a reset or a delete already won
    Discarded,
    /// The weather service does not know the city; user was notified
    NotFound,
    /// Transient failure, logged; the next tick retries
    Failed,
    /// Refresh group torn down before the result could be applied
    Cancelled,
}

pub struct WidgetBoard<L> {
    inner: Arc<Shared<L>>,
}

struct Shared<L> {
    registry: Arc<Mutex<WidgetRegistry>>,
    storage: WidgetStorage,
    lookup: L,
    notifier: Arc<dyn Notifier>,
}

impl<L> Clone for WidgetBoard<L> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<L: WeatherLookup> WidgetBoard<L> {
    /// Seed `default_count` unbound widgets, then replace them with the
    /// persisted list if a valid one exists.
    pub fn open(
        default_count: usize,
        lookup: L,
        store: Arc<dyn KeyValueStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let mut registry = WidgetRegistry::initialize(default_count);
        let storage = WidgetStorage::widgets(store);

        match storage.load() {
            Some(snapshot) => match registry.load_from(snapshot) {
                Ok(count) => tracing::info!("Restored {} widgets from storage", count),
                Err(e) => tracing::warn!("Saved widgets unusable ({}); using defaults", e),
            },
            None => tracing::debug!("No saved widgets; starting with {}", registry.len()),
        }

        Self {
            inner: Arc::new(Shared {
                registry: Arc::new(Mutex::new(registry)),
                storage,
                lookup,
                notifier,
            }),
        }
    }

    pub fn views(&self) -> Vec<WidgetView> {
        self.inner.registry.lock().views()
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        self.inner.registry.lock().snapshot()
    }

    pub fn slot(&self, id: WidgetId) -> Option<WidgetSlot> {
        self.inner.registry.lock().get(id).cloned()
    }

    pub fn ids(&self) -> Vec<WidgetId> {
        self.inner.registry.lock().ids()
    }

    pub fn contains(&self, id: WidgetId) -> bool {
        self.inner.registry.lock().get(id).is_some()
    }

    pub fn overflows(&self, visible: usize) -> bool {
        self.inner.registry.lock().overflows(visible)
    }

    /// `None` when no fresh widget id is left
    pub fn add_widget(&self) -> Option<WidgetId> {
        let mut registry = self.inner.registry.lock();
        let id = registry.add_slot()?;
        self.persist(&registry);
        tracing::info!("Added widget {}", id);
        Some(id)
    }

    /// False when `id` is unknown or is the last widget
    pub fn delete_widget(&self, id: WidgetId) -> bool {
        let mut registry = self.inner.registry.lock();
        let deleted = registry.delete_slot(id);
        if deleted {
            self.persist(&registry);
            tracing::info!("Deleted widget {}", id);
        }
        deleted
    }

    pub fn reset_widget(&self, id: WidgetId) -> bool {
        let mut registry = self.inner.registry.lock();
        let reset = registry.reset_slot(id);
        if reset {
            self.persist(&registry);
        }
        reset
    }

    pub fn reset_all(&self) -> usize {
        let mut registry = self.inner.registry.lock();
        let cleared = registry.reset_all();
        if cleared > 0 {
            self.persist(&registry);
        }
        cleared
    }

    /// Bind a reading obtained elsewhere
    pub fn bind(&self, id: WidgetId, reading: WeatherReading) -> bool {
        let mut registry = self.inner.registry.lock();
        let bound = registry.bind_and_update(id, reading);
        if bound {
            self.persist(&registry);
        }
        bound
    }

    /// Forget the persisted widget list; the in-memory list is kept
    pub fn clear_storage(&self) -> Result<(), StorageError> {
        self.inner.storage.reset()
    }

    /// Look up the slot's bound city now
    pub async fn refresh(&self, id: WidgetId) -> RefreshOutcome {
        let ticket = self.inner.registry.lock().begin_request(id);
        self.run(ticket, None).await
    }

    /// Look up a city typed into the slot; the slot only changes on success
    pub async fn fetch_city(&self, id: WidgetId, city: &str) -> RefreshOutcome {
        let ticket = self.inner.registry.lock().begin_request_for(id, city);
        self.run(ticket, None).await
    }

    /// One-shot refresh of every widget, issued concurrently
    pub async fn refresh_all(&self) -> Vec<(WidgetId, RefreshOutcome)> {
        let mut set = JoinSet::new();
        for id in self.ids() {
            let board = self.clone();
            set.spawn(async move { (id, board.refresh(id).await) });
        }

        let mut outcomes = Vec::new();
        while let Some(joined) = set.join_next().await {
            match joined {
                Ok(outcome) => outcomes.push(outcome),
                Err(e) => tracing::error!("Widget refresh task failed: {}", e),
            }
        }
        outcomes.sort_by_key(|(id, _)| *id);
        outcomes
    }

    /// Timer-driven refresh; results arriving after `token` is cancelled are dropped
    pub(crate) async fn refresh_guarded(
        &self,
        id: WidgetId,
        token: &CancellationToken,
    ) -> RefreshOutcome {
        if token.is_cancelled() {
            return RefreshOutcome::Cancelled;
        }
        let ticket = self.inner.registry.lock().begin_request(id);
        self.run(ticket, Some(token)).await
    }

    pub(crate) fn registry_handle(&self) -> Arc<Mutex<WidgetRegistry>> {
        Arc::clone(&self.inner.registry)
    }

    async fn run(
        &self,
        ticket: Option<RequestTicket>,
        guard: Option<&CancellationToken>,
    ) -> RefreshOutcome {
        let Some(ticket) = ticket else {
            return RefreshOutcome::Skipped;
        };

        let result = match guard {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => return RefreshOutcome::Cancelled,
                    result = self.inner.lookup.fetch(&ticket.city) => result,
                }
            }
            None => self.inner.lookup.fetch(&ticket.city).await,
        };

        let cancelled = || guard.is_some_and(CancellationToken::is_cancelled);

        match result {
            Ok(reading) => {
                let mut registry = self.inner.registry.lock();
                // Checked under the lock that teardown also takes
                if cancelled() {
                    tracing::debug!("Dropping late result for widget {}", ticket.id);
                    return RefreshOutcome::Cancelled;
                }
                match registry.complete_request(&ticket, reading) {
                    UpdateOutcome::Applied => {
                        self.persist(&registry);
                        RefreshOutcome::Applied
                    }
                    UpdateOutcome::Superseded | UpdateOutcome::Missing => {
                        RefreshOutcome::Discarded
                    }
                }
            }
            Err(e) if e.is_not_found() => {
                let _registry = self.inner.registry.lock();
                if cancelled() {
                    return RefreshOutcome::Cancelled;
                }
                tracing::info!("No weather for {:?} (widget {})", ticket.city, ticket.id);
                self.inner.notifier.notify(NOT_FOUND_MESSAGE);
                RefreshOutcome::NotFound
            }
            Err(e) => {
                tracing::warn!(
                    "Weather lookup for {:?} (widget {}) failed: {}",
                    ticket.city,
                    ticket.id,
                    e
                );
                RefreshOutcome::Failed
            }
        }
    }

    fn persist(&self, registry: &WidgetRegistry) {
        if let Err(e) = self.inner.storage.save(&registry.snapshot()) {
            tracing::warn!("Failed to save widgets: {}", e);
        }
    }
}
