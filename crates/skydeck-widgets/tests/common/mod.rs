//! Test doubles shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use skydeck_core::StorageError;
use skydeck_weather::{LookupError, WeatherLookup, WeatherReading};
use skydeck_widgets::{KeyValueStore, MemoryStore, Notifier};
use tokio::sync::{Notify, Semaphore};

#[derive(Debug, Clone)]
pub enum Scripted {
    Reading(WeatherReading),
    NotFound,
    Unavailable,
}

/// Lookup answering from a fixed table, optionally held at a gate
#[derive(Default)]
pub struct ScriptedLookup {
    table: Mutex<HashMap<String, Scripted>>,
    calls: Mutex<Vec<String>>,
    gate: Option<Arc<Semaphore>>,
    entered: Arc<Notify>,
    before_answer: Mutex<Option<Arc<dyn Fn() + Send + Sync>>>,
}

impl ScriptedLookup {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup waits for `release` before answering
    pub fn gated() -> Self {
        Self {
            gate: Some(Arc::new(Semaphore::new(0))),
            ..Self::default()
        }
    }

    pub fn with(self, city: &str, answer: Scripted) -> Self {
        self.table.lock().insert(city.to_string(), answer);
        self
    }

    /// Change the answer for later lookups
    pub fn script(&self, city: &str, answer: Scripted) {
        self.table.lock().insert(city.to_string(), answer);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    /// Resolves once a lookup has started
    pub async fn entered(&self) {
        self.entered.notified().await;
    }

    /// Run `hook` inside the lookup, after its answer is ready and before it returns
    pub fn before_answer(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.before_answer.lock() = Some(Arc::new(hook));
    }

    pub fn release(&self, lookups: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(lookups);
        }
    }
}

impl WeatherLookup for ScriptedLookup {
    fn fetch(&self, city: &str) -> impl Future<Output = Result<WeatherReading, LookupError>> + Send {
        self.calls.lock().push(city.to_string());
        let answer = self.table.lock().get(city).cloned();
        let gate = self.gate.clone();
        let entered = Arc::clone(&self.entered);
        let hook = self.before_answer.lock().clone();
        let city = city.to_string();

        async move {
            entered.notify_one();
            if let Some(gate) = gate {
                let _permit = gate.acquire().await;
            }
            if let Some(hook) = hook {
                hook();
            }
            match answer {
                Some(Scripted::Reading(reading)) => Ok(reading),
                Some(Scripted::Unavailable) => Err(LookupError::Server {
                    status: 503,
                    message: "unavailable".into(),
                }),
                Some(Scripted::NotFound) | None => Err(LookupError::NotFound(city)),
            }
        }
    }
}

/// Memory store that counts writes
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryStore,
    writes: AtomicUsize,
}

impl CountingStore {
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl KeyValueStore for CountingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.inner.remove(key)
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<String>>,
}

impl RecordingNotifier {
    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, message: &str) {
        self.messages.lock().push(message.to_string());
    }
}

pub fn reading(city: &str, temp: f64) -> WeatherReading {
    WeatherReading::new(city, temp, temp - 5.0, temp + 3.0)
}
