//! Weather widget engine for SkyDeck
//!
//! Owns the list of widget slots, refreshes them on a timer, persists them
//! between sessions and filters city names for autocomplete.

pub mod board;
pub mod filter;
pub mod notify;
pub mod persistence;
pub mod registry;
pub mod scheduler;
pub mod store;
pub mod widget;

pub use board::{RefreshOutcome, WidgetBoard};
pub use filter::{CityFilter, LiveFilter};
pub use notify::{Notifier, NOT_FOUND_MESSAGE};
pub use persistence::{StoredValue, Theme, WidgetStorage, THEME_STORAGE_KEY, WIDGET_STORAGE_KEY};
pub use registry::{
    RegistrySnapshot, RequestTicket, SnapshotError, UpdateOutcome, WidgetRegistry, MAX_WIDGET_ID,
};
pub use scheduler::{RefreshHandle, RefreshScheduler, DEFAULT_REFRESH_INTERVAL};
pub use store::{JsonFileStore, KeyValueStore, MemoryStore, SqliteStore};
pub use widget::{TemperatureSummary, WidgetId, WidgetSlot, WidgetView};
