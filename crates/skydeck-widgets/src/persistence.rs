//! Typed values persisted under fixed keys.

use std::marker::PhantomData;
use std::sync::Arc;

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use skydeck_core::StorageError;

use crate::registry::RegistrySnapshot;
use crate::store::KeyValueStore;

/// Storage key of the widget list
pub const WIDGET_STORAGE_KEY: &str = "widgets";

/// Storage key of the theme preference
pub const THEME_STORAGE_KEY: &str = "theme";

/// A JSON-serialized `T` stored under one key
pub struct StoredValue<T> {
    store: Arc<dyn KeyValueStore>,
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for StoredValue<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key,
            _marker: PhantomData,
        }
    }
}

impl<T: Serialize + DeserializeOwned> StoredValue<T> {
    pub fn new(store: Arc<dyn KeyValueStore>, key: &'static str) -> Self {
        Self {
            store,
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    /// Overwrite the stored value
    pub fn save(&self, value: &T) -> Result<(), StorageError> {
        let json = serde_json::to_string(value)
            .map_err(|e| StorageError::QueryFailed(format!("serialize {}: {}", self.key, e)))?;
        self.store.set(self.key, &json)
    }

    /// Read the stored value.
    ///
    /// Absent, unreadable and malformed values all come back as `None`.
    pub fn load(&self) -> Option<T> {
        let raw = match self.store.get(self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                tracing::warn!("Failed to read {:?} from storage: {}", self.key, e);
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!("Ignoring malformed {:?} in storage: {}", self.key, e);
                None
            }
        }
    }

    /// Delete the stored value so the next `load` reports absent
    pub fn reset(&self) -> Result<(), StorageError> {
        self.store.remove(self.key)
    }
}

/// Persisted widget list
pub type WidgetStorage = StoredValue<RegistrySnapshot>;

impl WidgetStorage {
    pub fn widgets(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, WIDGET_STORAGE_KEY)
    }
}

/// Carousel colour scheme, stored apart from the widget list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl std::str::FromStr for Theme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("unknown theme: {}", other)),
        }
    }
}

impl StoredValue<Theme> {
    pub fn theme(store: Arc<dyn KeyValueStore>) -> Self {
        Self::new(store, THEME_STORAGE_KEY)
    }

    /// Stored theme, light when none is saved
    pub fn current(&self) -> Theme {
        self.load().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::WidgetRegistry;
    use crate::store::MemoryStore;
    use crate::widget::WidgetId;
    use skydeck_weather::WeatherReading;

    fn memory() -> Arc<dyn KeyValueStore> {
        Arc::new(MemoryStore::new())
    }

    #[test]
    fn test_save_then_load() {
        let storage = WidgetStorage::widgets(memory());
        let mut registry = WidgetRegistry::initialize(2);
        registry.bind_and_update(WidgetId(1), WeatherReading::new("Paris", 15.0, 10.0, 18.0));

        storage.save(&registry.snapshot()).unwrap();
        assert_eq!(storage.load(), Some(registry.snapshot()));
    }

    #[test]
    fn test_load_absent() {
        assert_eq!(WidgetStorage::widgets(memory()).load(), None);
    }

    #[test]
    fn test_malformed_value_is_absent() {
        let store = memory();
        store.set(WIDGET_STORAGE_KEY, "{not json").unwrap();
        assert_eq!(WidgetStorage::widgets(store.clone()).load(), None);

        store.set(WIDGET_STORAGE_KEY, r#"{"slots": 3}"#).unwrap();
        assert_eq!(WidgetStorage::widgets(store).load(), None);
    }

    #[test]
    fn test_reset_removes_value() {
        let storage = WidgetStorage::widgets(memory());
        storage.save(&WidgetRegistry::initialize(1).snapshot()).unwrap();

        storage.reset().unwrap();
        assert_eq!(storage.load(), None);
    }

    #[test]
    fn test_theme_defaults_to_light() {
        let store = memory();
        let theme = StoredValue::<Theme>::theme(store.clone());
        assert_eq!(theme.current(), Theme::Light);

        theme.save(&Theme::Dark).unwrap();
        assert_eq!(theme.current(), Theme::Dark);
        assert_eq!(store.get(THEME_STORAGE_KEY).unwrap().as_deref(), Some("\"dark\""));
    }

    #[test]
    fn test_theme_from_str() {
        assert_eq!("Dark".parse::<Theme>(), Ok(Theme::Dark));
        assert!("sepia".parse::<Theme>().is_err());
    }
}
