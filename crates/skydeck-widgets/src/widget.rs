//! One widget slot and its display projection.

use serde::{Deserialize, Serialize};
use skydeck_weather::WeatherReading;

/// Stable identity of a slot, never reused while the slot is alive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WidgetId(pub u64);

impl std::fmt::Display for WidgetId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Current/min/max temperature shown on a widget
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TemperatureSummary {
    pub current: f64,
    pub min: f64,
    pub max: f64,
}

impl From<&WeatherReading> for TemperatureSummary {
    fn from(reading: &WeatherReading) -> Self {
        Self {
            current: reading.main.temp,
            min: reading.main.temp_min,
            max: reading.main.temp_max,
        }
    }
}

/// One addressable widget position.
///
/// Fields are private: content changes only through the registry, and the
/// temperature summary is always computed from the stored reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WidgetSlot {
    id: WidgetId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    weather_data: Option<WeatherReading>,
    #[serde(default)]
    is_resolved: bool,
}

impl WidgetSlot {
    pub(crate) fn unbound(id: WidgetId) -> Self {
        Self {
            id,
            name: String::new(),
            weather_data: None,
            is_resolved: false,
        }
    }

    pub fn id(&self) -> WidgetId {
        self.id
    }

    /// Bound city name; empty while awaiting input
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weather_data(&self) -> Option<&WeatherReading> {
        self.weather_data.as_ref()
    }

    pub fn is_resolved(&self) -> bool {
        self.is_resolved
    }

    pub fn is_bound(&self) -> bool {
        !self.name.trim().is_empty()
    }

    /// Mirrors the stored reading, zeroed when there is none
    pub fn temperature(&self) -> TemperatureSummary {
        self.weather_data
            .as_ref()
            .map(TemperatureSummary::from)
            .unwrap_or_default()
    }

    pub(crate) fn bind(&mut self, reading: WeatherReading) {
        self.name = reading.name.clone();
        self.weather_data = Some(reading);
        self.is_resolved = true;
    }

    pub(crate) fn clear(&mut self) {
        self.name.clear();
        self.weather_data = None;
        self.is_resolved = false;
    }

    pub fn view(&self) -> WidgetView {
        let condition = self.weather_data.as_ref().and_then(|r| r.condition());
        WidgetView {
            id: self.id,
            title: if self.is_bound() {
                self.name.clone()
            } else {
                WidgetView::PROMPT.to_string()
            },
            is_resolved: self.is_resolved,
            temperature: self.temperature(),
            condition: condition.map(|c| c.description()),
            icon: condition.map(|c| c.icon_name()),
        }
    }
}

/// Display-derived projection of a slot
#[derive(Debug, Clone, PartialEq)]
pub struct WidgetView {
    pub id: WidgetId,
    pub title: String,
    /// Data is shown when true; an input prompt otherwise
    pub is_resolved: bool,
    pub temperature: TemperatureSummary,
    pub condition: Option<&'static str>,
    pub icon: Option<&'static str>,
}

impl WidgetView {
    pub const PROMPT: &'static str = "Enter a city";
}

impl std::fmt::Display for WidgetView {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.is_resolved {
            return write!(f, "[{}] {}", self.id, self.title);
        }
        write!(
            f,
            "[{}] {}: {:.1} (min {:.1}, max {:.1})",
            self.id, self.title, self.temperature.current, self.temperature.min, self.temperature.max
        )?;
        if let Some(condition) = self.condition {
            write!(f, " {}", condition)?;
        }
        Ok(())
    }
}
