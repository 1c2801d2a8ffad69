use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Temperature unit requested from the weather API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TemperatureUnit {
    #[default]
    Celsius,
    Fahrenheit,
    Kelvin,
}

impl TemperatureUnit {
    /// Value of the `units` query parameter
    pub fn api_param(&self) -> &'static str {
        match self {
            Self::Celsius => "metric",
            Self::Fahrenheit => "imperial",
            Self::Kelvin => "standard",
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Self::Celsius => "°C",
            Self::Fahrenheit => "°F",
            Self::Kelvin => "K",
        }
    }
}

impl From<skydeck_core::TemperatureUnit> for TemperatureUnit {
    fn from(unit: skydeck_core::TemperatureUnit) -> Self {
        match unit {
            skydeck_core::TemperatureUnit::Celsius => Self::Celsius,
            skydeck_core::TemperatureUnit::Fahrenheit => Self::Fahrenheit,
            skydeck_core::TemperatureUnit::Kelvin => Self::Kelvin,
        }
    }
}

/// Weather condition categories mapped from OpenWeatherMap condition codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeatherCondition {
    #[default]
    Clear,
    PartlyCloudy,
    Cloudy,
    Fog,
    Drizzle,
    Rain,
    HeavyRain,
    Snow,
    Sleet,
    Thunderstorm,
}

impl WeatherCondition {
    /// Convert an OpenWeatherMap condition id to WeatherCondition
    /// See: https://openweathermap.org/weather-conditions
    pub fn from_owm_code(code: i32) -> Self {
        match code {
            200..=232 => Self::Thunderstorm,
            300..=321 => Self::Drizzle,
            500 | 501 | 520 | 521 => Self::Rain,
            502..=504 | 522 | 531 => Self::HeavyRain,
            511 => Self::Sleet, // Freezing rain
            611..=616 => Self::Sleet,
            600..=622 => Self::Snow,
            701..=781 => Self::Fog,
            800 => Self::Clear,
            801 | 802 => Self::PartlyCloudy,
            803 | 804 => Self::Cloudy,
            _ => Self::Clear, // Unknown codes default to clear
        }
    }

    /// Get a human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            Self::Clear => "Clear",
            Self::PartlyCloudy => "Partly Cloudy",
            Self::Cloudy => "Cloudy",
            Self::Fog => "Fog",
            Self::Drizzle => "Drizzle",
            Self::Rain => "Rain",
            Self::HeavyRain => "Heavy Rain",
            Self::Snow => "Snow",
            Self::Sleet => "Sleet",
            Self::Thunderstorm => "Thunderstorm",
        }
    }

    pub fn icon_name(&self) -> &'static str {
        match self {
            Self::Clear => "sun",
            Self::PartlyCloudy => "cloud_sun",
            Self::Cloudy => "cloud",
            Self::Fog => "cloud_fog",
            Self::Drizzle | Self::Rain | Self::HeavyRain => "cloud_rain",
            Self::Snow | Self::Sleet => "cloud_snow",
            Self::Thunderstorm => "cloud_lightning",
        }
    }
}

/// Temperature block of a reading (`main` in the API payload)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
    pub temp_min: f64,
    pub temp_max: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feels_like: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<u8>,
}

/// One entry of the `weather` array
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConditionEntry {
    pub id: i32,
    #[serde(default)]
    pub main: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deg: Option<f64>,
}

/// Current weather for one named city.
///
/// Mirrors the subset of the OpenWeatherMap current-weather payload the
/// widgets display. Unknown fields are ignored on deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherReading {
    /// City name as resolved by the provider
    pub name: String,
    pub main: MainReadings,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub weather: Vec<ConditionEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wind: Option<Wind>,
    /// Observation time, unix seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dt: Option<i64>,
}

impl WeatherReading {
    /// Minimal reading carrying only the temperature block
    pub fn new(name: impl Into<String>, temp: f64, temp_min: f64, temp_max: f64) -> Self {
        Self {
            name: name.into(),
            main: MainReadings {
                temp,
                temp_min,
                temp_max,
                feels_like: None,
                humidity: None,
            },
            weather: Vec::new(),
            wind: None,
            dt: None,
        }
    }

    /// Category of the primary condition, if the provider sent one
    pub fn condition(&self) -> Option<WeatherCondition> {
        self.weather
            .first()
            .map(|entry| WeatherCondition::from_owm_code(entry.id))
    }

    pub fn observed_at(&self) -> Option<DateTime<Utc>> {
        self.dt.and_then(|secs| DateTime::from_timestamp(secs, 0))
    }
}

/// Why a weather lookup failed.
///
/// Only `NotFound` is meaningful to the user; everything else is transient
/// and expected to heal on the next refresh.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("City not found: {0}")]
    NotFound(String),
    #[error("Weather API rejected the API key")]
    Unauthorized,
    #[error("Weather API error: {status} - {message}")]
    Server { status: u16, message: String },
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Parse error: {0}")]
    Parse(String),
}

impl LookupError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}
