//! Weather lookup for SkyDeck
//!
//! Provides current weather by city name via the OpenWeatherMap API, plus the
//! city name list used for autocomplete.

pub mod cities;
pub mod provider;
pub mod types;

pub use cities::{CityListProvider, HttpCityList, StaticCityList};
pub use provider::{OpenWeatherClient, WeatherLookup};
pub use types::*;
