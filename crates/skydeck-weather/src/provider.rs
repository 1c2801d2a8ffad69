//! Current-weather lookup by city name.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use url::Url;

use crate::types::{LookupError, TemperatureUnit, WeatherReading};

const USER_AGENT: &str = "SkyDeck/0.1.0";

/// Capability: resolve a city name to its current weather.
///
/// The returned future must be `Send` so refresh timers can drive it from a
/// spawned task.
pub trait WeatherLookup: Send + Sync + 'static {
    fn fetch(&self, city: &str) -> impl Future<Output = Result<WeatherReading, LookupError>> + Send;
}

impl<T: WeatherLookup> WeatherLookup for Arc<T> {
    fn fetch(&self, city: &str) -> impl Future<Output = Result<WeatherReading, LookupError>> + Send {
        (**self).fetch(city)
    }
}

/// OpenWeatherMap current-weather client
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: Arc<Client>,
    base_url: Url,
    api_key: String,
    unit: TemperatureUnit,
}

impl OpenWeatherClient {
    pub fn new(
        base_url: &str,
        api_key: impl Into<String>,
        unit: TemperatureUnit,
        timeout: Duration,
    ) -> Result<Self, LookupError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| LookupError::Parse(format!("invalid base URL {}: {}", base_url, e)))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client: Arc::new(client),
            base_url,
            api_key: api_key.into(),
            unit,
        })
    }

    pub fn unit(&self) -> TemperatureUnit {
        self.unit
    }

    fn endpoint(&self) -> Result<Url, LookupError> {
        self.base_url
            .join("data/2.5/weather")
            .map_err(|e| LookupError::Parse(e.to_string()))
    }

    async fn fetch_current(&self, city: &str) -> Result<WeatherReading, LookupError> {
        let city = city.trim();
        if city.is_empty() {
            return Err(LookupError::NotFound(String::new()));
        }

        let response = self
            .client
            .get(self.endpoint()?)
            .query(&[
                ("q", city),
                ("units", self.unit.api_param()),
                ("appid", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => {
                tracing::debug!("Weather lookup: no city named {:?}", city);
                return Err(LookupError::NotFound(city.to_string()));
            }
            StatusCode::UNAUTHORIZED => return Err(LookupError::Unauthorized),
            s if !s.is_success() => {
                let message = response.text().await.unwrap_or_default();
                return Err(LookupError::Server {
                    status: s.as_u16(),
                    message,
                });
            }
            _ => {}
        }

        let body = response.bytes().await?;
        let reading: WeatherReading =
            serde_json::from_slice(&body).map_err(|e| LookupError::Parse(e.to_string()))?;

        tracing::debug!("Fetched weather for {}: {:.1}", reading.name, reading.main.temp);
        Ok(reading)
    }
}

impl WeatherLookup for OpenWeatherClient {
    fn fetch(&self, city: &str) -> impl Future<Output = Result<WeatherReading, LookupError>> + Send {
        self.fetch_current(city)
    }
}
