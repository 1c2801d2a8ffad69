//! Known city names for autocomplete.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;

use crate::types::LookupError;

/// Capability: one-shot list of city names.
pub trait CityListProvider: Send + Sync {
    fn list(&self) -> impl Future<Output = Result<Vec<String>, LookupError>> + Send;
}

/// Fetches a JSON array of strings from a URL
#[derive(Debug, Clone)]
pub struct HttpCityList {
    client: Arc<Client>,
    url: String,
}

impl HttpCityList {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, LookupError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client: Arc::new(client),
            url: url.into(),
        })
    }

    async fn fetch_names(&self) -> Result<Vec<String>, LookupError> {
        let response = self.client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(LookupError::Server {
                status: status.as_u16(),
                message: format!("city list request to {} failed", self.url),
            });
        }

        let body = response.bytes().await?;
        let names: Vec<String> =
            serde_json::from_slice(&body).map_err(|e| LookupError::Parse(e.to_string()))?;

        tracing::info!("Loaded {} city names", names.len());
        Ok(names)
    }
}

impl CityListProvider for HttpCityList {
    fn list(&self) -> impl Future<Output = Result<Vec<String>, LookupError>> + Send {
        self.fetch_names()
    }
}

/// Fixed in-process list
#[derive(Debug, Clone, Default)]
pub struct StaticCityList(pub Vec<String>);

impl CityListProvider for StaticCityList {
    fn list(&self) -> impl Future<Output = Result<Vec<String>, LookupError>> + Send {
        let names = self.0.clone();
        async move { Ok(names) }
    }
}
