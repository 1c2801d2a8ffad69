pub mod config;
pub mod error;

pub use config::{
    CitiesConfig, Config, StorageBackend, StorageConfig, TemperatureUnit, ValidationResult,
    WeatherConfig, WidgetsConfig, API_KEY_ENV,
};
pub use error::{AppError, ConfigError, RusqliteErrorExt, StorageError};

use anyhow::Result;

/// Initialize the core application
pub fn init() -> Result<()> {
    // Logs go to stderr; stdout belongs to the widget display
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to install tracing subscriber: {}", e))?;

    tracing::info!("SkyDeck core initialized");
    Ok(())
}
