mod commands;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use skydeck_core::{AppError, Config, StorageBackend};
use skydeck_weather::{HttpCityList, OpenWeatherClient, StaticCityList, WeatherLookup};
use skydeck_widgets::{
    CityFilter, JsonFileStore, KeyValueStore, LiveFilter, MemoryStore, Notifier, RefreshOutcome,
    RefreshScheduler, SqliteStore, StoredValue, Theme, WidgetBoard,
};
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::commands::{Command, HELP};

/// Prints notifications inline with the widget listing
struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, message: &str) {
        println!("! {}", message);
    }
}

fn open_store(config: &Config) -> Result<Arc<dyn KeyValueStore>, AppError> {
    let dir = &config.storage.data_dir;
    let store: Arc<dyn KeyValueStore> = match config.storage.backend {
        StorageBackend::Json => Arc::new(JsonFileStore::open(dir)?),
        StorageBackend::Sqlite => {
            std::fs::create_dir_all(dir)?;
            Arc::new(SqliteStore::open(dir.join("skydeck.db"))?)
        }
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
    };
    tracing::info!(backend = ?config.storage.backend, dir = %dir.display(), "Storage opened");
    Ok(store)
}

async fn load_cities(config: &Config, timeout: Duration) -> CityFilter {
    match &config.cities.source_url {
        Some(url) => match HttpCityList::new(url.as_str(), timeout) {
            Ok(provider) => CityFilter::load(&provider).await,
            Err(e) => {
                tracing::warn!("City list client unavailable: {}", e);
                CityFilter::default()
            }
        },
        None => CityFilter::load(&StaticCityList(Vec::new())).await,
    }
}

fn print_board<L: WeatherLookup>(board: &WidgetBoard<L>, visible: usize) {
    for view in board.views() {
        println!("{}", view);
    }
    if board.overflows(visible) {
        println!("(more widgets than fit on screen)");
    }
}

fn print_outcome(id: impl std::fmt::Display, outcome: RefreshOutcome) {
    match outcome {
        RefreshOutcome::Applied => {}
        RefreshOutcome::Skipped => println!("Widget {} has no city yet", id),
        RefreshOutcome::Discarded => println!("Widget {} changed while fetching", id),
        RefreshOutcome::Failed => println!("Weather service unavailable for widget {}", id),
        RefreshOutcome::NotFound | RefreshOutcome::Cancelled => {}
    }
}

struct Session<L> {
    board: WidgetBoard<L>,
    cities: LiveFilter,
    theme: StoredValue<Theme>,
    visible: usize,
}

impl<L: WeatherLookup> Session<L> {
    /// Runs one command; returns `false` when the driver should exit.
    async fn execute(&mut self, command: Command) -> bool {
        match command {
            Command::List => print_board(&self.board, self.visible),
            Command::Add(city) => {
                let Some(id) = self.board.add_widget() else {
                    println!("No more widgets can be added");
                    return true;
                };
                println!("Added widget {}", id);
                if let Some(city) = city {
                    let outcome = self.board.fetch_city(id, &city).await;
                    print_outcome(id, outcome);
                }
                print_board(&self.board, self.visible);
            }
            Command::Delete(id) => {
                if !self.board.contains(id) {
                    println!("No widget {}", id);
                } else if !self.board.delete_widget(id) {
                    println!("The last widget cannot be removed");
                }
                print_board(&self.board, self.visible);
            }
            Command::Reset(id) => {
                if !self.board.reset_widget(id) {
                    println!("No widget {}", id);
                }
                print_board(&self.board, self.visible);
            }
            Command::ResetAll => {
                self.board.reset_all();
                print_board(&self.board, self.visible);
            }
            Command::Fetch(id, city) => {
                let outcome = self.board.fetch_city(id, &city).await;
                print_outcome(id, outcome);
                print_board(&self.board, self.visible);
            }
            Command::Refresh(id) => {
                let outcome = self.board.refresh(id).await;
                print_outcome(id, outcome);
                print_board(&self.board, self.visible);
            }
            Command::Cities(query) => {
                let options = self.cities.set_query(&query);
                if options.is_empty() {
                    println!("No matching cities");
                }
                for name in options {
                    println!("  {}", name);
                }
            }
            Command::Theme(None) => println!("Theme: {:?}", self.theme.current()),
            Command::Theme(Some(theme)) => match self.theme.save(&theme) {
                Ok(()) => println!("Theme: {:?}", theme),
                Err(e) => {
                    tracing::warn!("Failed to save theme: {}", e);
                    println!("{}", AppError::from(e).user_message());
                }
            },
            Command::Clear => match self.board.clear_storage() {
                Ok(()) => println!("Saved widgets cleared; they return to defaults on restart"),
                Err(e) => {
                    tracing::warn!("Failed to clear storage: {}", e);
                    println!("{}", AppError::from(e).user_message());
                }
            },
            Command::Help => println!("{}", HELP),
            Command::Quit => return false,
        }
        true
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    skydeck_core::init()?;

    let (config, _) = Config::load_validated()?;

    let store = match open_store(&config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("{}", e.user_message());
            return Err(anyhow::Error::new(e).context("Failed to open widget storage"));
        }
    };

    let timeout = Duration::from_secs(config.weather.request_timeout_secs);
    let lookup = OpenWeatherClient::new(
        &config.weather.api_base_url,
        config.weather.effective_api_key(),
        config.weather.temperature_unit.into(),
        timeout,
    )
    .context("Failed to build weather client")?;

    let board = WidgetBoard::open(
        config.widgets.default_count,
        lookup,
        store.clone(),
        Arc::new(ConsoleNotifier),
    );

    println!("SkyDeck - type `help` for commands");
    for (id, outcome) in board.refresh_all().await {
        if outcome != RefreshOutcome::Skipped {
            print_outcome(id, outcome);
        }
    }

    let handle = RefreshScheduler::new(config.refresh_interval()).start(&board);
    tracing::info!(
        widgets = handle.watched().len(),
        period_ms = config.widgets.refresh_interval_ms,
        "Refresh timers started"
    );

    let mut session = Session {
        board,
        cities: LiveFilter::new(load_cities(&config, timeout).await),
        theme: StoredValue::<Theme>::theme(store),
        visible: config.widgets.slides_to_show,
    };
    println!("Theme: {:?}", session.theme.current());
    print_board(&session.board, session.visible);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line.context("Failed to read input")? else {
                    break;
                };
                match line.parse::<Command>() {
                    Ok(command) => {
                        if !session.execute(command).await {
                            break;
                        }
                    }
                    Err(message) => println!("{}", message),
                }
            }
        }
    }

    handle.shutdown().await;
    tracing::info!("SkyDeck stopped");
    Ok(())
}
