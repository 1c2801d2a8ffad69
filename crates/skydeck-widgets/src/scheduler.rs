//! Periodic per-widget weather refresh.
//!
//! One timer task per widget present at start time, all sharing a single
//! [`CancellationToken`]. Widgets added later are not watched until the
//! scheduler is restarted.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use skydeck_weather::WeatherLookup;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::board::{RefreshOutcome, WidgetBoard};
use crate::registry::WidgetRegistry;
use crate::widget::WidgetId;

pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy)]
pub struct RefreshScheduler {
    period: Duration,
}

impl Default for RefreshScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_INTERVAL)
    }
}

impl RefreshScheduler {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawn one timer per current widget. Must be called inside a tokio runtime.
    ///
    /// The first tick of each timer fires one full period after start.
    pub fn start<L: WeatherLookup>(&self, board: &WidgetBoard<L>) -> RefreshHandle {
        let token = CancellationToken::new();
        let watched = board.ids();

        let tasks = watched
            .iter()
            .map(|&id| {
                tokio::spawn(watch(board.clone(), id, self.period, token.clone()))
            })
            .collect();

        tracing::info!(
            "Refreshing {} widgets every {:?}",
            watched.len(),
            self.period
        );

        RefreshHandle {
            token,
            tasks,
            watched,
            registry: board.registry_handle(),
        }
    }
}

async fn watch<L: WeatherLookup>(
    board: WidgetBoard<L>,
    id: WidgetId,
    period: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => {}
        }

        if !board.contains(id) {
            tracing::debug!("Widget {} deleted; stopping its timer", id);
            break;
        }

        match board.refresh_guarded(id, &token).await {
            RefreshOutcome::Cancelled => break,
            outcome => tracing::trace!("Widget {} tick: {:?}", id, outcome),
        }
    }
}

/// The cancellation group of a running scheduler.
///
/// Dropping the handle cancels it.
pub struct RefreshHandle {
    token: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
    watched: Vec<WidgetId>,
    registry: Arc<Mutex<WidgetRegistry>>,
}

impl RefreshHandle {
    /// Stop every timer.
    ///
    /// When this returns, no lookup result can be applied or persisted any
    /// more, including ones already in flight.
    pub fn cancel(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        // Wait out any result being applied right now; later ones see the token
        drop(self.registry.lock());
        tracing::info!("Widget refresh stopped");
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Widgets that had a timer at start
    pub fn watched(&self) -> &[WidgetId] {
        &self.watched
    }

    /// Cancel and wait for every timer task to finish
    pub async fn shutdown(mut self) {
        self.cancel();
        for task in std::mem::take(&mut self.tasks) {
            if let Err(e) = task.await {
                tracing::error!("Widget refresh task failed: {}", e);
            }
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}
