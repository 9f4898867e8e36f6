//! Host tick driver.
//!
//! Feeds wall-clock time into an [`EventManager`] on a fixed interval. The
//! manager sits behind a mutex so host callbacks can reach it between ticks.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, Mutex};
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info, instrument};

use crate::core::scheduler::Millis;
use crate::host::world::WorldActions;
use crate::manager::EventManager;

/// Driver configuration.
#[derive(Debug, Clone)]
pub struct DriverConfig {
    /// How often elapsed time is fed to the manager
    pub tick_interval: Duration,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
        }
    }
}

/// Interval loop advancing an event manager.
pub struct EventDriver<W: WorldActions> {
    manager: Arc<Mutex<EventManager<W>>>,
    config: DriverConfig,
    /// Shutdown signal.
    shutdown_tx: broadcast::Sender<()>,
}

impl<W: WorldActions + 'static> EventDriver<W> {
    pub fn new(manager: EventManager<W>, config: DriverConfig) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            manager: Arc::new(Mutex::new(manager)),
            config,
            shutdown_tx,
        }
    }

    /// Shared handle for host callbacks.
    pub fn handle(&self) -> Arc<Mutex<EventManager<W>>> {
        self.manager.clone()
    }

    /// Run until [`shutdown`](Self::shutdown). Returns the number of ticks.
    #[instrument(skip(self))]
    pub async fn run(&self) -> u64 {
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let mut ticker = interval(self.config.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut last = Instant::now();
        let mut ticks = 0u64;
        info!(interval_ms = self.config.tick_interval.as_millis() as u64, "Event driver started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let elapsed = last.elapsed().as_millis() as Millis;
                    // Carry the sub-millisecond remainder into the next tick
                    last += Duration::from_millis(elapsed);

                    let ran = self.manager.lock().await.advance(elapsed);
                    ticks += 1;
                    if ran > 0 {
                        debug!(ran, elapsed, "Driver tick");
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!(ticks, "Event driver stopping");
                    break;
                }
            }
        }

        ticks
    }

    /// Stop the loop.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());
    }
}
