//! Scheduled erasure of long-deleted notes.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument};

use arbor_core::{
    defaults, Clock, ErasureRepository, Error, EventBus, NoteId, OptionSource, Result, TreeEvent,
};

/// Configuration for the erasure sweeper.
#[derive(Debug, Clone)]
pub struct SweeperConfig {
    /// Delay between startup and the first sweep.
    pub first_run_delay: Duration,
    /// Delay between two sweeps.
    pub interval: Duration,
    /// Whether the sweeper runs at all.
    pub enabled: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            first_run_delay: Duration::from_secs(defaults::ERASURE_FIRST_RUN_DELAY_SECS),
            interval: Duration::from_secs(defaults::ERASURE_INTERVAL_SECS),
            enabled: true,
        }
    }
}

impl SweeperConfig {
    /// Create config from environment variables (with defaults).
    ///
    /// | Variable | Default | Description |
    /// |----------|---------|-------------|
    /// | `ERASURE_ENABLED` | `true` | Enable/disable the sweeper |
    /// | `ERASURE_FIRST_RUN_DELAY_SECS` | `300` | Delay before the first sweep |
    /// | `ERASURE_INTERVAL_SECS` | `14400` | Delay between sweeps |
    pub fn from_env() -> Self {
        let enabled = std::env::var("ERASURE_ENABLED")
            .map(|v| v != "false" && v != "0")
            .unwrap_or(true);

        let first_run_delay_secs = std::env::var("ERASURE_FIRST_RUN_DELAY_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::ERASURE_FIRST_RUN_DELAY_SECS);

        // A zero interval would spin.
        let interval_secs = std::env::var("ERASURE_INTERVAL_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
            .unwrap_or(defaults::ERASURE_INTERVAL_SECS)
            .max(1);

        Self {
            first_run_delay: Duration::from_secs(first_run_delay_secs),
            interval: Duration::from_secs(interval_secs),
            enabled,
        }
    }

    pub fn with_first_run_delay(mut self, delay: Duration) -> Self {
        self.first_run_delay = delay;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

/// Handle for controlling a running sweeper.
pub struct SweeperHandle {
    shutdown_tx: mpsc::Sender<()>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for it to finish.
    ///
    /// A sweep already in progress completes first.
    pub async fn shutdown(self) -> Result<()> {
        // The loop is already gone when the sweeper was disabled.
        let _ = self.shutdown_tx.send(()).await;
        self.task
            .await
            .map_err(|e| Error::Internal(format!("Erasure sweeper task failed: {}", e)))
    }

    /// Whether the background loop has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

/// Erases notes whose deletion is older than the retention window.
///
/// Erasure goes straight to the [`ErasureRepository`]: no revisions, no
/// protection checks and no per-note events.
pub struct ErasureSweeper {
    erasure: Arc<dyn ErasureRepository>,
    options: Arc<dyn OptionSource>,
    clock: Arc<dyn Clock>,
    events: EventBus,
    config: SweeperConfig,
}

impl ErasureSweeper {
    pub fn new(
        erasure: Arc<dyn ErasureRepository>,
        options: Arc<dyn OptionSource>,
        clock: Arc<dyn Clock>,
        events: EventBus,
        config: SweeperConfig,
    ) -> Self {
        Self {
            erasure,
            options,
            events: events.with_clock(clock.clone()),
            clock,
            config,
        }
    }

    /// Start the schedule in the background and return its handle.
    pub fn start(self) -> SweeperHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let sweeper = Arc::new(self);

        let task = tokio::spawn(async move {
            sweeper.run(&mut shutdown_rx).await;
        });

        SweeperHandle { shutdown_tx, task }
    }

    #[instrument(skip_all, fields(subsystem = "jobs", component = "erasure_sweeper"))]
    async fn run(&self, shutdown_rx: &mut mpsc::Receiver<()>) {
        if !self.config.enabled {
            info!("Erasure sweeper is disabled, not starting");
            return;
        }

        info!(
            first_run_delay_secs = self.config.first_run_delay.as_secs(),
            interval_secs = self.config.interval.as_secs(),
            "Erasure sweeper started"
        );

        let mut delay = self.config.first_run_delay;
        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Erasure sweeper received shutdown signal");
                    break;
                }
                _ = sleep(delay) => {}
            }

            self.sweep().await;
            delay = self.config.interval;
        }

        info!("Erasure sweeper stopped");
    }

    /// Run one sweep now and return the ids of the erased notes.
    ///
    /// Failures are logged and yield an empty result.
    #[instrument(skip_all, fields(subsystem = "jobs", component = "erasure_sweeper", op = "sweep"))]
    pub async fn sweep(&self) -> Vec<NoteId> {
        let start = Instant::now();

        let retention = match self.options.erasure_retention().await {
            Ok(retention) => retention,
            Err(e) => {
                error!(error = %e, "Failed to read erasure retention");
                return Vec::new();
            }
        };
        let now = self.clock.now();
        let cutoff = now - retention;

        match self.erasure.erase_deleted_notes(cutoff, now).await {
            Ok(ids) if ids.is_empty() => {
                debug!(%cutoff, "No notes to erase");
                ids
            }
            Ok(ids) => {
                info!(
                    %cutoff,
                    result_count = ids.len(),
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Erased deleted notes"
                );
                self.events.emit(TreeEvent::NotesErased {
                    note_count: ids.len(),
                });
                ids
            }
            Err(e) => {
                error!(
                    %cutoff,
                    error = %e,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Erasure sweep failed"
                );
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweeper_config_default() {
        let config = SweeperConfig::default();
        assert_eq!(config.first_run_delay, Duration::from_secs(300));
        assert_eq!(config.interval, Duration::from_secs(4 * 3600));
        assert!(config.enabled);
    }

    #[test]
    fn test_sweeper_config_builder() {
        let config = SweeperConfig::default()
            .with_first_run_delay(Duration::from_secs(1))
            .with_interval(Duration::from_secs(60))
            .with_enabled(false);

        assert_eq!(config.first_run_delay, Duration::from_secs(1));
        assert_eq!(config.interval, Duration::from_secs(60));
        assert!(!config.enabled);
    }
}
