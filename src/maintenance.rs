//! Background cache maintenance
//!
//! Runs the expiry sweep on a fixed interval in a tokio task and reports each
//! pass over a channel, so a long-running process keeps the cache inside its
//! retention windows without an external scheduler.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::cache::CacheManager;

/// Messages sent from the maintenance task
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MaintenanceMessage {
    /// A sweep pass finished
    SweepCompleted {
        /// Rows removed across both tables
        removed: usize,
    },
}

/// Configuration for the maintenance task
#[derive(Debug, Clone)]
pub struct MaintenanceConfig {
    /// Time between sweeps; the first sweep runs immediately
    pub sweep_interval: Duration,
    /// Whether the task runs at all
    pub enabled: bool,
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::from_secs(3600), // 1 hour
            enabled: true,
        }
    }
}

/// Handle for controlling the maintenance task
pub struct MaintenanceHandle {
    /// Channel for receiving maintenance messages
    pub receiver: mpsc::Receiver<MaintenanceMessage>,
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl MaintenanceHandle {
    /// Spawns the maintenance task, which takes ownership of `cache`
    ///
    /// With maintenance disabled nothing is spawned and the cache is dropped.
    pub fn spawn(cache: CacheManager, config: MaintenanceConfig) -> Self {
        let (msg_tx, msg_rx) = mpsc::channel(32);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = if config.enabled {
            let sweep_interval = config.sweep_interval;

            Some(tokio::spawn(async move {
                let mut interval = tokio::time::interval(sweep_interval);

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let removed = cache.sweep_expired();
                            if msg_tx.send(MaintenanceMessage::SweepCompleted { removed }).await.is_err() {
                                break;
                            }
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
                debug!("maintenance task stopped");
            }))
        } else {
            None
        };

        Self {
            receiver: msg_rx,
            shutdown_tx,
            task,
        }
    }

    /// Stops the task and waits for it to finish
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}
