// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Background expiry sweep.
//!
//! A tokio task sleeps for the registry's current sweep interval, sweeps, and
//! goes round again until told to stop. The interval is re-read before every
//! sleep, so a settings change takes effect on the next scheduled pass.

use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::registry::store::SessionRegistry;

/// Handle to a running sweep task.
///
/// Dropping the handle signals the task to stop; [`Sweeper::stop`] does the
/// same and also waits for it to finish.
#[derive(Debug)]
pub struct Sweeper {
    shutdown: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Signal the task and wait until it has exited.
    pub async fn stop(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                tracing::warn!("Session sweeper ended abnormally: {}", e);
            }
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

impl SessionRegistry {
    /// Spawn the periodic sweep on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime, like `tokio::spawn`.
    pub fn spawn_sweeper(self: &Arc<Self>) -> Sweeper {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let registry = Arc::clone(self);

        let handle = tokio::spawn(async move {
            tracing::info!(
                interval_secs = registry.settings().sweep_interval.as_secs(),
                "Session sweeper started"
            );
            loop {
                let interval = registry.settings().sweep_interval;
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        registry.sweep();
                    }
                    changed = shutdown_rx.changed() => {
                        // A dropped sender also means stop
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
            tracing::info!("Session sweeper stopped");
        });

        Sweeper {
            shutdown,
            handle: Some(handle),
        }
    }
}
