//! Expiration Sweeper
//!
//! Background task that periodically removes expired items from a pool.
//!
//! The task runs on its own OS thread driving a single-threaded tokio
//! runtime, so a pool can be created and stopped from plain threads as well
//! as from inside an async context.

use std::io;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::cache::store::{purge_expired, SharedItems};
use crate::error::Result;

/// Name given to the sweeper thread
pub const SWEEPER_THREAD_NAME: &str = "ttl-pool-sweeper";

// == Sweeper ==
/// Handle to a running sweep task.
///
/// Two states: running and stopped. [`Sweeper::stop`] moves to stopped and
/// there is no way back.
#[derive(Debug)]
pub struct Sweeper {
    stop_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    // == Spawn ==
    /// Starts sweeping `items` every `interval`.
    ///
    /// Returns once the sweeper's runtime is up. The first sweep happens one
    /// full interval after this call.
    pub fn spawn(items: SharedItems, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = oneshot::channel();
        let (ready_tx, ready_rx) = mpsc::sync_channel::<io::Result<()>>(1);

        let handle = thread::Builder::new()
            .name(SWEEPER_THREAD_NAME.to_string())
            .spawn(move || {
                let runtime = match tokio::runtime::Builder::new_current_thread()
                    .enable_time()
                    .build()
                {
                    Ok(runtime) => runtime,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                runtime.block_on(run(items, interval, stop_rx));
            })?;

        let started = ready_rx
            .recv()
            .unwrap_or_else(|_| Err(io::Error::other("sweeper exited during startup")));
        if let Err(err) = started {
            let _ = handle.join();
            return Err(err.into());
        }

        info!(?interval, "Expiration sweeper started");
        Ok(Self {
            stop_tx: Some(stop_tx),
            handle: Some(handle),
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    // == Stop ==
    /// Signals the task and blocks until its thread has exited.
    ///
    /// A sweep already in progress finishes first. Later calls do nothing.
    pub fn stop(&mut self) {
        let Some(handle) = self.handle.take() else {
            return;
        };

        if let Some(stop_tx) = self.stop_tx.take() {
            // The receiver is gone only if the task already ended
            let _ = stop_tx.send(());
        }

        if handle.join().is_err() {
            warn!("Expiration sweeper panicked before shutdown");
            return;
        }
        info!("Expiration sweeper stopped");
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

// == Sweep Loop ==
async fn run(items: SharedItems, interval: Duration, mut stop_rx: oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // Skip the immediate first tick
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;

            // A send and a dropped sender both mean stop
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {
                let removed = purge_expired(&items, Utc::now());
                if removed > 0 {
                    debug!(removed, "Swept expired items");
                } else {
                    trace!("Sweep found no expired items");
                }
            }
        }
    }
}
