//! Background tick that drains the cache on a debounced schedule.
//!
//! One tokio task per logger. Each tick hands the debounce check and the
//! blocking persist to `spawn_blocking`; cancellation is checked before every
//! tick, so a stopped scheduler never starts another flush.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

use crate::flush::FlushEngine;

/// Timing for the scheduler.
#[derive(Clone, Copy, Debug)]
pub(crate) struct Schedule {
    /// How often to wake up.
    pub(crate) tick: Duration,
    /// Minimum gap between two scheduled flushes.
    pub(crate) min_flush_interval: Duration,
}

/// Handle to a running flush loop.
pub(crate) struct FlushScheduler {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl FlushScheduler {
    /// Spawn the loop on `runtime`. The first tick fires one period after
    /// start.
    pub(crate) fn start(engine: Arc<FlushEngine>, schedule: Schedule, runtime: &Handle) -> Self {
        let cancel = CancellationToken::new();
        let task = runtime.spawn(run(engine, schedule, cancel.clone()));
        Self {
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Ask the loop to exit. Safe to call more than once.
    pub(crate) fn stop(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Wait for the loop to exit, including any flush it has in flight.
    pub(crate) async fn join(&self) -> Result<(), JoinError> {
        let task = self.task.lock().take();
        match task {
            Some(task) => task.await,
            None => Ok(()),
        }
    }
}

async fn run(engine: Arc<FlushEngine>, schedule: Schedule, cancel: CancellationToken) {
    let start = tokio::time::Instant::now() + schedule.tick;
    let mut ticker = tokio::time::interval_at(start, schedule.tick);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let engine = Arc::clone(&engine);
        let min = schedule.min_flush_interval;
        match tokio::task::spawn_blocking(move || engine.on_tick(Instant::now(), min)).await {
            Ok(None) => {}
            Ok(Some(Ok(count))) => debug!(count, "scheduled flush complete"),
            Ok(Some(Err(e))) => error!(error = %e, "scheduled flush failed"),
            Err(e) => error!(error = %e, "scheduled flush task failed"),
        }
    }
    debug!("flush scheduler stopped");
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
