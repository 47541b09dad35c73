//! Real-time driver for a [`ManualScheduler`].

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio::sync::oneshot;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use super::manual::ManualScheduler;
use crate::core::host::SimulationScheduler;
use crate::util::clock::TICK_DURATION;

/// Drives a [`ManualScheduler`] at a fixed rate from a dedicated thread.
///
/// The thread runs a current-thread tokio runtime with one interval timer and
/// becomes the scheduler's simulation thread. Late ticks are skipped rather
/// than bursted.
pub struct TickLoop {
    stop_tx: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl TickLoop {
    /// Start ticking at 20 ticks per second.
    ///
    /// # Errors
    ///
    /// Fails if the runtime or the thread cannot be created.
    pub fn start(scheduler: Arc<ManualScheduler>) -> io::Result<Self> {
        Self::with_period(scheduler, TICK_DURATION)
    }

    /// Start ticking every `period`.
    ///
    /// # Errors
    ///
    /// Fails if the runtime or the thread cannot be created.
    pub fn with_period(scheduler: Arc<ManualScheduler>, period: Duration) -> io::Result<Self> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()?;
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let thread = thread::Builder::new()
            .name("spellcast-tick".into())
            .spawn(move || {
                scheduler.bind_current_thread();
                runtime.block_on(async {
                    let mut interval = tokio::time::interval(period);
                    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
                    loop {
                        tokio::select! {
                            _ = interval.tick() => {
                                scheduler.tick();
                            }
                            _ = &mut stop_rx => break,
                        }
                    }
                });
                debug!(tick = scheduler.current_tick(), "Tick loop exited");
            })?;

        info!(period_ms = period.as_millis(), "Tick loop started");
        Ok(Self {
            stop_tx: Some(stop_tx),
            thread: Some(thread),
        })
    }

    /// Stop ticking and join the thread.
    pub fn stop(mut self) {
        self.halt();
    }

    fn halt(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(());
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("Tick loop thread panicked");
            }
        }
    }
}

impl Drop for TickLoop {
    fn drop(&mut self) {
        self.halt();
    }
}
