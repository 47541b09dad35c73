//! Worker threads behind the cast dispatcher.
//!
//! Core workers block on the bounded channel for the pool's whole life.
//! When the channel is full, burst workers are spawned up to `max_workers`;
//! each starts with the cast that overflowed and retires after `keep_alive`
//! of idleness. Past that, the caller decides (see `SaturationPolicy`).
//!
//! Shutdown drops the sender: workers drain what is queued and exit when the
//! channel reports disconnection. No polling anywhere.

use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use super::{execute, CastJob};
use crate::config::DispatcherConfig;
use crate::core::error::DispatchError;
use crate::core::metrics::MetricsCollector;

/// Result of offering a cast to the pool.
pub(super) enum Admission {
    /// A worker will run it.
    Queued,
    /// Queue full and no worker can be added; the cast is handed back.
    Saturated(CastJob),
}

struct SpawnFailure {
    error: io::Error,
    job: Option<CastJob>,
}

/// State shared by the pool handle and every worker thread.
struct PoolShared {
    metrics: Arc<MetricsCollector>,
    /// Workers currently inside `execute`.
    active: AtomicUsize,
    /// Live worker threads, paired with `exited` for shutdown waits.
    live: Mutex<usize>,
    exited: Condvar,
    /// Set in the forced phase of shutdown; workers drop what they dequeue.
    cancelled: Arc<AtomicBool>,
}

impl PoolShared {
    fn run(&self, job: CastJob) {
        if self.cancelled.load(Ordering::Acquire) {
            debug!(cast_id = job.id, "Dropping cast cancelled by shutdown");
            return;
        }
        let cast_id = job.id;
        self.active.fetch_add(1, Ordering::Relaxed);
        // Delivery runs host callbacks; the worker outlives a panic there.
        if panic::catch_unwind(AssertUnwindSafe(|| execute(job, &self.metrics))).is_err() {
            warn!(cast_id, "Cast delivery panicked");
        }
        self.active.fetch_sub(1, Ordering::Relaxed);
    }

    fn worker_exited(&self) {
        let mut live = self.live.lock();
        *live = live.saturating_sub(1);
        self.exited.notify_all();
    }
}

pub(super) struct WorkerPool {
    config: DispatcherConfig,
    /// Option allows clean shutdown by dropping.
    task_tx: Mutex<Option<Sender<CastJob>>>,
    /// Kept for burst workers and for draining on forced shutdown.
    task_rx: Receiver<CastJob>,
    shared: Arc<PoolShared>,
    thread_counter: AtomicU64,
}

impl WorkerPool {
    /// Spawn the core workers.
    pub(super) fn new(config: DispatcherConfig, metrics: Arc<MetricsCollector>) -> Result<Self, DispatchError> {
        config.validate().map_err(DispatchError::InvalidConfig)?;

        let (task_tx, task_rx) = bounded::<CastJob>(config.queue_capacity);
        let pool = Self {
            task_tx: Mutex::new(Some(task_tx)),
            task_rx,
            shared: Arc::new(PoolShared {
                metrics,
                active: AtomicUsize::new(0),
                live: Mutex::new(0),
                exited: Condvar::new(),
                cancelled: Arc::new(AtomicBool::new(false)),
            }),
            thread_counter: AtomicU64::new(0),
            config,
        };

        for _ in 0..pool.config.core_workers {
            *pool.shared.live.lock() += 1;
            if let Err(failure) = pool.spawn_worker(None) {
                pool.shared.worker_exited();
                pool.close();
                return Err(DispatchError::Spawn(failure.error.to_string()));
            }
        }

        Ok(pool)
    }

    pub(super) const fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub(super) fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shared.cancelled)
    }

    /// Offer a cast: enqueue it, else start a burst worker with it, else
    /// hand it back.
    ///
    /// # Errors
    ///
    /// `DispatchError::ShutDown` once the pool is closed.
    pub(super) fn submit(&self, job: CastJob) -> Result<Admission, DispatchError> {
        // Clone under a brief lock so concurrent submitters don't serialize on send.
        let Some(task_tx) = self.task_tx.lock().clone() else {
            return Err(DispatchError::ShutDown);
        };

        let job = match task_tx.try_send(job) {
            Ok(()) => return Ok(Admission::Queued),
            Err(TrySendError::Full(job)) => job,
            Err(TrySendError::Disconnected(_)) => return Err(DispatchError::ShutDown),
        };

        {
            let mut live = self.shared.live.lock();
            if *live >= self.config.max_workers {
                return Ok(Admission::Saturated(job));
            }
            *live += 1;
        }

        match self.spawn_worker(Some(job)) {
            Ok(()) => Ok(Admission::Queued),
            Err(failure) => {
                self.shared.worker_exited();
                warn!(error = %failure.error, "Failed to spawn burst worker");
                Ok(failure.job.map_or(Admission::Queued, Admission::Saturated))
            }
        }
    }

    /// Start a worker thread. With a first job it is a burst worker that
    /// retires when idle; without one it is a core worker. The caller has
    /// already counted it in `live`.
    fn spawn_worker(&self, first: Option<CastJob>) -> Result<(), SpawnFailure> {
        let worker_id = self.thread_counter.fetch_add(1, Ordering::Relaxed);
        let keep_alive = first.as_ref().map(|_| self.config.keep_alive());
        let slot = Arc::new(Mutex::new(first));
        let worker_slot = Arc::clone(&slot);
        let task_rx = self.task_rx.clone();
        let shared = Arc::clone(&self.shared);

        thread::Builder::new()
            .name(format!("{}-{worker_id}", self.config.thread_name_prefix))
            .stack_size(self.config.thread_stack_size)
            .spawn(move || {
                let first = worker_slot.lock().take();
                drop(worker_slot);
                worker_loop(worker_id, &task_rx, &shared, first, keep_alive);
            })
            .map(drop)
            .map_err(|error| SpawnFailure {
                error,
                job: slot.lock().take(),
            })
    }

    /// Stop accepting casts. Queued casts still run.
    pub(super) fn close(&self) {
        self.task_tx.lock().take();
    }

    /// Cancel everything still queued and make workers drop anything they
    /// dequeue from now on. Returns how many queued casts were dropped.
    pub(super) fn cancel_pending(&self) -> usize {
        self.shared.cancelled.store(true, Ordering::Release);
        self.task_rx.try_iter().count()
    }

    /// Wait until every worker thread has exited or `timeout` passes.
    pub(super) fn await_termination(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut live = self.shared.live.lock();
        while *live > 0 {
            if self.shared.exited.wait_until(&mut live, deadline).timed_out() {
                return *live == 0;
            }
        }
        true
    }

    pub(super) fn active_workers(&self) -> usize {
        self.shared.active.load(Ordering::Relaxed)
    }

    pub(super) fn queue_depth(&self) -> usize {
        self.task_rx.len()
    }

    pub(super) fn live_workers(&self) -> usize {
        *self.shared.live.lock()
    }
}

fn worker_loop(
    worker_id: u64,
    task_rx: &Receiver<CastJob>,
    shared: &PoolShared,
    first: Option<CastJob>,
    keep_alive: Option<Duration>,
) {
    debug!(worker_id, burst = keep_alive.is_some(), "Cast worker started");

    if let Some(job) = first {
        shared.run(job);
    }

    loop {
        let next = match keep_alive {
            None => task_rx.recv().ok(),
            Some(idle) => match task_rx.recv_timeout(idle) {
                Ok(job) => Some(job),
                Err(RecvTimeoutError::Timeout) => {
                    debug!(worker_id, "Burst worker idle, retiring");
                    None
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
        };
        let Some(job) = next else {
            break;
        };
        shared.run(job);
    }

    shared.worker_exited();
    debug!(worker_id, "Cast worker exiting");
}
