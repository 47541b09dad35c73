//! Off-thread cast execution with simulation-thread result delivery.
//!
//! `CastDispatcher` owns a bounded worker pool. A cast moves through
//! `Submitted -> Running -> {CompletedOk, CompletedFail} -> Delivered`:
//! the job owns its delivery channel and is consumed by `execute`, so a cast
//! is delivered at most once and never without running. A cast dropped by
//! forced shutdown is never delivered.
//!
//! # Example
//!
//! ```rust,ignore
//! let dispatcher = CastDispatcher::new(DispatcherConfig::new(), scheduler)?;
//!
//! // Await the outcome yourself...
//! let outcome = dispatcher.cast_async(fireball.clone(), CastContext::new(actor))?.await?;
//!
//! // ...or let the dispatcher show feedback on the simulation thread.
//! dispatcher.cast_async_with_callback(fireball, CastContext::new(actor), presentation)?;
//! ```

mod pool;

use std::any::Any;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Instant;

use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use self::pool::{Admission, WorkerPool};
use super::ability::{guarded_key, Ability, CastContext, CastFailure, CastOutcome, FailureKind};
use super::error::DispatchError;
use super::host::{run_on_simulation, Presentation, SimulationScheduler};
use super::metrics::{MetricsCollector, MetricsSnapshot};
use crate::config::{DispatcherConfig, SaturationPolicy};
use crate::util::clock::Tick;
use crate::util::ids::CastId;

/// Message key passed to [`Presentation::show_success`] after a cast.
pub const SPELL_CAST_MESSAGE: &str = "spell-cast";

/// Message key passed to [`Presentation::show_failure`] after a cast.
pub const SPELL_FAILED_MESSAGE: &str = "spell-failed";

/// Where a finished cast's outcome goes.
enum Delivery {
    Handle(oneshot::Sender<CastOutcome>),
    Callback(Box<dyn FnOnce(CastOutcome) + Send>),
}

impl Delivery {
    fn deliver(self, outcome: CastOutcome) {
        match self {
            // The caller may have dropped the handle; nothing to do then.
            Self::Handle(tx) => {
                let _ = tx.send(outcome);
            }
            Self::Callback(callback) => callback(outcome),
        }
    }
}

/// A submitted cast.
pub(crate) struct CastJob {
    id: CastId,
    ability: Arc<dyn Ability>,
    context: CastContext,
    submitted_at: Instant,
    delivery: Delivery,
}

/// Run the ability, convert whatever happens into an outcome, record
/// metrics once, and deliver.
fn execute(job: CastJob, metrics: &MetricsCollector) {
    let CastJob {
        id,
        ability,
        context,
        submitted_at,
        delivery,
    } = job;
    let key = guarded_key(ability.as_ref());
    debug!(cast_id = id, ability = %key, actor = %context.actor, "Executing cast");

    let result = panic::catch_unwind(AssertUnwindSafe(|| ability.cast(&context)));
    let elapsed = submitted_at.elapsed();

    let (success, payload, failure) = match result {
        Ok(Ok(Some(result))) => {
            metrics.record_cast(elapsed, result.success);
            if result.success {
                (true, result.payload, None)
            } else {
                let description = result
                    .message
                    .unwrap_or_else(|| "ability reported failure".to_owned());
                let failure = CastFailure {
                    kind: FailureKind::Rejected,
                    description,
                };
                (false, result.payload, Some(failure))
            }
        }
        Ok(Ok(None)) => {
            metrics.record_cast(elapsed, false);
            let failure = CastFailure {
                kind: FailureKind::NoResult,
                description: "ability returned no result".to_owned(),
            };
            (false, None, Some(failure))
        }
        Ok(Err(err)) => {
            warn!(cast_id = id, ability = %key, error = %err, "Async cast failed");
            metrics.record_failure();
            let failure = CastFailure {
                kind: FailureKind::Raised,
                description: err.to_string(),
            };
            (false, None, Some(failure))
        }
        Err(panic) => {
            let description = panic_message(panic.as_ref());
            warn!(cast_id = id, ability = %key, panic = %description, "Async cast panicked");
            metrics.record_failure();
            let failure = CastFailure {
                kind: FailureKind::Panicked,
                description,
            };
            (false, None, Some(failure))
        }
    };

    debug!(cast_id = id, success, elapsed_us = elapsed.as_micros(), "Cast completed");

    delivery.deliver(CastOutcome {
        cast_id: id,
        ability: key,
        actor: context.actor,
        success,
        payload,
        failure,
        elapsed,
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "ability panicked".to_owned())
}

/// Show player feedback for a finished cast. Runs on the simulation thread
/// and touches nothing but `presentation`.
pub fn handle_cast_result(outcome: &CastOutcome, presentation: &dyn Presentation) {
    let actor = outcome.actor;
    let reachable = presentation.is_reachable(actor);

    match &outcome.failure {
        Some(failure) if failure.kind.is_abort() => {
            warn!(cast_id = outcome.cast_id, ability = %outcome.ability, "Exception in async cast");
            if reachable {
                presentation.show_action_bar_message(actor, &format!("Spell failed: {}", failure.description));
            }
        }
        Some(failure) if failure.kind == FailureKind::NoResult => {
            warn!(cast_id = outcome.cast_id, ability = %outcome.ability, "Null result from async cast");
            if reachable {
                presentation.show_action_bar_message(actor, "Spell failed: Unknown error");
            }
        }
        _ if !reachable => {
            debug!(cast_id = outcome.cast_id, %actor, "Actor unreachable, skipping cast feedback");
        }
        _ if outcome.success => presentation.show_success(actor, SPELL_CAST_MESSAGE),
        _ => presentation.show_failure(actor, SPELL_FAILED_MESSAGE),
    }
}

/// Pending outcome of [`CastDispatcher::cast_async`].
///
/// Await it from async code or call [`wait`](Self::wait) from a plain
/// thread. Resolves to `DispatchError::Cancelled` if forced shutdown dropped
/// the cast.
#[derive(Debug)]
pub struct CastHandle {
    id: CastId,
    rx: oneshot::Receiver<CastOutcome>,
}

impl CastHandle {
    /// Identifier of the cast.
    #[must_use]
    pub const fn id(&self) -> CastId {
        self.id
    }

    /// Block the current thread until the outcome is available.
    ///
    /// # Errors
    ///
    /// `DispatchError::Cancelled` if the cast was dropped.
    ///
    /// # Panics
    ///
    /// Panics if called from within an async runtime; await the handle there.
    pub fn wait(self) -> Result<CastOutcome, DispatchError> {
        self.rx.blocking_recv().map_err(|_| DispatchError::Cancelled)
    }

    /// Take the outcome if it is ready, without blocking.
    pub fn try_outcome(&mut self) -> Option<Result<CastOutcome, DispatchError>> {
        match self.rx.try_recv() {
            Ok(outcome) => Some(Ok(outcome)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(DispatchError::Cancelled)),
        }
    }
}

impl Future for CastHandle {
    type Output = Result<CastOutcome, DispatchError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.map_err(|_| DispatchError::Cancelled))
    }
}

/// Runs abilities off the simulation thread and routes their outcomes back.
pub struct CastDispatcher {
    pool: WorkerPool,
    scheduler: Arc<dyn SimulationScheduler>,
    metrics: Arc<MetricsCollector>,
    next_id: AtomicU64,
    shutdown: AtomicBool,
}

impl CastDispatcher {
    /// Create a dispatcher and start its core workers.
    ///
    /// # Errors
    ///
    /// `DispatchError::InvalidConfig` for a bad configuration,
    /// `DispatchError::Spawn` if a worker thread cannot be started.
    pub fn new(config: DispatcherConfig, scheduler: Arc<dyn SimulationScheduler>) -> Result<Self, DispatchError> {
        let metrics = Arc::new(MetricsCollector::new());
        let pool = WorkerPool::new(config, Arc::clone(&metrics))?;

        let config = pool.config();
        info!(
            core_workers = config.core_workers,
            max_workers = config.max_workers,
            queue_capacity = config.queue_capacity,
            saturation = ?config.saturation,
            "CastDispatcher initialized"
        );

        Ok(Self {
            pool,
            scheduler,
            metrics,
            next_id: AtomicU64::new(1),
            shutdown: AtomicBool::new(false),
        })
    }

    /// Run `ability` off the simulation thread.
    ///
    /// Returns immediately unless the pool is saturated and the policy is
    /// `CallerRuns`, in which case the cast runs on this thread first.
    ///
    /// # Errors
    ///
    /// `DispatchError::ShutDown` after [`shutdown`](Self::shutdown);
    /// `DispatchError::QueueFull` when saturated under `Reject`.
    pub fn cast_async(&self, ability: Arc<dyn Ability>, context: CastContext) -> Result<CastHandle, DispatchError> {
        let (tx, rx) = oneshot::channel();
        let id = self.dispatch(ability, context, Delivery::Handle(tx))?;
        Ok(CastHandle { id, rx })
    }

    /// Run `ability` off the simulation thread, then show feedback through
    /// `presentation` on the simulation thread.
    ///
    /// # Errors
    ///
    /// Same as [`cast_async`](Self::cast_async).
    pub fn cast_async_with_callback(
        &self,
        ability: Arc<dyn Ability>,
        context: CastContext,
        presentation: Arc<dyn Presentation>,
    ) -> Result<CastId, DispatchError> {
        self.cast_async_with_completion(ability, context, presentation, |_, _| {})
    }

    /// Like [`cast_async_with_callback`](Self::cast_async_with_callback);
    /// afterwards, still on the simulation thread, calls `on_complete` with
    /// the outcome and the current tick.
    ///
    /// # Errors
    ///
    /// Same as [`cast_async`](Self::cast_async).
    pub fn cast_async_with_completion<F>(
        &self,
        ability: Arc<dyn Ability>,
        context: CastContext,
        presentation: Arc<dyn Presentation>,
        on_complete: F,
    ) -> Result<CastId, DispatchError>
    where
        F: FnOnce(&CastOutcome, Tick) + Send + 'static,
    {
        let scheduler = Arc::clone(&self.scheduler);
        let cancelled = self.pool.cancel_flag();

        let callback = move |outcome: CastOutcome| {
            if cancelled.load(Ordering::Acquire) {
                debug!(cast_id = outcome.cast_id, "Dispatcher cancelled, dropping cast callback");
                return;
            }
            let on_thread = Arc::clone(&scheduler);
            run_on_simulation(
                scheduler.as_ref(),
                Box::new(move || {
                    handle_cast_result(&outcome, presentation.as_ref());
                    on_complete(&outcome, on_thread.current_tick());
                }),
            );
        };

        self.dispatch(ability, context, Delivery::Callback(Box::new(callback)))
    }

    fn dispatch(&self, ability: Arc<dyn Ability>, context: CastContext, delivery: Delivery) -> Result<CastId, DispatchError> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(DispatchError::ShutDown);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let job = CastJob {
            id,
            ability,
            context,
            submitted_at: Instant::now(),
            delivery,
        };

        match self.pool.submit(job)? {
            Admission::Queued => {
                debug!(cast_id = id, "Cast submitted to worker pool");
                Ok(id)
            }
            Admission::Saturated(job) => match self.pool.config().saturation {
                SaturationPolicy::CallerRuns => {
                    debug!(cast_id = id, "Dispatcher saturated, running cast on caller thread");
                    execute(job, &self.metrics);
                    Ok(id)
                }
                SaturationPolicy::Reject => {
                    warn!(cast_id = id, "Dispatcher saturated, rejecting cast");
                    Err(DispatchError::QueueFull)
                }
            },
        }
    }

    /// Cast counters plus live worker and queue gauges.
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot(
            self.pool.active_workers(),
            self.pool.queue_depth(),
            self.pool.live_workers(),
        )
    }

    /// Zero the cast counters.
    pub fn reset_metrics(&self) {
        self.metrics.reset();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting casts and drain the pool.
    ///
    /// Waits up to `shutdown_grace` for queued and running casts to finish,
    /// then cancels whatever is still queued and waits up to
    /// `shutdown_force` for running casts. Workers still busy after that are
    /// detached. Idempotent.
    pub fn shutdown(&self) {
        if self.shutdown.swap(true, Ordering::AcqRel) {
            return;
        }

        info!("Shutting down CastDispatcher");
        self.pool.close();

        let config = self.pool.config();
        if !self.pool.await_termination(config.shutdown_grace()) {
            let dropped = self.pool.cancel_pending();
            warn!(
                dropped,
                grace_ms = config.shutdown_grace_ms,
                "Graceful drain timed out, cancelled queued casts"
            );
            if !self.pool.await_termination(config.shutdown_force()) {
                warn!(
                    busy_workers = self.pool.live_workers(),
                    "CastDispatcher did not terminate cleanly"
                );
            }
        }

        info!(total_casts = self.metrics.total_casts(), "CastDispatcher shut down");
    }
}

impl Drop for CastDispatcher {
    fn drop(&mut self) {
        // Signal shutdown but don't wait; explicit shutdown() drains gracefully.
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.pool.close();
            debug!("CastDispatcher dropped without explicit shutdown - workers will be detached");
        }
    }
}
