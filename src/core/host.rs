//! Collaborator seams supplied by the host game server.
//!
//! The engine never owns the simulation thread. It asks the host to run work
//! there through [`SimulationScheduler`] and to show feedback through
//! [`Presentation`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::util::clock::Tick;
use crate::util::ids::ActorId;

/// One-shot task for the simulation thread.
pub type SimulationTask = Box<dyn FnOnce() + Send + 'static>;

/// Repeating task; receives the tick it runs on.
pub type PeriodicTask = Box<dyn FnMut(Tick) + Send + 'static>;

/// Access to the host's single-threaded simulation loop.
pub trait SimulationScheduler: Send + Sync {
    /// Queue `task` to run on the simulation thread. Tasks from one
    /// submitter run in submission order.
    fn run_on_simulation_thread(&self, task: SimulationTask);

    /// Run `task` on the simulation thread every `period` ticks, starting
    /// after `initial_delay` ticks.
    fn run_periodic(&self, task: PeriodicTask, initial_delay: Tick, period: Tick) -> PeriodicHandle;

    /// Whether the calling thread is the simulation thread.
    fn is_simulation_thread(&self) -> bool;

    /// Current simulation tick.
    fn current_tick(&self) -> Tick;
}

/// Run `task` now if already on the simulation thread, otherwise queue it.
pub fn run_on_simulation<S>(scheduler: &S, task: SimulationTask)
where
    S: SimulationScheduler + ?Sized,
{
    if scheduler.is_simulation_thread() {
        task();
    } else {
        scheduler.run_on_simulation_thread(task);
    }
}

/// Cancellation handle for a periodic task.
#[derive(Debug, Clone, Default)]
pub struct PeriodicHandle {
    cancelled: Arc<AtomicBool>,
}

impl PeriodicHandle {
    /// New, not-yet-cancelled handle.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop future runs. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    /// Whether [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Player-facing feedback. Called only from the simulation thread.
pub trait Presentation: Send + Sync {
    /// Show success feedback identified by a message key.
    fn show_success(&self, actor: ActorId, message_key: &str);

    /// Show failure feedback identified by a message key.
    fn show_failure(&self, actor: ActorId, message_key: &str);

    /// Show a short text on the actor's action bar.
    fn show_action_bar_message(&self, actor: ActorId, text: &str);

    /// Whether the actor is still around to receive feedback.
    fn is_reachable(&self, actor: ActorId) -> bool {
        let _ = actor;
        true
    }
}
