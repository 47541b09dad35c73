//! Tests for the reference schedulers

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use spellcast_engine::core::SimulationScheduler;
use spellcast_engine::runtime::{ManualScheduler, TickLoop};

#[test]
fn test_manual_scheduler_advance() {
    let scheduler = ManualScheduler::new();
    assert_eq!(scheduler.current_tick(), 0);
    assert_eq!(scheduler.advance(20), 20);
    assert_eq!(scheduler.current_tick(), 20);
}

#[test]
fn test_tick_loop_drives_scheduler() {
    let scheduler = Arc::new(ManualScheduler::new());
    let on_sim_thread = Arc::new(AtomicU64::new(0));

    let tick_loop = TickLoop::with_period(scheduler.clone(), Duration::from_millis(5)).unwrap();

    let flag = Arc::clone(&on_sim_thread);
    let sim = Arc::clone(&scheduler);
    scheduler.run_on_simulation_thread(Box::new(move || {
        if sim.is_simulation_thread() {
            flag.store(1, Ordering::SeqCst);
        }
    }));

    let deadline = Instant::now() + Duration::from_secs(5);
    while scheduler.current_tick() < 5 || on_sim_thread.load(Ordering::SeqCst) == 0 {
        assert!(Instant::now() < deadline, "tick loop did not advance");
        std::thread::sleep(Duration::from_millis(5));
    }

    tick_loop.stop();
    let stopped_at = scheduler.current_tick();
    std::thread::sleep(Duration::from_millis(30));
    assert_eq!(scheduler.current_tick(), stopped_at);
    assert!(!scheduler.is_simulation_thread());
}
