//! Reference simulation schedulers.

pub mod manual;
#[cfg(feature = "tokio-runtime")]
pub mod tick_loop;

pub use manual::ManualScheduler;
#[cfg(feature = "tokio-runtime")]
pub use tick_loop::TickLoop;
