pub mod controller;
pub mod state;

pub use controller::TimerController;
pub use state::{normalize_interval, TimerState, TimerStatus, DEFAULT_INTERVAL_SECS};
