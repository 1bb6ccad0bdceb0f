pub mod controller;
pub mod debounce;
pub mod detection;
pub mod feed;
pub mod loop_worker;
pub mod strategy;

pub use controller::CameraController;
pub use debounce::{DebounceGate, DEFAULT_COOLDOWN_MS};
pub use detection::{DetectedObject, FrameDetection, Landmark};
pub use feed::FeedSource;
pub use loop_worker::CameraStats;
pub use strategy::{DetectionStrategy, StrategyKind};
