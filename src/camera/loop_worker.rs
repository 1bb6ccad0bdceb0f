use chrono::Utc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::models::{SipIntent, SipMethod};

use super::debounce::DebounceGate;
use super::detection::FrameDetection;
use super::strategy::DetectionStrategy;

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_error, log_info, log_warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CameraStats {
    pub frames: u64,
    pub malformed: u64,
    pub candidates: u64,
    pub admitted: u64,
}

/// Per-source detection state: the strategy plus its own debounce gate.
pub struct CameraWorker {
    strategy: Box<dyn DetectionStrategy>,
    gate: DebounceGate,
    volume_ml: u32,
}

impl CameraWorker {
    pub fn new(strategy: Box<dyn DetectionStrategy>, gate: DebounceGate, volume_ml: u32) -> Self {
        Self {
            strategy,
            gate,
            volume_ml,
        }
    }

    /// Returns an intent when the frame is a candidate that clears the gate.
    pub fn observe(
        &mut self,
        frame: &FrameDetection,
        now_ms: i64,
        stats: &mut CameraStats,
    ) -> Option<SipIntent> {
        stats.frames += 1;
        if !self.strategy.is_candidate(frame) {
            return None;
        }
        stats.candidates += 1;
        if !self.gate.admit(now_ms) {
            return None;
        }
        stats.admitted += 1;
        Some(SipIntent::new(SipMethod::Camera, self.volume_ml))
    }
}

/// Read JSON-line frames until the feed ends, the pipeline closes or the
/// token is cancelled. The reader is dropped on return, releasing the feed.
pub async fn camera_loop<R>(
    reader: R,
    mut worker: CameraWorker,
    intents: mpsc::Sender<SipIntent>,
    cancel_token: CancellationToken,
) -> CameraStats
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = CameraStats::default();

    log_info!(
        "camera loop started with {} strategy (cooldown {}ms)",
        worker.strategy.name(),
        worker.gate.cooldown_ms()
    );

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => {
                        log_info!("camera feed ended after {} frames", stats.frames);
                        break;
                    }
                    Err(err) => {
                        log_error!("camera feed read failed: {err}");
                        break;
                    }
                };

                if line.trim().is_empty() {
                    continue;
                }

                let frame = match serde_json::from_str::<FrameDetection>(&line) {
                    Ok(frame) => frame,
                    Err(err) => {
                        stats.malformed += 1;
                        log_warn!("skipping malformed detection frame: {err}");
                        continue;
                    }
                };

                let now_ms = Utc::now().timestamp_millis();
                let Some(intent) = worker.observe(&frame, now_ms, &mut stats) else {
                    log_debug!("frame {} produced no sip", stats.frames);
                    continue;
                };

                log_info!("camera sip admitted ({} so far)", stats.admitted);
                if intents.send(intent).await.is_err() {
                    log_warn!("sip pipeline closed, stopping camera loop");
                    break;
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("camera loop shutting down");
                break;
            }
        }
    }

    stats
}
