use anyhow::{bail, Context, Result};
use log::info;
use tokio::io::AsyncBufRead;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::models::SipIntent;
use crate::settings::CameraSettings;

use super::debounce::DebounceGate;
use super::feed::FeedSource;
use super::loop_worker::{camera_loop, CameraStats, CameraWorker};

/// Owns the camera detection task. The feed is held by that task, so
/// disabling detection releases it.
pub struct CameraController {
    handle: Option<JoinHandle<CameraStats>>,
    cancel_token: Option<CancellationToken>,
}

impl CameraController {
    pub fn new() -> Self {
        Self {
            handle: None,
            cancel_token: None,
        }
    }

    /// True while the detection task is still consuming frames.
    pub fn is_active(&self) -> bool {
        self.handle
            .as_ref()
            .map_or(false, |handle| !handle.is_finished())
    }

    pub async fn enable(
        &mut self,
        source: &FeedSource,
        settings: &CameraSettings,
        volume_ml: u32,
        intents: mpsc::Sender<SipIntent>,
    ) -> Result<()> {
        self.reap_finished().await?;
        if self.handle.is_some() {
            bail!("camera detection already active");
        }

        let reader = source.open().await?;
        info!("Camera detection reading frames from {source}");
        self.enable_with_reader(reader, settings, volume_ml, intents)
    }

    pub fn enable_with_reader<R>(
        &mut self,
        reader: R,
        settings: &CameraSettings,
        volume_ml: u32,
        intents: mpsc::Sender<SipIntent>,
    ) -> Result<()>
    where
        R: AsyncBufRead + Send + Unpin + 'static,
    {
        if self.is_active() {
            bail!("camera detection already active");
        }
        if let Some(handle) = self.handle.take() {
            info!("Replacing finished camera task");
            handle.abort();
        }

        let strategy = settings
            .strategy
            .build(settings.tilt_threshold, settings.bottle_min_score);
        let worker = CameraWorker::new(strategy, DebounceGate::new(settings.cooldown_ms), volume_ml);

        let cancel_token = CancellationToken::new();
        let handle = tokio::spawn(camera_loop(reader, worker, intents, cancel_token.clone()));

        self.handle = Some(handle);
        self.cancel_token = Some(cancel_token);
        Ok(())
    }

    /// Collect a task whose feed already ended so detection can be enabled again.
    async fn reap_finished(&mut self) -> Result<()> {
        let finished = self
            .handle
            .as_ref()
            .map_or(false, |handle| handle.is_finished());
        if finished {
            self.disable().await?;
        }
        Ok(())
    }

    /// Stop detection and wait for the task. Returns its stats if it was running.
    pub async fn disable(&mut self) -> Result<Option<CameraStats>> {
        if let Some(token) = self.cancel_token.take() {
            token.cancel();
        }

        if let Some(handle) = self.handle.take() {
            let stats = handle.await.context("camera loop task failed to join")?;
            info!(
                "Camera detection stopped: {} frames, {} candidates, {} admitted",
                stats.frames, stats.candidates, stats.admitted
            );
            Ok(Some(stats))
        } else {
            Ok(None)
        }
    }
}

impl Default for CameraController {
    fn default() -> Self {
        Self::new()
    }
}
