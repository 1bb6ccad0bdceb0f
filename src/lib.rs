pub mod camera;
pub mod db;
pub mod models;
pub mod pipeline;
pub mod settings;
pub mod sips;
pub mod timer;

mod cli;
mod utils;

use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
};

use camera::{CameraController, CameraStats, FeedSource, StrategyKind};
use db::{Database, DB_FILE_NAME};
use models::{SipIntent, SipMethod, SipRecord};
use pipeline::{intent_channel, run_pipeline};
use settings::{SettingsStore, SETTINGS_FILE_NAME};
use sips::{SharedSipLog, SipLog};
use timer::TimerController;

/// One application session: the sip log plus every signal source feeding it.
pub struct AppState {
    data_dir: PathBuf,
    pub db: Database,
    pub log: SharedSipLog,
    pub settings: SettingsStore,
    pub timer: TimerController,
    camera: Mutex<CameraController>,
    intents: mpsc::Sender<SipIntent>,
    pipeline: JoinHandle<usize>,
}

/// What a session logged between [`AppState::open`] and [`AppState::shutdown`]
/// through its timer and camera sources.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    pub appended: usize,
    pub timer_ticks: u64,
    pub camera: Option<CameraStats>,
}

impl AppState {
    pub async fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("failed to create data directory {}", data_dir.display()))?;

        let db = Database::new(data_dir.join(DB_FILE_NAME))?;
        let settings = SettingsStore::new(data_dir.join(SETTINGS_FILE_NAME))?;
        let log: SharedSipLog = Arc::new(Mutex::new(SipLog::load(db.clone()).await));

        let (intents, intent_rx) = intent_channel();
        let pipeline = tokio::spawn(run_pipeline(intent_rx, log.clone()));
        let timer = TimerController::new(intents.clone(), settings.current().volume_estimate_ml);

        Ok(Self {
            data_dir: data_dir.to_path_buf(),
            db,
            log,
            settings,
            timer,
            camera: Mutex::new(CameraController::new()),
            intents,
            pipeline,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Log a manual sip. Taps skip the debounce gate.
    pub async fn tap(&self, volume_ml: Option<u32>) -> Result<SipRecord> {
        let volume_ml = volume_ml.unwrap_or_else(|| self.settings.current().volume_estimate_ml);
        self.log.lock().await.append(SipMethod::Tap, volume_ml).await
    }

    pub async fn start_timer(&self, interval: Duration) -> Result<()> {
        self.timer.start(interval).await.map(|_| ())
    }

    /// Turn camera detection on. An unavailable feed is logged and leaves
    /// detection off; it never fails the session.
    pub async fn enable_camera(&self, source: &FeedSource, strategy: Option<StrategyKind>) -> bool {
        let settings = self.settings.current();
        let mut camera_settings = settings.camera;
        if let Some(strategy) = strategy {
            camera_settings.strategy = strategy;
        }

        let mut camera = self.camera.lock().await;
        match camera
            .enable(
                source,
                &camera_settings,
                settings.volume_estimate_ml,
                self.intents.clone(),
            )
            .await
        {
            Ok(()) => true,
            Err(err) => {
                error!("Camera detection unavailable: {err:#}");
                false
            }
        }
    }

    pub async fn disable_camera(&self) -> Result<Option<CameraStats>> {
        self.camera.lock().await.disable().await
    }

    pub async fn camera_active(&self) -> bool {
        self.camera.lock().await.is_active()
    }

    /// Stop every source, let the pipeline drain and report what was logged.
    pub async fn shutdown(self) -> Result<SessionReport> {
        let AppState {
            timer,
            camera,
            intents,
            pipeline,
            ..
        } = self;

        let timer_ticks = timer.stop().await.ticks;
        let camera = camera.into_inner().disable().await?;

        drop(intents);
        drop(timer);

        let appended = pipeline.await.context("sip pipeline task failed")?;
        info!("Session closed, {appended} sips logged by timer and camera");

        Ok(SessionReport {
            appended,
            timer_ticks,
            camera,
        })
    }
}

fn init_logging() {
    let debug_mode = std::env::var("SIP_COUNTER_DEBUG")
        .map(|value| value == "1" || value.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    let default_level = if debug_mode { "debug" } else { "info" };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();
}

pub fn run() -> Result<()> {
    let args = cli::Cli::parse();
    init_logging();

    let runtime = tokio::runtime::Runtime::new().context("failed to start tokio runtime")?;
    runtime.block_on(cli::execute(args))
}
