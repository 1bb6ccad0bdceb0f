use std::{sync::Arc, time::Duration};

use anyhow::{bail, Result};
use chrono::Utc;
use log::{info, warn};
use tokio::{
    sync::{mpsc, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};

use crate::models::{SipIntent, SipMethod};

use super::{TimerState, TimerStatus, DEFAULT_INTERVAL_SECS};

/// Auto-logging timer. At most one ticker runs per controller; it emits a
/// `timer` intent every interval, the first one interval after start.
#[derive(Clone)]
pub struct TimerController {
    state: Arc<Mutex<TimerState>>,
    ticker: Arc<Mutex<Option<JoinHandle<()>>>>,
    intents: mpsc::Sender<SipIntent>,
    volume_ml: u32,
}

impl TimerController {
    pub fn new(intents: mpsc::Sender<SipIntent>, volume_ml: u32) -> Self {
        Self {
            state: Arc::new(Mutex::new(TimerState::new())),
            ticker: Arc::new(Mutex::new(None)),
            intents,
            volume_ml,
        }
    }

    pub async fn snapshot(&self) -> TimerState {
        self.state.lock().await.clone()
    }

    pub async fn is_running(&self) -> bool {
        self.state.lock().await.is_running()
    }

    /// Start ticking. A zero interval falls back to the default 5 seconds.
    pub async fn start(&self, interval: Duration) -> Result<TimerState> {
        let interval = if interval.is_zero() {
            info!("Timer interval must be positive, using {DEFAULT_INTERVAL_SECS}s");
            Duration::from_secs_f64(DEFAULT_INTERVAL_SECS)
        } else {
            interval
        };

        {
            let mut state = self.state.lock().await;
            if state.status != TimerStatus::Idle {
                bail!("timer already running");
            }
            state.begin(interval, Utc::now());
        }

        self.spawn_ticker(interval).await;
        info!("Timer started, logging a sip every {:.1}s", interval.as_secs_f64());

        Ok(self.snapshot().await)
    }

    /// Cancel the ticker. Stopping an idle timer is a no-op.
    pub async fn stop(&self) -> TimerState {
        let last = {
            let mut state = self.state.lock().await;
            let last = state.clone();
            state.stop();
            last
        };

        self.cancel_ticker().await;

        if last.is_running() {
            info!("Timer stopped after {} ticks", last.ticks);
        }
        last
    }

    async fn spawn_ticker(&self, period: Duration) {
        let mut ticker_guard = self.ticker.lock().await;
        if let Some(handle) = ticker_guard.take() {
            handle.abort();
        }

        let state = self.state.clone();
        let intents = self.intents.clone();
        let volume_ml = self.volume_ml;

        let handle = tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                interval.tick().await;

                {
                    let mut guard = state.lock().await;
                    if guard.status != TimerStatus::Running {
                        break;
                    }
                    guard.record_tick();
                }

                if intents
                    .send(SipIntent::new(SipMethod::Timer, volume_ml))
                    .await
                    .is_err()
                {
                    warn!("Sip pipeline closed, stopping timer");
                    state.lock().await.stop();
                    break;
                }
            }
        });

        *ticker_guard = Some(handle);
    }

    async fn cancel_ticker(&self) {
        let handle = self.ticker.lock().await.take();
        if let Some(handle) = handle {
            handle.abort();
            // Wait for the task to be dropped so its sender is released.
            let _ = handle.await;
        }
    }
}
