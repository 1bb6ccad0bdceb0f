//! Single consumer that turns source intents into log appends.
//!
//! Timer and camera sources only hold a sender, so the order of appends is the
//! order intents arrive on the channel.

use log::{error, info};
use tokio::sync::mpsc;

use crate::models::SipIntent;
use crate::sips::SharedSipLog;

pub const INTENT_CHANNEL_CAPACITY: usize = 64;

pub fn intent_channel() -> (mpsc::Sender<SipIntent>, mpsc::Receiver<SipIntent>) {
    mpsc::channel(INTENT_CHANNEL_CAPACITY)
}

/// Append every received intent until all senders are gone. Returns the
/// number of records appended.
pub async fn run_pipeline(mut intents: mpsc::Receiver<SipIntent>, log: SharedSipLog) -> usize {
    let mut appended = 0;

    while let Some(intent) = intents.recv().await {
        let mut guard = log.lock().await;
        match guard.append(intent.method, intent.volume_ml).await {
            Ok(record) => {
                appended += 1;
                info!(
                    "Logged {} sip (~{} ml), {} in history",
                    record.method,
                    record.volume_estimate,
                    guard.len()
                );
            }
            Err(err) => error!("Failed to log {} sip: {err:#}", intent.method),
        }
    }

    info!("Sip pipeline closed after {appended} appends");
    appended
}
