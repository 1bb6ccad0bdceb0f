use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::db::Database;
use crate::models::{SipId, SipMethod, SipRecord, DEFAULT_VOLUME_ML};

use super::aggregate::{bucketize, HourBucket};

/// Storage key holding the serialized log.
pub const SIPS_KEY: &str = "sips";
pub const CLEAR_PROMPT: &str = "Clear all sip history?";

pub type SharedSipLog = Arc<Mutex<SipLog>>;

/// Blocking yes/no prompt gating destructive operations.
pub trait Confirm {
    fn confirm(&self, prompt: &str) -> bool;
}

impl<F> Confirm for F
where
    F: Fn(&str) -> bool,
{
    fn confirm(&self, prompt: &str) -> bool {
        self(prompt)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SipSummary {
    pub total: usize,
    pub total_ml: u64,
    pub tap: usize,
    pub timer: usize,
    pub camera: usize,
}

/// Append-only sip log, persisted in full under [`SIPS_KEY`] on every mutation.
pub struct SipLog {
    db: Database,
    records: Vec<SipRecord>,
    revision: u64,
    hourly_cache: Option<(u64, Vec<HourBucket>)>,
}

impl SipLog {
    /// Load the persisted log. Missing or unreadable data yields an empty log.
    pub async fn load(db: Database) -> Self {
        let records = match db.kv_get(SIPS_KEY).await {
            Ok(Some(raw)) => match serde_json::from_str::<Vec<SipRecord>>(&raw) {
                Ok(records) => records,
                Err(err) => {
                    warn!("Stored sip log is unreadable, starting empty: {err}");
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                warn!("Failed to read stored sip log, starting empty: {err:#}");
                Vec::new()
            }
        };

        info!("Loaded {} sips from {}", records.len(), db.path().display());

        Self {
            db,
            records,
            revision: 0,
            hourly_cache: None,
        }
    }

    pub async fn append(&mut self, method: SipMethod, volume_ml: u32) -> Result<SipRecord> {
        let volume_estimate = if volume_ml == 0 {
            warn!("Ignoring zero volume for {method} sip, using {DEFAULT_VOLUME_ML} ml");
            DEFAULT_VOLUME_ML
        } else {
            volume_ml
        };

        // Timestamps never go backwards, even if the wall clock does.
        let now = Utc::now().timestamp_millis();
        let timestamp = self
            .records
            .last()
            .map_or(now, |last| now.max(last.timestamp));

        let mut id = SipId::generate(timestamp);
        while self.id_taken(id, timestamp) {
            id = SipId::generate(timestamp);
        }

        let record = SipRecord {
            id,
            timestamp,
            method,
            volume_estimate,
        };
        self.records.push(record.clone());
        self.revision += 1;

        self.persist()
            .await
            .with_context(|| format!("failed to persist {method} sip"))?;

        Ok(record)
    }

    /// Empty the log if `confirm` agrees. Returns whether the log was cleared.
    pub async fn clear<C>(&mut self, confirm: &C) -> Result<bool>
    where
        C: Confirm + ?Sized,
    {
        if !confirm.confirm(CLEAR_PROMPT) {
            info!("Clear declined, keeping {} sips", self.records.len());
            return Ok(false);
        }

        let removed = self.records.len();
        self.records = Vec::new();
        self.revision += 1;
        self.persist().await.context("failed to persist cleared log")?;

        info!("Cleared {removed} sips");
        Ok(true)
    }

    pub fn records(&self) -> &[SipRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Bumped on every mutation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Newest records first.
    pub fn recent(&self, limit: usize) -> impl Iterator<Item = &SipRecord> {
        self.records.iter().rev().take(limit)
    }

    /// Hourly buckets, recomputed only when the log changed since the last call.
    pub fn hourly(&mut self) -> &[HourBucket] {
        let stale = self
            .hourly_cache
            .as_ref()
            .map_or(true, |(revision, _)| *revision != self.revision);
        if stale {
            self.hourly_cache = Some((self.revision, bucketize(&self.records)));
        }

        self.hourly_cache
            .as_ref()
            .map(|(_, buckets)| buckets.as_slice())
            .unwrap_or(&[])
    }

    pub fn summary(&self) -> SipSummary {
        let mut summary = SipSummary::default();
        for record in &self.records {
            summary.total += 1;
            summary.total_ml += u64::from(record.volume_estimate);
            match record.method {
                SipMethod::Tap => summary.tap += 1,
                SipMethod::Timer => summary.timer += 1,
                SipMethod::Camera => summary.camera += 1,
            }
        }
        summary
    }

    // Only records from the same millisecond can share an id.
    fn id_taken(&self, id: SipId, timestamp: i64) -> bool {
        self.records
            .iter()
            .rev()
            .take_while(|record| record.timestamp == timestamp)
            .any(|record| record.id == id)
    }

    async fn persist(&self) -> Result<()> {
        let payload = serde_json::to_string(&self.records).context("failed to serialize sips")?;
        self.db.kv_put(SIPS_KEY, payload).await.map_err(|err| {
            error!("Failed to save sip log ({} records): {err:#}", self.records.len());
            err
        })
    }
}
