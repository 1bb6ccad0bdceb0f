//! Sip data models.
//!
//! A `SipRecord` is one logged drinking event. Records are serialized with the
//! same field names the persisted log and CSV export use (`volumeEstimate`,
//! lowercase method tags).

use std::fmt;

use chrono::{DateTime, TimeZone, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Estimated volume of a single sip in millilitres. Not measured.
pub const DEFAULT_VOLUME_ML: u32 = 30;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SipMethod {
    Tap,
    Timer,
    Camera,
}

impl SipMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            SipMethod::Tap => "tap",
            SipMethod::Timer => "timer",
            SipMethod::Camera => "camera",
        }
    }
}

impl fmt::Display for SipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record identifier: creation time in milliseconds plus a random fraction in
/// `[0, 1)` so two records created in the same millisecond still differ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SipId(f64);

impl SipId {
    pub fn generate(timestamp_ms: i64) -> Self {
        let tiebreaker: f64 = rand::thread_rng().gen();
        Self(timestamp_ms as f64 + tiebreaker)
    }

    pub fn from_raw(value: f64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for SipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SipRecord {
    pub id: SipId,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
    pub method: SipMethod,
    pub volume_estimate: u32,
}

impl SipRecord {
    pub fn recorded_at(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.timestamp)
            .single()
            .unwrap_or_default()
    }
}

/// A signal source's request to log one sip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SipIntent {
    pub method: SipMethod,
    pub volume_ml: u32,
}

impl SipIntent {
    pub fn new(method: SipMethod, volume_ml: u32) -> Self {
        Self { method, volume_ml }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_uses_persisted_field_names() {
        let record = SipRecord {
            id: SipId::from_raw(1.5),
            timestamp: 1_700_000_000_000,
            method: SipMethod::Timer,
            volume_estimate: 30,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], 1.5);
        assert_eq!(json["timestamp"], 1_700_000_000_000i64);
        assert_eq!(json["method"], "timer");
        assert_eq!(json["volumeEstimate"], 30);
    }

    #[test]
    fn accepts_integer_and_fractional_ids() {
        let raw = r#"[
            {"id":1,"timestamp":0,"method":"tap","volumeEstimate":30},
            {"id":1700000000000.4321,"timestamp":1700000000000,"method":"camera","volumeEstimate":30}
        ]"#;

        let records: Vec<SipRecord> = serde_json::from_str(raw).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].id.to_string(), "1");
        assert_eq!(records[1].method, SipMethod::Camera);
    }

    #[test]
    fn generated_id_stays_within_its_millisecond() {
        let id = SipId::generate(42);
        assert!(id.value() >= 42.0);
        assert!(id.value() < 43.0);
    }

    #[test]
    fn unknown_method_is_rejected() {
        let raw = r#"{"id":1,"timestamp":0,"method":"guess","volumeEstimate":30}"#;
        assert!(serde_json::from_str::<SipRecord>(raw).is_err());
    }
}
