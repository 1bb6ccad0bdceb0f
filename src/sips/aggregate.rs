//! Hourly aggregation of the sip log for the chart.

use std::collections::BTreeMap;
use std::fmt::{Display, Write};

use chrono::{DateTime, FixedOffset, Local, Offset, TimeZone, Timelike};
use serde::Serialize;

use crate::models::SipRecord;

/// Number of most recent non-empty hours the chart keeps.
pub const MAX_BUCKETS: usize = 24;

const EMPTY_CHART: &str = "No data yet — logs will appear here.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HourBucket {
    /// Start of the hour in the zone the bucket was built in.
    pub start: DateTime<FixedOffset>,
    /// `HH:MM` display label. Ordering never looks at it.
    pub label: String,
    pub count: usize,
}

/// Bucket records by local wall-clock hour.
pub fn bucketize(records: &[SipRecord]) -> Vec<HourBucket> {
    bucketize_in(records, &Local)
}

/// Bucket records by wall-clock hour in `tz`, oldest first, keeping the last
/// [`MAX_BUCKETS`] non-empty hours.
pub fn bucketize_in<Tz>(records: &[SipRecord], tz: &Tz) -> Vec<HourBucket>
where
    Tz: TimeZone,
    Tz::Offset: Display,
{
    let mut hours: BTreeMap<i64, (DateTime<Tz>, usize)> = BTreeMap::new();

    for record in records {
        let local = record.recorded_at().with_timezone(tz);
        let Some(hour_start) = truncate_to_hour(local) else {
            continue;
        };
        hours
            .entry(hour_start.timestamp_millis())
            .or_insert_with(|| (hour_start, 0))
            .1 += 1;
    }

    let skip = hours.len().saturating_sub(MAX_BUCKETS);
    hours
        .into_values()
        .skip(skip)
        .map(|(start, count)| HourBucket {
            label: start.format("%H:%M").to_string(),
            start: start.with_timezone(&start.offset().fix()),
            count,
        })
        .collect()
}

fn truncate_to_hour<Tz: TimeZone>(value: DateTime<Tz>) -> Option<DateTime<Tz>> {
    value.with_minute(0)?.with_second(0)?.with_nanosecond(0)
}

/// Render buckets as horizontal bars scaled to `width` cells.
pub fn render_chart(buckets: &[HourBucket], width: usize) -> String {
    if buckets.is_empty() {
        return EMPTY_CHART.to_string();
    }

    let width = width.max(1);
    let max = buckets.iter().map(|b| b.count).max().unwrap_or(0).max(1);

    let mut out = String::new();
    for bucket in buckets {
        // Non-empty buckets always get at least one cell.
        let cells = ((bucket.count * width) / max).max(1);
        let _ = writeln!(
            out,
            "{} | {:<width$} {}",
            bucket.label,
            "█".repeat(cells),
            bucket.count,
            width = width
        );
    }
    out.truncate(out.trim_end().len());
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{SipId, SipMethod};
    use chrono::Utc;

    fn record_at(timestamp: DateTime<Utc>) -> SipRecord {
        SipRecord {
            id: SipId::generate(timestamp.timestamp_millis()),
            timestamp: timestamp.timestamp_millis(),
            method: SipMethod::Tap,
            volume_estimate: 30,
        }
    }

    fn utc(day: u32, hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, minute, 0).unwrap()
    }

    #[test]
    fn groups_records_by_hour() {
        let records = vec![
            record_at(utc(1, 9, 15)),
            record_at(utc(1, 9, 40)),
            record_at(utc(1, 10, 5)),
        ];

        let buckets = bucketize_in(&records, &Utc);

        assert_eq!(buckets.len(), 2);
        assert_eq!(buckets[0].label, "09:00");
        assert_eq!(buckets[0].count, 2);
        assert_eq!(buckets[0].start, utc(1, 9, 0));
        assert_eq!(buckets[1].label, "10:00");
        assert_eq!(buckets[1].count, 1);
    }

    #[test]
    fn orders_by_instant_across_midnight() {
        let records = vec![record_at(utc(1, 23, 30)), record_at(utc(2, 1, 10))];

        let buckets = bucketize_in(&records, &Utc);

        let labels: Vec<_> = buckets.iter().map(|b| b.label.as_str()).collect();
        assert_eq!(labels, vec!["23:00", "01:00"]);
    }

    #[test]
    fn keeps_only_the_latest_hours() {
        let start = utc(1, 0, 30);
        let records: Vec<_> = (0..30)
            .map(|h| record_at(start + chrono::Duration::hours(h)))
            .collect();

        let buckets = bucketize_in(&records, &Utc);

        assert_eq!(buckets.len(), MAX_BUCKETS);
        assert_eq!(buckets[0].start, utc(1, 6, 0));
        assert_eq!(buckets.last().unwrap().start, utc(2, 5, 0));
    }

    #[test]
    fn labels_follow_the_requested_zone() {
        let tz = FixedOffset::east_opt(5 * 3600 + 1800).unwrap();
        let records = vec![record_at(utc(1, 9, 15))];

        let buckets = bucketize_in(&records, &tz);

        assert_eq!(buckets[0].label, "14:00");
        assert_eq!(buckets[0].start.with_timezone(&Utc), utc(1, 8, 30));
    }

    #[test]
    fn empty_log_has_no_buckets() {
        assert!(bucketize_in(&[], &Utc).is_empty());
        assert_eq!(render_chart(&[], 10), EMPTY_CHART);
    }

    #[test]
    fn chart_scales_bars_to_the_busiest_hour() {
        let records = vec![
            record_at(utc(1, 9, 15)),
            record_at(utc(1, 9, 40)),
            record_at(utc(1, 9, 50)),
            record_at(utc(1, 9, 55)),
            record_at(utc(1, 10, 5)),
        ];
        let buckets = bucketize_in(&records, &Utc);

        let chart = render_chart(&buckets, 8);
        let lines: Vec<_> = chart.lines().collect();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].matches('█').count(), 8);
        assert!(lines[0].starts_with("09:00 | "));
        assert!(lines[0].ends_with(" 4"));
        assert_eq!(lines[1].matches('█').count(), 2);
        assert!(lines[1].ends_with(" 1"));
    }
}
