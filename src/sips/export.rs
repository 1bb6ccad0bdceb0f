use std::{fs, path::Path};

use anyhow::{Context, Result};
use chrono::SecondsFormat;

use crate::models::SipRecord;

pub const CSV_HEADER: &str = "id,timestamp,iso,method,volumeEstimate";
pub const DEFAULT_EXPORT_FILE: &str = "sips.csv";

/// Serialize the log as CSV, oldest record first. Rows are joined with `\n`
/// and the output has no trailing newline.
pub fn to_csv(records: &[SipRecord]) -> String {
    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(CSV_HEADER.to_string());
    for record in records {
        lines.push(format!(
            "{},{},{},{},{}",
            record.id,
            record.timestamp,
            record
                .recorded_at()
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            record.method,
            record.volume_estimate
        ));
    }
    lines.join("\n")
}

/// Write the CSV export to `path`, returning the number of rows written.
pub fn export_to_file(records: &[SipRecord], path: &Path) -> Result<usize> {
    fs::write(path, to_csv(records))
        .with_context(|| format!("failed to write export to {}", path.display()))?;
    Ok(records.len())
}
