use std::path::Path;

use csv::WriterBuilder;
use tracing::info;

use crate::error::Result;
use crate::schedule::calendar::weekday_label;
use crate::schedule::ScaleEntry;

const HEADER: [&str; 12] = [
    "id",
    "date",
    "day",
    "start",
    "end",
    "function",
    "member_id",
    "member_number",
    "member_name",
    "confirmed",
    "scale_type",
    "active",
];

/// Exports roster entries to a CSV file, overwriting any existing file
pub fn export_roster_to_csv<P: AsRef<Path>>(entries: &[ScaleEntry], csv_path: P) -> Result<()> {
    let path = csv_path.as_ref();
    let mut wtr = WriterBuilder::new().has_headers(false).from_path(path)?;

    wtr.write_record(HEADER)?;
    for entry in entries {
        wtr.write_record(&[
            entry.id.to_string(),
            entry.date.format("%Y-%m-%d").to_string(),
            weekday_label(entry.day).to_string(),
            entry.time_window.start.clone(),
            entry.time_window.end.clone(),
            entry.function.to_string(),
            entry.member_id.clone(),
            entry.member_number.clone(),
            entry.member_name.clone(),
            entry.confirmed.to_string(),
            entry.scale_type.as_str().to_string(),
            entry.active.to_string(),
        ])?;
    }

    wtr.flush()?;
    info!(path = %path.display(), entries = entries.len(), "Roster exported");
    Ok(())
}
