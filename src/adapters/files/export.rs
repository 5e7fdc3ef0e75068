use std::fs::File;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::application::DayRecord;

/// Write one row per simulated day (prices, spread stats, P&L, bankroll)
pub fn write_days_csv<P: AsRef<Path>>(days: &[DayRecord], path: P) -> Result<()> {
    let file = File::create(&path)
        .with_context(|| format!("Failed to create file: {:?}", path.as_ref()))?;
    let mut writer = csv::Writer::from_writer(file);

    for day in days {
        writer.serialize(day)?;
    }

    writer.flush()?;
    Ok(())
}

/// Pretty-print any serializable value to a JSON file
pub fn write_json<T: Serialize, P: AsRef<Path>>(value: &T, path: P) -> Result<()> {
    let file = File::create(&path)
        .with_context(|| format!("Failed to create file: {:?}", path.as_ref()))?;
    serde_json::to_writer_pretty(file, value)?;
    Ok(())
}
