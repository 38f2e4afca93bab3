use crate::models::{Config, Record, ResultSet, COLUMNS};
use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use csv::{ReaderBuilder, WriterBuilder};
use std::fs;
use std::path::{Path, PathBuf};

/// Where this run's CSV goes: `output_file` if set, otherwise a
/// timestamped file (`2024-05-01T1430.csv`) in the output directory.
pub fn output_path(config: &Config, now: DateTime<Local>) -> PathBuf {
    if let Some(file) = &config.output_file {
        return PathBuf::from(file);
    }

    let dir = config.output_directory.as_deref().unwrap_or("output");
    Path::new(dir).join(format!("{}.csv", now.format("%Y-%m-%dT%H%M")))
}

/// Write the header and every record, directory rows first.
pub fn write_records(path: &Path, results: &ResultSet) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }

    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to create CSV file: {}", path.display()))?;

    writer.write_record(COLUMNS)?;
    for record in results.iter() {
        writer.write_record(record.columns())?;
    }

    writer.flush()?;
    Ok(())
}

pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let mut reader = ReaderBuilder::new()
        .from_path(path)
        .with_context(|| format!("Failed to open CSV file: {}", path.display()))?;

    let mut records = Vec::new();
    for row in reader.deserialize() {
        records.push(row?);
    }
    Ok(records)
}
