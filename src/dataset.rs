use crate::{
    sample::{Sample, SampleSeries},
    util::{ensure_parent, format_timestamp, parse_timestamp},
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// One CSV row; column names match the bench log export.
#[derive(Debug, Serialize, Deserialize)]
struct Row {
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "RPM")]
    rpm: f64,
    #[serde(rename = "Oil_Pressure_bar")]
    oil_pressure: f64,
}

/// Writes the series as CSV, replacing any existing file.
pub fn write_csv(series: &SampleSeries, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let mut w = csv::Writer::from_path(path)
        .with_context(|| format!("create data file: {}", path.display()))?;
    if series.is_empty() {
        w.write_record(["Timestamp", "RPM", "Oil_Pressure_bar"])?;
    }
    for s in series {
        w.serialize(Row {
            timestamp: format_timestamp(s.timestamp),
            rpm: s.rpm,
            oil_pressure: s.oil_pressure,
        })
        .with_context(|| format!("write data file: {}", path.display()))?;
    }
    w.flush()
        .with_context(|| format!("flush data file: {}", path.display()))?;
    info!("data written rows={} path={}", series.len(), path.display());
    Ok(())
}

/// Loads a bench log. Malformed rows, non-finite values and out-of-order
/// timestamps are rejected.
pub fn read_csv(path: &Path) -> Result<SampleSeries> {
    let mut r = csv::Reader::from_path(path)
        .with_context(|| format!("open data file: {}", path.display()))?;
    let mut samples = Vec::new();
    for (i, row) in r.deserialize::<Row>().enumerate() {
        // +2: header line, 1-based
        let line = i + 2;
        let row = row.with_context(|| format!("{}:{line}: malformed row", path.display()))?;
        let timestamp = parse_timestamp(&row.timestamp)
            .with_context(|| format!("{}:{line}", path.display()))?;
        samples.push(Sample {
            timestamp,
            rpm: row.rpm,
            oil_pressure: row.oil_pressure,
        });
    }
    let series = SampleSeries::new(samples)
        .with_context(|| format!("invalid data file: {}", path.display()))?;
    info!("data loaded rows={} path={}", series.len(), path.display());
    Ok(series)
}
