use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::{bail, Context, Result};

use super::model::Measurement;

/// Write records to `.csv` (header `datetime,lat,lon,o3`) or `.json`.
///
/// Returns the number of records written. The CSV output is readable again
/// through the compact column layout.
pub fn write_records<'a>(
    path: &Path,
    records: impl IntoIterator<Item = &'a Measurement>,
) -> Result<usize> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let written = match ext.as_str() {
        "csv" => write_csv(path, records)?,
        "json" => write_json(path, records)?,
        other => bail!("Unsupported export extension: .{other}"),
    };
    log::info!("Exported {written} measurements to {}", path.display());
    Ok(written)
}

fn write_csv<'a>(path: &Path, records: impl IntoIterator<Item = &'a Measurement>) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    let mut n = 0;
    for m in records {
        writer.serialize(m).with_context(|| format!("writing record {n}"))?;
        n += 1;
    }
    writer.flush().context("flushing CSV file")?;
    Ok(n)
}

fn write_json<'a>(path: &Path, records: impl IntoIterator<Item = &'a Measurement>) -> Result<usize> {
    let records: Vec<&Measurement> = records.into_iter().collect();
    let file = File::create(path).context("creating JSON file")?;
    serde_json::to_writer_pretty(BufWriter::new(file), &records).context("writing JSON")?;
    Ok(records.len())
}
