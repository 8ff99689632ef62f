use std::fs::File;
use std::path::Path;

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::datatypes::{
    DataType, Float32Type, Float64Type, TimeUnit, TimestampMicrosecondType,
    TimestampMillisecondType, TimestampNanosecondType, TimestampSecondType,
};
use arrow::record_batch::RecordBatch;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use serde::Deserialize;

use super::error::{DataError, DataResult};
use super::model::{Dataset, Measurement};

// ---------------------------------------------------------------------------
// Column layout
// ---------------------------------------------------------------------------

/// Positional indices of the four consumed CSV columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ColumnLayout {
    pub datetime: usize,
    pub lat: usize,
    pub lon: usize,
    pub o3: usize,
}

impl ColumnLayout {
    /// Layout of the raw station export (columns 0, 4, 5 and 18).
    pub const SOURCE: ColumnLayout = ColumnLayout {
        datetime: 0,
        lat: 4,
        lon: 5,
        o3: 18,
    };

    /// Layout written by [`crate::data::export`]: `datetime,lat,lon,o3`.
    pub const COMPACT: ColumnLayout = ColumnLayout {
        datetime: 0,
        lat: 1,
        lon: 2,
        o3: 3,
    };

    /// Minimum number of fields a row needs under this layout.
    pub fn width(&self) -> usize {
        self.datetime.max(self.lat).max(self.lon).max(self.o3) + 1
    }

    /// A four-field header can only be the compact layout; anything else
    /// uses the configured one.
    fn for_header(header_len: usize, configured: ColumnLayout) -> ColumnLayout {
        if header_len == 4 {
            ColumnLayout::COMPACT
        } else {
            configured
        }
    }
}

impl Default for ColumnLayout {
    fn default() -> Self {
        ColumnLayout::SOURCE
    }
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a measurement dataset from a file. Dispatch by extension.
///
/// Supported formats:
/// * `.csv`     – header row skipped, columns picked positionally by `layout`
/// * `.parquet` – columns named `datetime`, `lat`, `lon`, `o3`
/// * `.json`    – `[{ "datetime": "...", "lat": .., "lon": .., "o3": .. }, ...]`
///
/// `max_rows` keeps only the first rows of the file.
pub fn load_file(path: &Path, layout: ColumnLayout, max_rows: Option<usize>) -> DataResult<Dataset> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    if let Some(n) = max_rows {
        log::info!("Reading at most {n} rows from {}", path.display());
    }
    let dataset = match ext.as_str() {
        "csv" => load_csv(path, layout, max_rows)?,
        "parquet" | "pq" => load_parquet(path, max_rows)?,
        "json" => load_json(path, max_rows)?,
        other => return Err(DataError::UnsupportedExtension(other.to_string())),
    };

    log::info!(
        "Loaded {} measurements ({} distinct timestamps) from {}",
        dataset.len(),
        dataset.timestamps().len(),
        path.display()
    );
    Ok(dataset)
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

fn load_csv(path: &Path, layout: ColumnLayout, max_rows: Option<usize>) -> DataResult<Dataset> {
    let file = File::open(path).map_err(|e| DataError::Open(path.to_path_buf(), e))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(file);

    let header_len = reader
        .headers()
        .map_err(|source| DataError::Csv { row: 0, source })?
        .len();
    let layout = ColumnLayout::for_header(header_len, layout);
    let width = layout.width();

    let mut records = Vec::new();
    let limit = max_rows.unwrap_or(usize::MAX);
    for (i, result) in reader.records().take(limit).enumerate() {
        let row = i + 1;
        let record = result.map_err(|source| DataError::Csv { row, source })?;
        if record.len() < width {
            return Err(DataError::MissingColumn {
                row,
                expected: width,
                found: record.len(),
            });
        }

        let raw_time = &record[layout.datetime];
        let datetime = parse_timestamp(raw_time).ok_or_else(|| DataError::BadTimestamp {
            row,
            value: raw_time.to_string(),
        })?;

        records.push(Measurement {
            datetime,
            lat: parse_float(&record[layout.lat], row, "lat")?,
            lon: parse_float(&record[layout.lon], row, "lon")?,
            o3: parse_float(&record[layout.o3], row, "o3")?,
        });
    }

    Ok(Dataset::from_records(records))
}

/// Empty cells load as NaN.
fn parse_float(s: &str, row: usize, column: &'static str) -> DataResult<f64> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(f64::NAN);
    }
    s.parse::<f64>().map_err(|_| DataError::BadNumber {
        row,
        column,
        value: s.to_string(),
    })
}

const OFFSET_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f%:z", "%Y-%m-%d %H:%M:%S%.f%z"];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.fZ",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// Parse an ISO-8601 style timestamp. Offsets are normalised to UTC and a
/// bare date means midnight.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.naive_utc());
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(s, fmt) {
            return Some(dt.naive_utc());
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

fn load_json(path: &Path, max_rows: Option<usize>) -> DataResult<Dataset> {
    let file = File::open(path).map_err(|e| DataError::Open(path.to_path_buf(), e))?;
    let mut records: Vec<Measurement> = serde_json::from_reader(std::io::BufReader::new(file))?;
    if let Some(n) = max_rows {
        records.truncate(n);
    }
    Ok(Dataset::from_records(records))
}

// ---------------------------------------------------------------------------
// Parquet loader
// ---------------------------------------------------------------------------

/// Load a Parquet file with `datetime`, `lat`, `lon` and `o3` columns.
///
/// `datetime` may be a Timestamp of any unit or a string column; the numeric
/// columns may be Float64 or Float32. Nulls in numeric columns load as NaN.
fn load_parquet(path: &Path, max_rows: Option<usize>) -> DataResult<Dataset> {
    let file = File::open(path).map_err(|e| DataError::Open(path.to_path_buf(), e))?;
    let mut builder = ParquetRecordBatchReaderBuilder::try_new(file)?;
    if let Some(n) = max_rows {
        builder = builder.with_limit(n);
    }
    let reader = builder.build()?;

    let mut records = Vec::new();
    for batch in reader {
        let batch = batch?;
        let first_row = records.len() + 1;

        let datetimes = datetime_column(&batch, first_row)?;
        let lat = float_column(&batch, "lat")?;
        let lon = float_column(&batch, "lon")?;
        let o3 = float_column(&batch, "o3")?;

        for row in 0..batch.num_rows() {
            records.push(Measurement {
                datetime: datetimes[row],
                lat: lat[row],
                lon: lon[row],
                o3: o3[row],
            });
        }
    }

    Ok(Dataset::from_records(records))
}

// -- Parquet / Arrow helpers --

fn column<'b>(batch: &'b RecordBatch, name: &'static str) -> DataResult<&'b ArrayRef> {
    batch.column_by_name(name).ok_or(DataError::MissingField(name))
}

fn float_column(batch: &RecordBatch, name: &'static str) -> DataResult<Vec<f64>> {
    let col = column(batch, name)?;
    match col.data_type() {
        DataType::Float64 => Ok(col
            .as_primitive::<Float64Type>()
            .iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect()),
        DataType::Float32 => Ok(col
            .as_primitive::<Float32Type>()
            .iter()
            .map(|v| v.map_or(f64::NAN, f64::from))
            .collect()),
        other => Err(DataError::UnsupportedType {
            column: name,
            data_type: format!("{other:?}"),
        }),
    }
}

fn datetime_column(batch: &RecordBatch, first_row: usize) -> DataResult<Vec<NaiveDateTime>> {
    let col = column(batch, "datetime")?;

    let parsed: Vec<Option<NaiveDateTime>> = match col.data_type() {
        DataType::Timestamp(TimeUnit::Second, _) => col
            .as_primitive::<TimestampSecondType>()
            .iter()
            .map(|v| v.and_then(|s| DateTime::from_timestamp(s, 0)).map(|d| d.naive_utc()))
            .collect(),
        DataType::Timestamp(TimeUnit::Millisecond, _) => col
            .as_primitive::<TimestampMillisecondType>()
            .iter()
            .map(|v| v.and_then(DateTime::from_timestamp_millis).map(|d| d.naive_utc()))
            .collect(),
        DataType::Timestamp(TimeUnit::Microsecond, _) => col
            .as_primitive::<TimestampMicrosecondType>()
            .iter()
            .map(|v| v.and_then(DateTime::from_timestamp_micros).map(|d| d.naive_utc()))
            .collect(),
        DataType::Timestamp(TimeUnit::Nanosecond, _) => col
            .as_primitive::<TimestampNanosecondType>()
            .iter()
            .map(|v| v.map(|ns| DateTime::from_timestamp_nanos(ns).naive_utc()))
            .collect(),
        DataType::Utf8 => col
            .as_string::<i32>()
            .iter()
            .map(|v| v.and_then(parse_timestamp))
            .collect(),
        DataType::LargeUtf8 => col
            .as_string::<i64>()
            .iter()
            .map(|v| v.and_then(parse_timestamp))
            .collect(),
        other => {
            return Err(DataError::UnsupportedType {
                column: "datetime",
                data_type: format!("{other:?}"),
            })
        }
    };

    parsed
        .into_iter()
        .enumerate()
        .map(|(i, dt)| {
            dt.ok_or_else(|| DataError::BadTimestamp {
                row: first_row + i,
                value: display_cell(col, i),
            })
        })
        .collect()
}

fn display_cell(col: &ArrayRef, row: usize) -> String {
    if col.is_null(row) {
        return "<null>".to_string();
    }
    arrow::util::display::array_value_to_string(col.as_ref(), row).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Arc;

    use arrow::array::{Float32Array, Float64Array, StringArray, TimestampMillisecondArray};
    use arrow::datatypes::{Field, Schema};
    use parquet::arrow::ArrowWriter;

    use crate::data::model::tests::at;

    const HEADER: &str = "datetime,a,b,c,lat,lon,g,h,i,j,k,l,m,n,o,p,q,r,o3,unit";

    fn source_row(datetime: &str, lat: &str, lon: &str, o3: &str) -> String {
        format!("{datetime},x,x,x,{lat},{lon},x,x,x,x,x,x,x,x,x,x,x,x,{o3},B02512")
    }

    fn write_csv(lines: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file.flush().unwrap();
        file
    }

    #[test]
    fn source_layout_picks_columns_0_4_5_18() {
        let file = write_csv(&[
            HEADER.to_string(),
            source_row("2011-09-09 02:00:00", "51.5", "-0.12", "31.5"),
            source_row("2011-09-09 05:00:00", "48.8", "2.29", "40"),
        ]);
        let ds = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap();
        assert_eq!(ds.len(), 2);
        let first = ds.records()[0];
        assert_eq!(first.datetime, at(9, 2, 0));
        assert_eq!(first.lat, 51.5);
        assert_eq!(first.lon, -0.12);
        assert_eq!(first.o3, 31.5);
    }

    #[test]
    fn loading_twice_is_identical() {
        let file = write_csv(&[
            HEADER.to_string(),
            source_row("2011-09-09 02:00:00", "51.5", "-0.12", "31.5"),
            source_row("2011-09-09 02:00:00", "41.9", "12.49", "50.0"),
        ]);
        let a = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap();
        let b = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn empty_ozone_cell_is_nan() {
        let file = write_csv(&[
            HEADER.to_string(),
            source_row("2011-09-09 02:00:00", "51.5", "-0.12", ""),
        ]);
        let ds = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap();
        assert!(ds.records()[0].o3.is_nan());
    }

    #[test]
    fn malformed_timestamp_names_the_row() {
        let file = write_csv(&[
            HEADER.to_string(),
            source_row("2011-09-09 02:00:00", "51.5", "-0.12", "1"),
            source_row("yesterday", "51.5", "-0.12", "1"),
        ]);
        let err = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap_err();
        assert!(matches!(err, DataError::BadTimestamp { row: 2, .. }), "{err:?}");
    }

    #[test]
    fn short_row_is_missing_column() {
        let file = write_csv(&[HEADER.to_string(), "2011-09-09 02:00:00,1,2,3,4".to_string()]);
        let err = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap_err();
        assert!(matches!(
            err,
            DataError::MissingColumn { row: 1, expected: 19, found: 5 }
        ));
    }

    #[test]
    fn row_cap_truncates_the_load() {
        let file = write_csv(&[
            HEADER.to_string(),
            source_row("2011-09-09 02:00:00", "51.5", "-0.12", "31.5"),
            source_row("2011-09-09 03:00:00", "48.8", "2.29", "40"),
            source_row("not a date", "41.9", "12.49", "50"),
        ]);
        let ds = load_file(file.path(), ColumnLayout::SOURCE, Some(2)).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.timestamps(), &[at(9, 2, 0), at(9, 3, 0)]);

        let err = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap_err();
        assert!(matches!(err, DataError::BadTimestamp { row: 3, .. }));
    }

    #[test]
    fn four_column_header_uses_compact_layout() {
        let file = write_csv(&[
            "datetime,lat,lon,o3".to_string(),
            "2011-09-09T05:00:00,41.9,12.49,50.5".to_string(),
        ]);
        let ds = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap();
        assert_eq!(ds.records()[0].lon, 12.49);
        assert_eq!(ds.records()[0].o3, 50.5);
    }

    #[test]
    fn missing_file_is_open_error() {
        let err = load_file(Path::new("/nonexistent/ozone.csv"), ColumnLayout::SOURCE, None).unwrap_err();
        assert!(matches!(err, DataError::Open(..)));
    }

    #[test]
    fn unknown_extension_is_rejected() {
        let err = load_file(Path::new("ozone.xlsx"), ColumnLayout::SOURCE, None).unwrap_err();
        assert!(matches!(err, DataError::UnsupportedExtension(ext) if ext == "xlsx"));
    }

    #[test]
    fn timestamp_formats() {
        let expected = at(9, 2, 0);
        for s in [
            "2011-09-09 02:00:00",
            "2011-09-09T02:00:00",
            "2011-09-09T02:00:00.000",
            "2011-09-09T02:00:00Z",
            "2011-09-09T04:00:00+02:00",
            "2011-09-09 02:00",
        ] {
            assert_eq!(parse_timestamp(s), Some(expected), "{s}");
        }
        assert_eq!(parse_timestamp("2011-09-09"), Some(at(9, 0, 0)));
        assert_eq!(parse_timestamp("09/09/2011"), None);
    }

    #[test]
    fn parquet_with_millisecond_timestamps() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("datetime", DataType::Timestamp(TimeUnit::Millisecond, None), false),
            Field::new("lat", DataType::Float64, false),
            Field::new("lon", DataType::Float64, false),
            Field::new("o3", DataType::Float32, true),
        ]));
        let millis = at(9, 2, 0).and_utc().timestamp_millis();
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(TimestampMillisecondArray::from(vec![millis, millis])),
                Arc::new(Float64Array::from(vec![51.5, 48.8])),
                Arc::new(Float64Array::from(vec![-0.12, 2.29])),
                Arc::new(Float32Array::from(vec![Some(30.0), None])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.as_file().try_clone().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let ds = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap();
        assert_eq!(ds.len(), 2);
        assert_eq!(ds.records()[0].datetime, at(9, 2, 0));
        assert_eq!(ds.records()[1].lat, 48.8);
        assert_eq!(ds.records()[0].o3, 30.0);
        assert!(ds.records()[1].o3.is_nan());

        let capped = load_file(file.path(), ColumnLayout::SOURCE, Some(1)).unwrap();
        assert_eq!(capped.len(), 1);
        assert_eq!(capped.records()[0].lat, 51.5);
    }

    #[test]
    fn parquet_string_datetimes_are_parsed() {
        let schema = Arc::new(Schema::new(vec![
            Field::new("datetime", DataType::Utf8, false),
            Field::new("lat", DataType::Float64, false),
            Field::new("lon", DataType::Float64, false),
            Field::new("o3", DataType::Float64, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["2011-09-09 02:00:00", "bogus"])),
                Arc::new(Float64Array::from(vec![51.5, 48.8])),
                Arc::new(Float64Array::from(vec![-0.12, 2.29])),
                Arc::new(Float64Array::from(vec![30.0, 20.0])),
            ],
        )
        .unwrap();

        let file = tempfile::Builder::new().suffix(".parquet").tempfile().unwrap();
        let mut writer = ArrowWriter::try_new(file.as_file().try_clone().unwrap(), schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let err = load_file(file.path(), ColumnLayout::SOURCE, None).unwrap_err();
        assert!(matches!(err, DataError::BadTimestamp { row: 2, ref value } if value == "bogus"));
    }
}
