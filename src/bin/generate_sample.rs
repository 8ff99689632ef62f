use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
use arrow::record_batch::RecordBatch;
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use parquet::arrow::ArrowWriter;

const HEADER: [&str; 20] = [
    "datetime",
    "country",
    "station_code",
    "station_name",
    "lat",
    "lon",
    "altitude",
    "area_type",
    "station_type",
    "network",
    "sampling_point",
    "sampling_process",
    "sample",
    "averaging_time",
    "unit",
    "validity",
    "verification",
    "data_capture",
    "o3",
    "pollutant_code",
];

/// City centers the synthetic stations cluster around.
const CITIES: [(&str, &str, f64, f64); 3] = [
    ("GB", "London", 51.504831314, -0.123499506),
    ("FR", "Paris", 48.858370, 2.294481),
    ("IT", "Rome", 41.8874314503, 12.4886930452),
];

const STATIONS_PER_CITY: usize = 12;
const DAYS: i64 = 5;

/// splitmix64: small, deterministic, good enough for sample data.
struct SampleRng(u64);

impl SampleRng {
    fn next_u64(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.0;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[lo, hi)`.
    fn uniform(&mut self, lo: f64, hi: f64) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        lo + (hi - lo) * unit
    }
}

struct Station {
    country: &'static str,
    code: String,
    name: String,
    lat: f64,
    lon: f64,
    /// Per-station offset added to the regional ozone level.
    bias: f64,
}

struct Row {
    datetime: NaiveDateTime,
    station: usize,
    o3: Option<f64>,
}

fn stations(rng: &mut SampleRng) -> Vec<Station> {
    CITIES
        .iter()
        .flat_map(|&(country, city, lat, lon)| (0..STATIONS_PER_CITY).map(move |i| (country, city, lat, lon, i)))
        .map(|(country, city, lat, lon, i)| Station {
            country,
            code: format!("{country}{:04}", i + 1),
            name: format!("{city} {}", i + 1),
            lat: lat + rng.uniform(-0.25, 0.25),
            lon: lon + rng.uniform(-0.35, 0.35),
            bias: rng.uniform(-10.0, 10.0),
        })
        .collect()
}

/// Hourly readings with a midday ozone peak; about 2% of cells are empty.
fn rows(stations: &[Station], rng: &mut SampleRng) -> Vec<Row> {
    let start = NaiveDate::from_ymd_opt(2011, 9, 7)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default();

    let mut rows = Vec::new();
    for step in 0..DAYS * 24 {
        let datetime = start + Duration::hours(step);
        let diurnal = (std::f64::consts::PI * (datetime.hour() as f64 - 6.0) / 12.0).sin();
        for (station, s) in stations.iter().enumerate() {
            let o3 = if rng.uniform(0.0, 1.0) < 0.02 {
                None
            } else {
                Some((45.0 + 35.0 * diurnal + s.bias + rng.uniform(-8.0, 8.0)).max(0.0))
            };
            rows.push(Row { datetime, station, o3 });
        }
    }
    rows
}

fn write_csv(path: &Path, stations: &[Station], rows: &[Row]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path).context("creating CSV file")?;
    writer.write_record(HEADER)?;
    for row in rows {
        let s = &stations[row.station];
        let datetime = row.datetime.format("%Y-%m-%d %H:%M:%S").to_string();
        let (lat, lon) = (format!("{:.6}", s.lat), format!("{:.6}", s.lon));
        let o3 = row.o3.map(|v| format!("{v:.1}")).unwrap_or_default();
        writer.write_record([
            datetime.as_str(),
            s.country,
            s.code.as_str(),
            s.name.as_str(),
            lat.as_str(),
            lon.as_str(),
            "35",
            "urban",
            "background",
            "NET",
            "SPO",
            "SPP",
            "SAM",
            "hour",
            "µg/m3",
            "1",
            "1",
            "100",
            o3.as_str(),
            "B02512",
        ])?;
    }
    writer.flush()?;
    Ok(())
}

fn write_parquet(path: &Path, stations: &[Station], rows: &[Row]) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("datetime", DataType::Timestamp(TimeUnit::Millisecond, None), false),
        Field::new("lat", DataType::Float64, false),
        Field::new("lon", DataType::Float64, false),
        Field::new("o3", DataType::Float64, true),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(TimestampMillisecondArray::from(
                rows.iter()
                    .map(|r| r.datetime.and_utc().timestamp_millis())
                    .collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| stations[r.station].lat).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(
                rows.iter().map(|r| stations[r.station].lon).collect::<Vec<_>>(),
            )),
            Arc::new(Float64Array::from(rows.iter().map(|r| r.o3).collect::<Vec<_>>())),
        ],
    )
    .context("building record batch")?;

    let file = std::fs::File::create(path).context("creating parquet file")?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();

    let output = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "uk_france_italy_o3_nans_no2_no_non_strict_drop_dups.csv".to_string());
    let path = Path::new(&output);

    let mut rng = SampleRng(42);
    let stations = stations(&mut rng);
    let rows = rows(&stations, &mut rng);

    let is_parquet = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet"));
    if is_parquet {
        write_parquet(path, &stations, &rows)?;
    } else {
        write_csv(path, &stations, &rows)?;
    }

    log::info!("Wrote {} measurements from {} stations to {output}", rows.len(), stations.len());
    println!("Wrote {} measurements to {output}", rows.len());
    Ok(())
}
