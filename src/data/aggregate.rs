use chrono::{Days, NaiveDate, Timelike};

use super::model::{Dataset, Measurement, Midpoint};

/// Mean latitude and mean longitude over every record.
///
/// NaN on an empty dataset, and NaN coordinates propagate into the result.
pub fn midpoint(dataset: &Dataset) -> Midpoint {
    let n = dataset.len() as f64;
    let (lat_sum, lon_sum) = dataset
        .records()
        .iter()
        .fold((0.0, 0.0), |(lat, lon), m| (lat + m.lat, lon + m.lon));
    Midpoint {
        lat: lat_sum / n,
        lon: lon_sum / n,
    }
}

// ---------------------------------------------------------------------------
// Minute histogram
// ---------------------------------------------------------------------------

pub const MINUTES: usize = 60;

/// Record counts bucketed by minute-of-hour.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MinuteHistogram {
    counts: [usize; MINUTES],
}

impl MinuteHistogram {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Measurement>) -> Self {
        let mut counts = [0; MINUTES];
        for m in records {
            counts[m.datetime.minute() as usize] += 1;
        }
        MinuteHistogram { counts }
    }

    pub fn counts(&self) -> &[usize; MINUTES] {
        &self.counts
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    pub fn max(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }
}

/// Histogram of the records falling in `[day 00:00, day+1 00:00)`.
pub fn histogram_by_minute(dataset: &Dataset, day: NaiveDate) -> MinuteHistogram {
    let start = day.and_time(chrono::NaiveTime::MIN);
    let end = day
        .checked_add_days(Days::new(1))
        .map(|d| d.and_time(chrono::NaiveTime::MIN));
    MinuteHistogram::from_records(
        dataset
            .records()
            .iter()
            .filter(|m| m.datetime >= start && end.map_or(true, |end| m.datetime < end)),
    )
}
