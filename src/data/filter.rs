use chrono::{NaiveDateTime, Timelike};

use super::model::{Dataset, FilteredView, Measurement};

// ---------------------------------------------------------------------------
// Time predicate: which records the slider currently selects
// ---------------------------------------------------------------------------

/// A time predicate over the `datetime` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeFilter {
    /// Records whose timestamp equals this instant exactly.
    At(NaiveDateTime),
    /// Records whose hour-of-day equals this value (0..=23).
    Hour(u32),
}

impl TimeFilter {
    pub fn matches(&self, m: &Measurement) -> bool {
        match *self {
            TimeFilter::At(instant) => m.datetime == instant,
            TimeFilter::Hour(hour) => m.datetime.hour() == hour,
        }
    }
}

/// Return the view of records that satisfy `filter`.
///
/// An empty view is a valid answer: a timestamp absent from the data or an
/// hour above 23 simply matches nothing.
pub fn filter_by_timestamp(dataset: &Dataset, filter: TimeFilter) -> FilteredView<'_> {
    let indices = dataset
        .records()
        .iter()
        .enumerate()
        .filter(|(_, m)| filter.matches(m))
        .map(|(i, _)| i)
        .collect();
    FilteredView::new(dataset, indices)
}
