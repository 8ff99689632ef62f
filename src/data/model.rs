use std::collections::BTreeSet;
use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Measurement – one row of the source table
// ---------------------------------------------------------------------------

/// A single ozone reading at one station and one instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Measurement time (UTC, no offset kept).
    pub datetime: NaiveDateTime,
    #[serde(deserialize_with = "null_as_nan")]
    pub lat: f64,
    #[serde(deserialize_with = "null_as_nan")]
    pub lon: f64,
    /// Ozone concentration; NaN when the source cell was empty.
    #[serde(deserialize_with = "null_as_nan")]
    pub o3: f64,
}

/// JSON has no NaN; serde_json writes it as `null`, so read `null` back as NaN.
fn null_as_nan<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// The full parsed dataset. Immutable once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    records: Vec<Measurement>,
    /// Sorted distinct timestamps, used as slider stops.
    timestamps: Vec<NaiveDateTime>,
}

impl Dataset {
    /// Build the timestamp index from the loaded records.
    pub fn from_records(records: Vec<Measurement>) -> Self {
        let timestamps: BTreeSet<NaiveDateTime> = records.iter().map(|m| m.datetime).collect();
        Dataset {
            records,
            timestamps: timestamps.into_iter().collect(),
        }
    }

    pub fn records(&self) -> &[Measurement] {
        &self.records
    }

    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    /// Records at the given row indices, in the order given.
    pub fn select<'a>(&'a self, indices: &'a [usize]) -> impl Iterator<Item = &'a Measurement> + 'a {
        indices.iter().filter_map(move |&i| self.records.get(i))
    }

    /// Smallest and largest finite ozone value, if any.
    pub fn o3_range(&self) -> Option<(f64, f64)> {
        self.records
            .iter()
            .map(|m| m.o3)
            .filter(|v| v.is_finite())
            .fold(None, |acc, v| match acc {
                None => Some((v, v)),
                Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
            })
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Midpoint
// ---------------------------------------------------------------------------

/// Mean latitude/longitude of a dataset, used as the default map center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Midpoint {
    pub lat: f64,
    pub lon: f64,
}

impl fmt::Display for Midpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.4}, {:.4}", self.lat, self.lon)
    }
}

// ---------------------------------------------------------------------------
// FilteredView – read-only subset of a dataset
// ---------------------------------------------------------------------------

/// Rows of a [`Dataset`] matching a time predicate, kept in dataset order.
#[derive(Debug, Clone)]
pub struct FilteredView<'a> {
    dataset: &'a Dataset,
    indices: Vec<usize>,
}

impl<'a> FilteredView<'a> {
    pub(crate) fn new(dataset: &'a Dataset, indices: Vec<usize>) -> Self {
        FilteredView { dataset, indices }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Measurement> + '_ {
        let records = self.dataset.records();
        self.indices.iter().filter_map(move |&i| records.get(i))
    }

    pub fn into_indices(self) -> Vec<usize> {
        self.indices
    }

    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }
}
