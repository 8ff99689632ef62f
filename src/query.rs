use thiserror::Error;

use crate::data::filter::TimeFilter;
use crate::data::loader::parse_timestamp;

// ---------------------------------------------------------------------------
// Shareable selection: `date=2011-09-09T00:00:00` or `hour=2`
// ---------------------------------------------------------------------------

pub const DATE_KEY: &str = "date";
pub const HOUR_KEY: &str = "hour";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QueryError {
    #[error("Query has neither a 'date' nor an 'hour' parameter")]
    NoSelection,

    #[error("'{0}' is not a valid date")]
    BadDate(String),

    #[error("'{0}' is not an hour between 0 and 23")]
    BadHour(String),
}

/// Encode a selection as a query string (without the leading `?`).
pub fn to_query(filter: &TimeFilter) -> String {
    match filter {
        TimeFilter::At(dt) => format!("{DATE_KEY}={}", dt.format("%Y-%m-%dT%H:%M:%S")),
        TimeFilter::Hour(h) => format!("{HOUR_KEY}={h}"),
    }
}

/// Decode a query string. A leading `?` is optional, unknown keys are
/// ignored and the first recognised key wins.
pub fn parse_query(query: &str) -> Result<TimeFilter, QueryError> {
    let query = query.trim().trim_start_matches('?');
    for pair in query.split('&') {
        let Some((key, value)) = pair.split_once('=') else {
            continue;
        };
        let value = value.trim();
        match key.trim() {
            DATE_KEY => {
                return parse_timestamp(value)
                    .map(TimeFilter::At)
                    .ok_or_else(|| QueryError::BadDate(value.to_string()));
            }
            HOUR_KEY => {
                return match value.parse::<u32>() {
                    Ok(h) if h < 24 => Ok(TimeFilter::Hour(h)),
                    _ => Err(QueryError::BadHour(value.to_string())),
                };
            }
            _ => {}
        }
    }
    Err(QueryError::NoSelection)
}
