//! Parser for timepoint selections such as `"1-9,23,25"`.

use crate::label::Frame;
use std::collections::BTreeSet;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimepointsError {
    #[error("'{0}' is not a timepoint number")]
    NotANumber(String),
    #[error("interval '{0}' must be written as low-high with low <= high")]
    BadInterval(String),
}

/// Parse a comma separated list of numbers and `low-high` intervals.
///
/// An empty (or whitespace-only) string yields an empty set, which callers
/// read as "no restriction".
pub fn parse_timepoints(text: &str) -> Result<BTreeSet<Frame>, TimepointsError> {
    let mut out = BTreeSet::new();
    for item in text.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        match item.split_once('-') {
            Some((lo, hi)) => {
                let lo = parse_one(lo.trim(), item)?;
                let hi = parse_one(hi.trim(), item)?;
                if lo > hi {
                    return Err(TimepointsError::BadInterval(item.to_string()));
                }
                out.extend(lo..=hi);
            }
            None => {
                out.insert(parse_one(item, item)?);
            }
        }
    }
    Ok(out)
}

fn parse_one(value: &str, item: &str) -> Result<Frame, TimepointsError> {
    if value.is_empty() {
        return Err(TimepointsError::BadInterval(item.to_string()));
    }
    value
        .parse()
        .map_err(|_| TimepointsError::NotANumber(value.to_string()))
}
