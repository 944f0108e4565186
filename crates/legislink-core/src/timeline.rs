//! Chronological merge of government and parliamentary stages.
//!
//! The registries have inconsistent date coverage and formats. Every stage
//! gets a sort key: its parsed date, or a sentinel when the date is missing
//! or unparseable. Government stages fall back to the far past and
//! parliamentary stages to the far future, so undated stages never cross
//! the government/parliament boundary.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};

use crate::model::{Origin, Stage};

const TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a stage date. Formats are tried in order and the first success wins:
///
/// 1. timestamp with a time component (RFC 3339, or naive `T`/space separated)
/// 2. `YYYY-MM-DD`
/// 3. `DD-MM-YYYY`
///
/// Offsets are normalised to UTC.
pub fn parse_stage_date(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    if let Some(dt) = TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
    {
        return Some(dt);
    }
    ["%Y-%m-%d", "%d-%m-%Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
        .map(|d| d.and_time(NaiveTime::MIN))
}

/// Sentinel for stages without a usable date.
pub fn sentinel(origin: Origin) -> NaiveDateTime {
    match origin {
        Origin::Government => NaiveDateTime::MIN,
        Origin::Parliamentary => NaiveDateTime::MAX,
    }
}

pub fn sort_key(stage: &Stage) -> NaiveDateTime {
    stage
        .date
        .as_deref()
        .and_then(parse_stage_date)
        .unwrap_or_else(|| sentinel(stage.origin))
}

/// Merge both stage lists into one non-decreasing timeline.
///
/// The sort is stable: government stages are laid down before parliamentary
/// ones, and each source keeps its internal order among equal keys.
pub fn merge(government: Vec<Stage>, parliamentary: Vec<Stage>) -> Vec<Stage> {
    let mut all = government;
    all.extend(parliamentary);
    all.sort_by_cached_key(sort_key);
    all
}
