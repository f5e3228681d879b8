use anyhow::Result;
use time::format_description::well_known;
use time::{OffsetDateTime, UtcOffset};

/// Convert 'utc_date' to a local date by applying the current local offset of
/// the user at the specified time. If the offset cannot be determined (which
/// is common on multi-threaded Unix programs) the date is returned unchanged.
pub fn to_local_date(utc_date: OffsetDateTime) -> OffsetDateTime {
    match UtcOffset::local_offset_at(utc_date) {
        Ok(local_offset) => utc_date.to_offset(local_offset),
        Err(_) => utc_date,
    }
}

/// Formats 'date' into a string like "2024-09-01T05:10:44Z". This is the
/// format that GPX files contain.
pub fn format_utc_date(date: &OffsetDateTime) -> Result<String> {
    Ok(date.format(&well_known::Rfc3339)?)
}
