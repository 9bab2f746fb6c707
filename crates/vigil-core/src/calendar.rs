//! Calendar classification for monitored records.
//!
//! Turns a [`RawRecord`] into a [`ClassifiedRecord`] for a given `now`, and
//! formats instants back for the wire and for display.
//!
//! # Day offset
//!
//! `offset = ceil((next_due - now) / 1 day)`, computed in milliseconds.
//! A positive partial day counts as a full day remaining, so a record due in
//! 23 hours has one day left rather than zero. A negative partial day rounds
//! toward zero: a record that became due a few hours ago has offset `0` and
//! stays urgent ("today") until a whole day has passed.
//!
//! | offset            | bucket      |
//! |-------------------|-------------|
//! | `< 0`             | `overdue`   |
//! | `0..=2`           | `urgent`    |
//! | `> 2`             | `scheduled` |
//!
//! All instants are civil local time with no zone attached, matching the wire
//! format. `now` is always a parameter; nothing here reads the clock.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta};
use thiserror::Error;
use tracing::debug;

use crate::record::{Bucket, ClassifiedRecord, RawRecord};

/// Largest day offset still considered urgent.
pub const URGENT_THRESHOLD_DAYS: i64 = 2;

pub const MS_PER_DAY: i64 = 86_400_000;

/// Timestamp format used by the visit API, e.g. `2025/11/20 10:00:00`.
pub const WIRE_FORMAT: &str = "%Y/%m/%d %H:%M:%S";

/// Operator-facing timestamp format, e.g. `20/11/2025 10:00`.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Zone-less layouts accepted when the wire format does not match.
const FALLBACK_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M",
];

/// Date-only layouts, read as local midnight.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("verify frequency must be positive, got {0}")]
    NonPositiveFrequency(i64),
    #[error("last verified timestamp is missing")]
    MissingTimestamp,
    #[error("unparseable last verified timestamp: {0:?}")]
    InvalidTimestamp(String),
    #[error("next due date out of range")]
    OutOfRange,
}

/// Parse a wire timestamp, falling back to ISO-like layouts.
///
/// RFC 3339 input with a `Z` or numeric offset is converted to local civil
/// time. Zone-less input is taken as local already, and a bare date means
/// midnight. Returns `None` for empty or unparseable input.
pub fn parse_timestamp(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(s, WIRE_FORMAT) {
        return Some(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Local).naive_local());
    }
    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .map(|date| date.and_time(NaiveTime::MIN))
        })
}

/// Format an instant in the wire format. Inverse of [`parse_timestamp`].
pub fn format_for_wire(ts: NaiveDateTime) -> String {
    ts.format(WIRE_FORMAT).to_string()
}

/// Format an instant for display as `DD/MM/YYYY HH:mm`.
pub fn format_display(ts: NaiveDateTime) -> String {
    ts.format(DISPLAY_FORMAT).to_string()
}

/// Strip everything but ASCII digits. No check-digit validation.
pub fn identity_digits(code: &str) -> String {
    code.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Format an 11-digit identity code as `XXX.XXX.XXX-XX`.
///
/// Codes with any other digit count are returned unchanged.
pub fn format_identity_code(code: &str) -> String {
    let digits = identity_digits(code);
    if digits.len() != 11 {
        return code.to_string();
    }
    format!(
        "{}.{}.{}-{}",
        &digits[0..3],
        &digits[3..6],
        &digits[6..9],
        &digits[9..]
    )
}

/// Signed whole days from `now` until `next_due`, rounded up.
pub fn day_offset(next_due: NaiveDateTime, now: NaiveDateTime) -> i64 {
    let ms = (next_due - now).num_milliseconds();
    let days = ms.div_euclid(MS_PER_DAY);
    if ms.rem_euclid(MS_PER_DAY) == 0 {
        days
    } else {
        days + 1
    }
}

/// Bucket for a signed day offset.
pub fn bucket_for(offset: i64) -> Bucket {
    if offset < 0 {
        Bucket::Overdue
    } else if offset <= URGENT_THRESHOLD_DAYS {
        Bucket::Urgent
    } else {
        Bucket::Scheduled
    }
}

/// Classify one record as of `now`.
pub fn classify(record: &RawRecord, now: NaiveDateTime) -> Result<ClassifiedRecord, ClassifyError> {
    let frequency = record.verify_frequency_in_days;
    if frequency <= 0 {
        return Err(ClassifyError::NonPositiveFrequency(frequency));
    }

    let raw_ts = record
        .last_verified_date
        .as_deref()
        .ok_or(ClassifyError::MissingTimestamp)?;
    let last_verified =
        parse_timestamp(raw_ts).ok_or_else(|| ClassifyError::InvalidTimestamp(raw_ts.to_string()))?;

    let next_due = TimeDelta::try_days(frequency)
        .and_then(|delta| last_verified.checked_add_signed(delta))
        .ok_or(ClassifyError::OutOfRange)?;

    let offset = day_offset(next_due, now);

    Ok(ClassifiedRecord {
        record: record.clone(),
        last_verified,
        next_due,
        bucket: bucket_for(offset),
        days_overdue: saturate(offset.saturating_neg()),
        days_remaining: saturate(offset),
        name_lower: record.name.to_lowercase(),
        identity_digits: identity_digits(&record.identity_code),
    })
}

fn saturate(days: i64) -> u32 {
    u32::try_from(days.max(0)).unwrap_or(u32::MAX)
}

/// Classify every active record, silently dropping the ones that fail.
///
/// Invalid data is not an operational fault: failures are only logged at
/// debug level and never reach any bucket.
pub fn classify_batch(records: &[RawRecord], now: NaiveDateTime) -> Vec<ClassifiedRecord> {
    records
        .iter()
        .filter(|record| record.active)
        .filter_map(|record| match classify(record, now) {
            Ok(classified) => Some(classified),
            Err(err) => {
                debug!(id = record.id, error = %err, "record excluded from classification");
                None
            }
        })
        .collect()
}

/// Relative due label for a bucket and signed day offset.
///
/// `"today"`, `"tomorrow"`, `"in N days"`, or `"N days overdue"`.
pub fn relative_label(bucket: Bucket, offset: i64) -> String {
    let n = offset.unsigned_abs();
    match (bucket, n) {
        (Bucket::Overdue, 1) => "1 day overdue".to_string(),
        (Bucket::Overdue, n) => format!("{n} days overdue"),
        (_, 0) => "today".to_string(),
        (_, 1) => "tomorrow".to_string(),
        (_, n) => format!("in {n} days"),
    }
}

/// How long ago a record was last verified, relative to `now`.
///
/// A `last` later than `now` (clock skew) reads as `"today"`.
pub fn last_verified_label(last: NaiveDateTime, now: NaiveDateTime) -> String {
    let today = now.date();
    if last >= now || last.date() == today {
        return "today".to_string();
    }
    if today.pred_opt() == Some(last.date()) {
        return "yesterday".to_string();
    }
    let elapsed = now - last;
    let hours = elapsed.num_hours();
    if hours < 24 {
        return format!("{hours}h ago");
    }
    match elapsed.num_days() {
        1 => "1 day ago".to_string(),
        days => format!("{days} days ago"),
    }
}
