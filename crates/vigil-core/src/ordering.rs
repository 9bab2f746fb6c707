//! Per-bucket ordering of classified records.
//!
//! Every sort is stable and works on a copy; the input slice is never
//! reordered.

use crate::record::{Bucket, ClassifiedRecord};

/// Most overdue first.
pub fn sort_overdue(records: &[ClassifiedRecord]) -> Vec<ClassifiedRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by(|a, b| b.days_overdue.cmp(&a.days_overdue));
    sorted
}

/// Fewest days remaining first.
pub fn sort_urgent(records: &[ClassifiedRecord]) -> Vec<ClassifiedRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.days_remaining);
    sorted
}

/// Earliest next-due instant first.
pub fn sort_scheduled(records: &[ClassifiedRecord]) -> Vec<ClassifiedRecord> {
    let mut sorted = records.to_vec();
    sorted.sort_by_key(|r| r.next_due);
    sorted
}

/// Apply the ordering that belongs to `bucket`.
pub fn sort_bucket(bucket: Bucket, records: &[ClassifiedRecord]) -> Vec<ClassifiedRecord> {
    match bucket {
        Bucket::Overdue => sort_overdue(records),
        Bucket::Urgent => sort_urgent(records),
        Bucket::Scheduled => sort_scheduled(records),
    }
}
