//! Plain-text rendering of the board and of acknowledgment results.

use std::fmt::Write;

use chrono::NaiveDateTime;
use vigil_core::calendar::last_verified_label;
use vigil_core::{ApiError, Bucket, ClassifiedRecord, Columns, format_display, format_identity_code};
use vigil_sync::BatchOutcome;

fn column_title(bucket: Bucket) -> &'static str {
    match bucket {
        Bucket::Overdue => "Overdue",
        Bucket::Urgent => "Urgent",
        Bucket::Scheduled => "Scheduled",
    }
}

/// Render the three columns, in bucket order, with one line per record.
pub fn render_board(columns: &Columns, query: &str, now: NaiveDateTime) -> String {
    let mut out = String::new();
    let query = query.trim();

    if !query.is_empty() && columns.is_empty() {
        let _ = writeln!(out, "No records match {query:?}");
        return out;
    }

    for bucket in Bucket::ALL {
        let records = columns.get(bucket);
        let _ = writeln!(out, "=== {} ({}) ===", column_title(bucket), records.len());
        for record in records {
            render_record(&mut out, record, now);
        }
        let _ = writeln!(out);
    }
    let _ = writeln!(out, "{} records", columns.total());
    out
}

fn render_record(out: &mut String, record: &ClassifiedRecord, now: NaiveDateTime) {
    let _ = writeln!(
        out,
        "  #{:<6} {:<28} {:<16} {:<16} next {}  (last {}, {})",
        record.id(),
        record.name(),
        format_identity_code(&record.record.identity_code),
        record.due_label(),
        format_display(record.next_due),
        format_display(record.last_verified),
        last_verified_label(record.last_verified, now),
    );
}

/// Render the result of a batch acknowledgment. `named` maps ids to names
/// where they are known.
pub fn render_batch(outcome: &BatchOutcome, named: &[&ClassifiedRecord]) -> String {
    let name_of = |id: u64| {
        named
            .iter()
            .find(|r| r.id() == id)
            .map(|r| r.name().to_string())
            .unwrap_or_else(|| format!("#{id}"))
    };

    let mut out = String::new();
    let _ = writeln!(out, "Visits registered: {}", outcome.succeeded.len());
    for &id in &outcome.succeeded {
        let _ = writeln!(out, "  ok      {}", name_of(id));
    }
    if !outcome.failed.is_empty() {
        let _ = writeln!(out, "Failed: {}", outcome.failed.len());
        for &id in &outcome.failed {
            let reason = outcome
                .errors
                .get(&id)
                .map(ApiError::user_message)
                .unwrap_or("unknown failure");
            let _ = writeln!(out, "  failed  {}: {reason}", name_of(id));
        }
    }
    out
}
