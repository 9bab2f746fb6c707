//! Search projection: filter, bucket and order a record set for display.

use crate::ordering::sort_bucket;
use crate::record::{Bucket, ClassifiedRecord};

/// Records split by bucket, each column in its display order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Columns {
    pub overdue: Vec<ClassifiedRecord>,
    pub urgent: Vec<ClassifiedRecord>,
    pub scheduled: Vec<ClassifiedRecord>,
}

impl Columns {
    pub fn get(&self, bucket: Bucket) -> &[ClassifiedRecord] {
        match bucket {
            Bucket::Overdue => &self.overdue,
            Bucket::Urgent => &self.urgent,
            Bucket::Scheduled => &self.scheduled,
        }
    }

    pub fn total(&self) -> usize {
        self.overdue.len() + self.urgent.len() + self.scheduled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}

/// Does `record` match a trimmed, non-empty query?
///
/// All-digit queries match against the digits of the identity code; anything
/// else matches case-insensitively against the name.
pub fn matches(record: &ClassifiedRecord, query: &str) -> bool {
    if query.bytes().all(|b| b.is_ascii_digit()) {
        record.identity_digits.contains(query)
    } else {
        record.name_lower.contains(&query.to_lowercase())
    }
}

/// Filter `records` by `query`, then bucket and order them.
///
/// Pure: the same inputs always give the same columns.
pub fn project(records: &[ClassifiedRecord], query: &str) -> Columns {
    let query = query.trim();

    let mut columns = Columns::default();
    for record in records {
        if !query.is_empty() && !matches(record, query) {
            continue;
        }
        match record.bucket {
            Bucket::Overdue => columns.overdue.push(record.clone()),
            Bucket::Urgent => columns.urgent.push(record.clone()),
            Bucket::Scheduled => columns.scheduled.push(record.clone()),
        }
    }

    Columns {
        overdue: sort_bucket(Bucket::Overdue, &columns.overdue),
        urgent: sort_bucket(Bucket::Urgent, &columns.urgent),
        scheduled: sort_bucket(Bucket::Scheduled, &columns.scheduled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{classify_batch, parse_timestamp};
    use crate::record::RawRecord;

    fn raw(id: u64, name: &str, code: &str, last: &str, frequency: i64) -> RawRecord {
        RawRecord {
            id,
            name: name.into(),
            identity_code: code.into(),
            active: true,
            last_verified_date: Some(last.into()),
            verify_frequency_in_days: frequency,
        }
    }

    fn sample() -> Vec<ClassifiedRecord> {
        let now = parse_timestamp("2025/11/25 12:00:00").unwrap();
        classify_batch(
            &[
                raw(1, "João Silva", "123.456.789-01", "2025/11/20 10:00:00", 3),
                raw(2, "Maria Santos", "987.654.321-00", "2025/11/25 12:00:00", 1),
                raw(3, "Pedro Costa", "111.222.333-44", "2025/11/25 10:00:00", 10),
                raw(4, "Ana Maria Lima", "555.987.654-99", "2025/11/10 09:00:00", 7),
                raw(5, "Carlos Souza", "222.333.444-55", "2025/11/24 12:00:00", 30),
            ],
            now,
        )
    }

    fn ids(records: &[ClassifiedRecord]) -> Vec<u64> {
        records.iter().map(|r| r.id()).collect()
    }

    #[test]
    fn empty_query_keeps_everything() {
        let records = sample();
        let columns = project(&records, "");
        assert_eq!(columns.total(), records.len());
        assert_eq!(ids(&columns.overdue), vec![4, 1]);
        assert_eq!(ids(&columns.urgent), vec![2]);
        assert_eq!(ids(&columns.scheduled), vec![3, 5]);
    }

    #[test]
    fn whitespace_query_is_empty() {
        let records = sample();
        assert_eq!(project(&records, "   "), project(&records, ""));
    }

    #[test]
    fn digit_query_matches_identity_digits() {
        let records = sample();
        let columns = project(&records, "987654");
        let mut found: Vec<u64> = Bucket::ALL
            .iter()
            .flat_map(|b| ids(columns.get(*b)))
            .collect();
        found.sort();
        assert_eq!(found, vec![2, 4]);
    }

    #[test]
    fn digit_query_ignores_punctuation_in_codes() {
        let records = sample();
        assert_eq!(project(&records, "78901").total(), 1);
    }

    #[test]
    fn text_query_matches_name_case_insensitively() {
        let records = sample();
        let columns = project(&records, "MARIA");
        assert_eq!(columns.total(), 2);
        assert_eq!(ids(&columns.overdue), vec![4]);
        assert_eq!(ids(&columns.urgent), vec![2]);

        assert_eq!(project(&records, "joão").total(), 1);
        assert_eq!(project(&records, "nobody").total(), 0);
    }

    #[test]
    fn projection_is_deterministic() {
        let records = sample();
        assert_eq!(project(&records, "a"), project(&records, "a"));
    }
}
