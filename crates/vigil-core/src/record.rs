//! Monitored-record types exchanged with the visit API.

use std::fmt;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// A monitored individual as returned by the remote collection endpoint.
///
/// Owned by the remote side. Vigil only reads it and asks for
/// `last_verified_date` to be moved forward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    pub id: u64,
    pub name: String,
    /// Identity code as entered upstream: digits plus formatting punctuation.
    #[serde(rename = "cpf")]
    pub identity_code: String,
    pub active: bool,
    /// Wire timestamp, `YYYY/MM/DD HH:mm:ss` in local civil time.
    #[serde(default)]
    pub last_verified_date: Option<String>,
    /// Required re-verification interval. Non-positive values are invalid.
    pub verify_frequency_in_days: i64,
}

/// Urgency bucket derived from a record's signed day offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    /// Next visit date has passed.
    Overdue,
    /// Due today or within the urgent threshold.
    Urgent,
    /// Due later than the urgent threshold.
    Scheduled,
}

impl Bucket {
    pub const ALL: [Bucket; 3] = [Bucket::Overdue, Bucket::Urgent, Bucket::Scheduled];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Overdue => "overdue",
            Self::Urgent => "urgent",
            Self::Scheduled => "scheduled",
        }
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record after one classification pass.
///
/// Built by [`classify`](crate::calendar::classify) and never mutated; a new
/// pass produces a new value. At most one of `days_overdue` and
/// `days_remaining` is nonzero, and both are zero only for an urgent record
/// due today.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedRecord {
    pub record: RawRecord,
    pub last_verified: NaiveDateTime,
    pub next_due: NaiveDateTime,
    pub bucket: Bucket,
    pub days_overdue: u32,
    pub days_remaining: u32,
    /// Lowercased display name for text search.
    pub name_lower: String,
    /// Identity code with every non-digit removed.
    pub identity_digits: String,
}

impl ClassifiedRecord {
    pub fn id(&self) -> u64 {
        self.record.id
    }

    pub fn name(&self) -> &str {
        &self.record.name
    }

    /// Signed day offset this record was classified with.
    pub fn day_offset(&self) -> i64 {
        if self.days_overdue > 0 {
            -i64::from(self.days_overdue)
        } else {
            i64::from(self.days_remaining)
        }
    }

    /// Relative due label such as `"tomorrow"` or `"3 days overdue"`.
    pub fn due_label(&self) -> String {
        crate::calendar::relative_label(self.bucket, self.day_offset())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_record_reads_wire_field_names() {
        let json = r#"{
            "id": 7,
            "name": "Ana Souza",
            "cpf": "123.456.789-01",
            "active": true,
            "last_verified_date": "2025/11/20 10:00:00",
            "verify_frequency_in_days": 3
        }"#;
        let parsed: RawRecord = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.id, 7);
        assert_eq!(parsed.identity_code, "123.456.789-01");
        assert_eq!(
            parsed.last_verified_date.as_deref(),
            Some("2025/11/20 10:00:00")
        );
        assert_eq!(parsed.verify_frequency_in_days, 3);
    }

    #[test]
    fn raw_record_null_or_missing_timestamp() {
        let with_null = r#"{
            "id": 1, "name": "A", "cpf": "1", "active": true,
            "last_verified_date": null, "verify_frequency_in_days": 3
        }"#;
        let missing = r#"{
            "id": 2, "name": "B", "cpf": "2", "active": false,
            "verify_frequency_in_days": 0
        }"#;
        let a: RawRecord = serde_json::from_str(with_null).unwrap();
        let b: RawRecord = serde_json::from_str(missing).unwrap();
        assert!(a.last_verified_date.is_none());
        assert!(b.last_verified_date.is_none());
    }

    #[test]
    fn raw_record_serialises_identity_code_as_cpf() {
        let record = RawRecord {
            id: 3,
            name: "Caio".into(),
            identity_code: "98765432100".into(),
            active: true,
            last_verified_date: Some("2025/11/25 08:00:00".into()),
            verify_frequency_in_days: 7,
        };
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["cpf"], "98765432100");
        assert!(value.get("identity_code").is_none());
    }

    #[test]
    fn bucket_serialises_lowercase() {
        assert_eq!(serde_json::to_string(&Bucket::Overdue).unwrap(), "\"overdue\"");
        assert_eq!(Bucket::Scheduled.to_string(), "scheduled");
    }
}
