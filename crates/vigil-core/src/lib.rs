//! Core visit-monitoring types: records, calendar classification, ordering,
//! search projection and selection.

pub mod calendar;
pub mod clock;
pub mod error;
pub mod ordering;
pub mod projection;
pub mod record;
pub mod selection;

pub use calendar::{
    ClassifyError, URGENT_THRESHOLD_DAYS, classify, classify_batch, format_display,
    format_for_wire, format_identity_code, identity_digits, parse_timestamp, relative_label,
};
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ApiError, ErrorKind};
pub use ordering::{sort_overdue, sort_scheduled, sort_urgent};
pub use projection::{Columns, project};
pub use record::{Bucket, ClassifiedRecord, RawRecord};
pub use selection::Selection;
