use async_trait::async_trait;
use vigil_core::{ApiError, RawRecord};

/// The remote collection of monitored records.
///
/// Implementations report every failure as an [`ApiError`]; callers add their
/// own deadline on top.
#[async_trait]
pub trait VisitApi: Send + Sync {
    /// Fetch the full record collection.
    async fn fetch_records(&self) -> Result<Vec<RawRecord>, ApiError>;

    /// Set `last_verified_date` of record `id` to a wire-format timestamp.
    async fn acknowledge(&self, id: u64, last_verified_date: &str) -> Result<(), ApiError>;
}
