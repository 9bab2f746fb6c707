//! Acknowledgment orchestration over a [`VisitApi`] and a [`ReconciliationStore`].
//!
//! Ordering within one call: overlay entries are applied before any request is
//! sent, and the trailing refresh starts only after every request of the call
//! has settled. Batch members are independent; one failure never cancels or
//! rolls back another.

use std::collections::{BTreeMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tracing::{info, warn};
use vigil_core::{ApiError, Clock, SystemClock, format_for_wire};

use crate::api::VisitApi;
use crate::store::{ReconciliationStore, RefreshOutcome};

/// Per-id result of a batch acknowledgment, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub succeeded: Vec<u64>,
    pub failed: Vec<u64>,
    /// Why each failed id failed.
    pub errors: BTreeMap<u64, ApiError>,
}

impl BatchOutcome {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

pub struct Orchestrator<A, C = SystemClock> {
    api: A,
    store: Arc<ReconciliationStore>,
    clock: C,
    deadline: Duration,
}

impl<A: VisitApi, C: Clock> Orchestrator<A, C> {
    /// `deadline` bounds every call to `api`; calls that exceed it fail with
    /// a timeout error.
    pub fn new(api: A, store: Arc<ReconciliationStore>, clock: C, deadline: Duration) -> Self {
        Self {
            api,
            store,
            clock,
            deadline,
        }
    }

    pub fn store(&self) -> &Arc<ReconciliationStore> {
        &self.store
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T, ApiError>>) -> Result<T, ApiError> {
        match tokio::time::timeout(self.deadline, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::timeout()),
        }
    }

    /// Replace the authoritative set with a fresh fetch.
    ///
    /// A failure is recorded in the store and returned; the previously
    /// loaded records stay in place.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let ticket = self.store.begin_refresh();
        let fetched = self.bounded(self.api.fetch_records()).await;
        let now = self.clock.now();

        match fetched {
            Ok(records) => {
                if let RefreshOutcome::Superseded =
                    self.store.complete_refresh(ticket, Ok(records), now)
                {
                    info!("refresh superseded by a newer one");
                }
                Ok(())
            }
            Err(err) => {
                self.store.complete_refresh(ticket, Err(err.clone()), now);
                Err(err)
            }
        }
    }

    async fn refresh_after_acknowledgment(&self) {
        if let Err(err) = self.refresh().await {
            warn!(error = %err, "refresh after acknowledgment failed");
        }
    }

    /// Acknowledge a single record.
    ///
    /// The view reflects the acknowledgment before the request is sent. A
    /// refresh follows whatever the outcome, so the view converges on what the
    /// server actually stored.
    pub async fn acknowledge(&self, id: u64) -> Result<(), ApiError> {
        let now = self.clock.now();
        let stamp = format_for_wire(now);
        self.store.apply_overlay(id, stamp.clone(), now);

        info!(id, last_verified_date = %stamp, "acknowledging visit");
        let result = self.bounded(self.api.acknowledge(id, &stamp)).await;
        if let Err(err) = &result {
            warn!(id, error = %err, "acknowledgment failed");
        }

        self.refresh_after_acknowledgment().await;
        result
    }

    /// Acknowledge many records at once, best effort.
    ///
    /// Every id is overlaid first, then one request per id runs concurrently.
    /// Exactly one refresh follows once all of them have settled. Duplicate
    /// ids are sent once; an empty batch does nothing.
    pub async fn acknowledge_batch(&self, ids: &[u64]) -> BatchOutcome {
        let mut seen = HashSet::new();
        let ids: Vec<u64> = ids.iter().copied().filter(|id| seen.insert(*id)).collect();
        if ids.is_empty() {
            return BatchOutcome::default();
        }

        let now = self.clock.now();
        let stamp = format_for_wire(now);
        self.store.apply_overlays(&ids, &stamp, now);

        info!(count = ids.len(), last_verified_date = %stamp, "acknowledging batch");
        let stamp = stamp.as_str();
        let settled = join_all(ids.iter().map(|&id| async move {
            (id, self.bounded(self.api.acknowledge(id, stamp)).await)
        }))
        .await;

        let mut outcome = BatchOutcome::default();
        for (id, result) in settled {
            match result {
                Ok(()) => outcome.succeeded.push(id),
                Err(err) => {
                    warn!(id, error = %err, "batch member failed");
                    outcome.failed.push(id);
                    outcome.errors.insert(id, err);
                }
            }
        }

        self.refresh_after_acknowledgment().await;
        info!(
            succeeded = outcome.succeeded.len(),
            failed = outcome.failed.len(),
            "batch acknowledgment settled"
        );
        outcome
    }
}
