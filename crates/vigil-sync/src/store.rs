//! Optimistic reconciliation store.
//!
//! Holds two layers:
//!
//! - the **authoritative** set: the last successfully fetched records,
//!   classified as of the fetch, replaced wholesale on every refresh;
//! - the **overlay**: proposed `last_verified_date` values for acknowledgments
//!   that have been dispatched but not yet folded into a refresh.
//!
//! The effective view is the authoritative set with each overlay entry applied
//! and re-classified as of the instant captured when that acknowledgment was
//! dispatched. It is published on a [`watch`] channel whenever either layer
//! changes.
//!
//! Per record id an acknowledgment moves `idle -> pending -> confirmed|reverted`.
//! Any completed refresh clears the overlay wholesale and reports how each
//! pending entry resolved. Refreshes are ticketed and only ever move forward:
//! a completion older than one already applied is dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::NaiveDateTime;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use vigil_core::{ApiError, ClassifiedRecord, RawRecord, classify, classify_batch, parse_timestamp};

/// Snapshot of the effective record set.
pub type View = Arc<Vec<ClassifiedRecord>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckState {
    /// No overlay entry for the id.
    Idle,
    /// An acknowledgment is in flight and already reflected in the view.
    Pending,
}

/// How a pending overlay entry ended once a refresh landed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    /// The fresh record carries the proposed timestamp.
    Confirmed,
    /// The fresh record does not (or no longer exists, or the refresh failed).
    Reverted,
}

/// Issued by [`ReconciliationStore::begin_refresh`]; later tickets supersede
/// earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct RefreshTicket(u64);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// A fresh authoritative set replaced the old one.
    Applied { resolutions: Vec<(u64, Resolution)> },
    /// The fetch failed; the old authoritative set stays, the overlay is dropped.
    Failed { reverted: Vec<u64> },
    /// A newer refresh already landed; nothing changed.
    Superseded,
}

#[derive(Debug, Clone)]
struct OverlayEntry {
    proposed: String,
    now: NaiveDateTime,
}

#[derive(Debug, Default)]
struct StoreState {
    authoritative: Vec<ClassifiedRecord>,
    overlay: HashMap<u64, OverlayEntry>,
    issued: u64,
    applied: u64,
    error: Option<ApiError>,
}

impl StoreState {
    fn effective(&self) -> Vec<ClassifiedRecord> {
        self.authoritative
            .iter()
            .map(|record| match self.overlay.get(&record.id()) {
                Some(entry) => overlaid(record, entry),
                None => record.clone(),
            })
            .collect()
    }

    fn drain_overlay(&mut self) -> Vec<(u64, OverlayEntry)> {
        let mut drained: Vec<_> = self.overlay.drain().collect();
        drained.sort_by_key(|(id, _)| *id);
        drained
    }
}

/// Re-classify `record` as if its timestamp were the proposed one.
///
/// If the proposal cannot be classified the record is shown unchanged.
fn overlaid(record: &ClassifiedRecord, entry: &OverlayEntry) -> ClassifiedRecord {
    let mut raw = record.record.clone();
    raw.last_verified_date = Some(entry.proposed.clone());
    match classify(&raw, entry.now) {
        Ok(classified) => classified,
        Err(err) => {
            debug!(id = record.id(), error = %err, "overlay entry not applicable");
            record.clone()
        }
    }
}

pub struct ReconciliationStore {
    state: Mutex<StoreState>,
    view: watch::Sender<View>,
}

impl Default for ReconciliationStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReconciliationStore {
    pub fn new() -> Self {
        let (view, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            state: Mutex::new(StoreState::default()),
            view,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Recompute and publish the effective view. Called with the state locked
    /// so publications keep the order of the state changes behind them.
    fn publish(&self, state: &StoreState) {
        self.view.send_replace(Arc::new(state.effective()));
    }

    // ── Reads ──

    /// Current effective view.
    pub fn effective(&self) -> View {
        self.view.borrow().clone()
    }

    /// Receive every new effective view.
    ///
    /// Do not hold a borrow of the receiver across calls into the store.
    pub fn subscribe(&self) -> watch::Receiver<View> {
        self.view.subscribe()
    }

    /// The last confirmed record set, without overlay entries.
    pub fn authoritative(&self) -> Vec<ClassifiedRecord> {
        self.lock().authoritative.clone()
    }

    pub fn ack_state(&self, id: u64) -> AckState {
        if self.lock().overlay.contains_key(&id) {
            AckState::Pending
        } else {
            AckState::Idle
        }
    }

    /// Ids with an acknowledgment in flight, ascending.
    pub fn pending_ids(&self) -> Vec<u64> {
        let mut ids: Vec<u64> = self.lock().overlay.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// True while a refresh has been started and the newest one has not landed.
    pub fn is_loading(&self) -> bool {
        let state = self.lock();
        state.issued > state.applied
    }

    /// Error of the most recent failed refresh, cleared when a new one starts.
    pub fn last_error(&self) -> Option<ApiError> {
        self.lock().error.clone()
    }

    // ── Overlay ──

    /// Reflect a dispatched acknowledgment immediately.
    ///
    /// `now` is the instant captured for the acknowledgment; the overlaid
    /// record is classified against it, not against the fetch time.
    pub fn apply_overlay(&self, id: u64, proposed: impl Into<String>, now: NaiveDateTime) {
        let mut state = self.lock();
        state.overlay.insert(
            id,
            OverlayEntry {
                proposed: proposed.into(),
                now,
            },
        );
        self.publish(&state);
    }

    /// Overlay every id in `ids` with the same proposal and publish once, so
    /// subscribers never see part of a batch.
    pub fn apply_overlays(&self, ids: &[u64], proposed: &str, now: NaiveDateTime) {
        let mut state = self.lock();
        for &id in ids {
            state.overlay.insert(
                id,
                OverlayEntry {
                    proposed: proposed.to_string(),
                    now,
                },
            );
        }
        self.publish(&state);
    }

    // ── Refresh ──

    pub fn begin_refresh(&self) -> RefreshTicket {
        let mut state = self.lock();
        state.issued += 1;
        state.error = None;
        RefreshTicket(state.issued)
    }

    /// Fold the result of the fetch started with `ticket` into the store.
    ///
    /// On success the records are classified as of `now` and replace the
    /// authoritative set. Either way the overlay is cleared.
    pub fn complete_refresh(
        &self,
        ticket: RefreshTicket,
        result: Result<Vec<RawRecord>, ApiError>,
        now: NaiveDateTime,
    ) -> RefreshOutcome {
        let mut state = self.lock();
        if ticket.0 <= state.applied {
            debug!(ticket = ticket.0, applied = state.applied, "stale refresh dropped");
            return RefreshOutcome::Superseded;
        }
        state.applied = ticket.0;
        let pending = state.drain_overlay();

        let outcome = match result {
            Ok(raw) => {
                state.authoritative = classify_batch(&raw, now);
                state.error = None;
                let resolutions: Vec<(u64, Resolution)> = pending
                    .into_iter()
                    .map(|(id, entry)| (id, resolve(&state.authoritative, id, &entry)))
                    .collect();
                for (id, resolution) in &resolutions {
                    debug!(id, ?resolution, "overlay entry resolved");
                }
                info!(
                    received = raw.len(),
                    classified = state.authoritative.len(),
                    "authoritative set replaced"
                );
                RefreshOutcome::Applied { resolutions }
            }
            Err(err) => {
                warn!(error = %err, "refresh failed, keeping last confirmed set");
                state.error = Some(err);
                RefreshOutcome::Failed {
                    reverted: pending.into_iter().map(|(id, _)| id).collect(),
                }
            }
        };

        self.publish(&state);
        outcome
    }
}

/// Compares instants rather than strings, so a server that reformats the
/// timestamp still confirms the entry.
fn resolve(authoritative: &[ClassifiedRecord], id: u64, entry: &OverlayEntry) -> Resolution {
    let Some(proposed) = parse_timestamp(&entry.proposed) else {
        return Resolution::Reverted;
    };
    let confirmed = authoritative
        .iter()
        .any(|record| record.id() == id && record.last_verified == proposed);
    if confirmed {
        Resolution::Confirmed
    } else {
        Resolution::Reverted
    }
}
