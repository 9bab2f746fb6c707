//! Sync layer: visit API seam, optimistic reconciliation store, batch acknowledgment.

pub mod api;
pub mod config;
pub mod orchestrator;
pub mod store;

#[cfg(feature = "http")]
pub mod http;

pub use api::VisitApi;
pub use config::ClientConfig;
pub use orchestrator::{BatchOutcome, Orchestrator};
pub use store::{AckState, ReconciliationStore, RefreshOutcome, RefreshTicket, Resolution};

#[cfg(feature = "http")]
pub use http::HttpVisitApi;
