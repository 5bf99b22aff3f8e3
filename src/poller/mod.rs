//! Poller module - fetching, reconciliation and the poll loop
//!
//! This module handles:
//! - Conditional HTTP fetches and status classification
//! - Running a cycle's fetches concurrently under a cap
//! - Expanding board listings into thread targets
//! - Deduplicating and filtering posts before they reach the sink
//! - The run loop and probe mode

mod coordinator;
mod expansion;
mod fetcher;
mod pipeline;
mod probe;
mod scheduler;

pub use coordinator::{decide_next, run, CycleReport, Poller, RunReport};
pub use expansion::{expand_board, Expansion};
pub use fetcher::{build_http_client, classify_status, fetch_target, FetchOutcome};
pub use pipeline::{process, Processed};
pub use probe::{print_probe_reports, ProbeReport};
pub use scheduler::{AdmissionGate, CycleFetches, FetchRequest};
