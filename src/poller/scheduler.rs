//! Scheduling of one polling cycle's fetches
//!
//! This module handles:
//! - Global concurrency limiting via a semaphore
//! - Spawning every fetch of a cycle onto a JoinSet
//! - Yielding outcomes in completion order
//! - Enforcing the optional cycle deadline

use crate::poller::fetcher::{fetch_target, FetchOutcome};
use crate::state::ConditionalToken;
use futures::Stream;
use reqwest::Client;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinSet;
use tokio::time::Instant;
use url::Url;

/// Caps how many fetches are in flight at once
///
/// A limit of 0 admits everything immediately.
#[derive(Debug, Clone)]
pub struct AdmissionGate {
    semaphore: Option<Arc<Semaphore>>,
}

impl AdmissionGate {
    pub fn new(limit: usize) -> Self {
        Self {
            semaphore: (limit > 0).then(|| Arc::new(Semaphore::new(limit))),
        }
    }

    /// Waits for a slot; the slot is released when the permit drops
    ///
    /// Returns None when the gate is uncapped.
    pub async fn admit(&self) -> Option<OwnedSemaphorePermit> {
        let semaphore = self.semaphore.clone()?;
        // The semaphore is never closed, so acquisition only fails if that changes
        semaphore.acquire_owned().await.ok()
    }
}

/// One fetch request of a cycle
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub uri: Url,
    pub token: Option<ConditionalToken>,
}

/// The in-flight fetches of one cycle
///
/// Implements `Stream`, yielding `(uri, outcome)` as each fetch finishes.
/// Dropping it aborts whatever is still running.
pub struct CycleFetches {
    tasks: JoinSet<(Url, FetchOutcome)>,
}

impl CycleFetches {
    /// Starts a fetch for every request
    ///
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `gate` - Concurrency cap shared by all fetches
    /// * `requests` - Snapshot of the registry taken before the cycle
    /// * `deadline` - Fetches still running at this instant fail as transient
    pub fn spawn(
        client: &Client,
        gate: &AdmissionGate,
        requests: Vec<FetchRequest>,
        deadline: Option<Instant>,
    ) -> Self {
        let mut tasks = JoinSet::new();

        for FetchRequest { uri, token } in requests {
            let client = client.clone();
            let gate = gate.clone();

            tasks.spawn(async move {
                let fetch = async {
                    let _permit = gate.admit().await;
                    fetch_target(&client, &uri, token.as_ref()).await
                };

                let outcome = match deadline {
                    Some(deadline) => tokio::time::timeout_at(deadline, fetch)
                        .await
                        .unwrap_or_else(|_| FetchOutcome::TransientError {
                            code: None,
                            reason: "cycle deadline exceeded".to_string(),
                        }),
                    None => fetch.await,
                };
                (uri, outcome)
            });
        }

        Self { tasks }
    }

    /// Fetches not yet yielded
    pub fn remaining(&self) -> usize {
        self.tasks.len()
    }
}

impl Stream for CycleFetches {
    type Item = (Url, FetchOutcome);

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        loop {
            match this.tasks.poll_join_next(cx) {
                Poll::Ready(Some(Ok(item))) => return Poll::Ready(Some(item)),
                Poll::Ready(Some(Err(e))) => {
                    // A panicked fetch leaves its target untouched for the next cycle
                    tracing::error!(error = %e, "Fetch task failed");
                }
                Poll::Ready(None) => return Poll::Ready(None),
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
