//! Poll coordinator - main polling loop
//!
//! This module contains the loop that drives a run:
//! - Registering operator targets
//! - Fetching a snapshot of the registry once per cycle
//! - Folding outcomes back into the registry as they arrive
//! - Expanding boards into threads and passing new posts to the sink
//! - Deciding whether to sleep, repeat or stop, and honouring interrupts

use crate::config::{Config, OutputMode, RunOptions};
use crate::filter::FilterPredicate;
use crate::output::{resolve_output_path, Downloader, PollStatistics, Sink};
use crate::poller::expansion::expand_board;
use crate::poller::pipeline;
use crate::poller::probe::ProbeReport;
use crate::poller::scheduler::{AdmissionGate, CycleFetches, FetchRequest};
use crate::poller::{build_http_client, FetchOutcome};
use crate::site::{parse_target, SiteAdapter, SiteRegistry};
use crate::state::{PollState, Reconciled, SeenCache, TargetRegistry};
use crate::storage::open_archive;
use crate::{ChandereError, Result, TargetError};
use futures::StreamExt;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Counts for one cycle
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Outcomes received
    pub fetched: usize,
    pub successes: usize,
    pub not_modified: usize,
    /// Transient failures that kept their target
    pub transient: usize,
    pub dropped: usize,
    /// Threads added from board listings
    pub threads_added: usize,
    /// The cycle was cut short by an interrupt
    pub interrupted: bool,
}

/// Everything a run produced
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub stats: PollStatistics,
    /// Per-target results, only filled in probe mode
    pub probes: Vec<ProbeReport>,
}

/// Chooses what follows a finished cycle
///
/// | Registry | Mode | Next |
/// |----------|------|------|
/// | empty | any | Done |
/// | not empty | continuous | Continuing |
/// | only threads, each polled | run-once | Done |
/// | boards or unpolled threads left | run-once | Draining |
pub fn decide_next(continuous: bool, registry: &TargetRegistry) -> PollState {
    if registry.is_empty() {
        PollState::Done
    } else if continuous {
        PollState::Continuing
    } else if registry.all_threads_polled() {
        PollState::Done
    } else {
        PollState::Draining
    }
}

/// Owns the state of one polling run
pub struct Poller {
    site: Arc<dyn SiteAdapter>,
    client: Client,
    gate: AdmissionGate,
    registry: TargetRegistry,
    seen: SeenCache,
    filters: Vec<FilterPredicate>,
    sink: Sink,
    continuous: bool,
    interval: Duration,
    retry_delay: Duration,
    cycle_timeout: Option<Duration>,
    state: PollState,
    stats: PollStatistics,
}

impl Poller {
    /// Creates a poller with an empty registry that discards posts
    ///
    /// # Arguments
    ///
    /// * `config` - Loaded configuration; the poller section is used
    /// * `site` - Adapter for the imageboard being polled
    /// * `client` - Shared HTTP client
    /// * `filters` - Suppression predicates
    /// * `continuous` - Poll forever instead of stopping once threads are covered
    pub fn new(
        config: &Config,
        site: Arc<dyn SiteAdapter>,
        client: Client,
        filters: Vec<FilterPredicate>,
        continuous: bool,
    ) -> Self {
        Self {
            site,
            client,
            gate: AdmissionGate::new(config.poller.concurrency),
            registry: TargetRegistry::new(config.poller.max_transient_failures),
            seen: SeenCache::new(),
            filters,
            sink: Sink::Discard,
            continuous,
            interval: config.poller.interval(),
            retry_delay: config.poller.retry_delay(),
            cycle_timeout: config.poller.cycle_timeout(),
            state: PollState::Idle,
            stats: PollStatistics::new(),
        }
    }

    /// Replaces the sink new posts are delivered to
    pub fn with_sink(mut self, sink: Sink) -> Self {
        self.sink = sink;
        self
    }

    /// Registers operator-supplied targets
    ///
    /// Invalid targets are logged and skipped.
    ///
    /// # Returns
    ///
    /// * `Ok(usize)` - Number of valid targets
    /// * `Err(ChandereError::NoValidTargets)` - Not one target was usable
    pub fn register_targets(&mut self, targets: &[String]) -> Result<usize> {
        let mut valid = 0;

        for raw in targets {
            let registered = parse_target(raw)
                .ok_or_else(|| TargetError::InvalidTarget(raw.clone()))
                .and_then(|(board, thread)| {
                    self.registry
                        .register(&board, thread.as_deref(), self.site.as_ref())
                });

            match registered {
                Ok(target) => {
                    tracing::debug!(target = %target.label(), uri = %target.uri, "Registered target");
                    valid += 1;
                }
                Err(e) => tracing::error!(input = %raw, "{}", e),
            }
        }

        if valid == 0 {
            return Err(ChandereError::NoValidTargets);
        }
        tracing::info!(
            site = %self.site.name(),
            targets = self.registry.len(),
            "Registered {} target(s)",
            valid
        );
        Ok(valid)
    }

    pub fn registry(&self) -> &TargetRegistry {
        &self.registry
    }

    pub fn seen(&self) -> &SeenCache {
        &self.seen
    }

    pub fn state(&self) -> PollState {
        self.state
    }

    pub fn stats(&self) -> &PollStatistics {
        &self.stats
    }

    /// Polls until the registry is exhausted, run-once mode is satisfied,
    /// or `cancel` fires
    ///
    /// Cancellation aborts in-flight fetches but never a sink write that
    /// has already started.
    pub async fn run(&mut self, cancel: &CancellationToken) -> PollStatistics {
        while !self.registry.is_empty() {
            let report = self.run_cycle(cancel).await;
            if report.interrupted {
                tracing::info!("Interrupted, stopping after {} cycle(s)", self.stats.cycles);
                break;
            }

            self.state = decide_next(self.continuous, &self.registry);
            if self.state.is_terminal() {
                break;
            }
            let pause = match self.state {
                PollState::Continuing => self.interval,
                PollState::Draining if report.transient > 0 => self.retry_delay,
                _ => Duration::ZERO,
            };

            if pause.is_zero() {
                continue;
            }
            tracing::debug!(state = %self.state, seconds = pause.as_secs(), "Sleeping");
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Interrupted, stopping after {} cycle(s)", self.stats.cycles);
                    break;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }

        if self.registry.is_empty() && self.continuous {
            tracing::warn!("No targets left to poll");
        }
        self.state = PollState::Done;
        self.stats.log();
        self.stats.clone()
    }

    /// Fetches every tracked target once and reconciles the outcomes
    pub async fn run_cycle(&mut self, cancel: &CancellationToken) -> CycleReport {
        let mut report = CycleReport::default();
        let requests = self.snapshot();
        tracing::debug!(
            cycle = self.stats.cycles + 1,
            targets = requests.len(),
            "Starting cycle"
        );

        self.state = PollState::Fetching;
        let deadline = self.cycle_timeout.map(|timeout| Instant::now() + timeout);
        let mut fetches = CycleFetches::spawn(&self.client, &self.gate, requests, deadline);

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    report.interrupted = true;
                    break;
                }
                next = fetches.next() => next,
            };
            let Some((uri, outcome)) = next else {
                break;
            };

            self.state = PollState::Reconciling;
            report.fetched += 1;
            self.reconcile(&uri, outcome, &mut report).await;
        }
        if report.interrupted {
            tracing::debug!(aborted = fetches.remaining(), "Abandoning in-flight fetches");
        }
        drop(fetches);

        self.stats.cycles += 1;
        tracing::debug!(
            cycle = self.stats.cycles,
            fetched = report.fetched,
            successes = report.successes,
            not_modified = report.not_modified,
            transient = report.transient,
            dropped = report.dropped,
            "Cycle finished"
        );
        report
    }

    /// Fetches every tracked target once without writing anything
    ///
    /// Reports come back in registration order.
    pub async fn probe(&mut self, cancel: &CancellationToken) -> Vec<ProbeReport> {
        let requests = self.snapshot();
        let order = self.registry.all_uris();

        self.state = PollState::Fetching;
        let deadline = self.cycle_timeout.map(|timeout| Instant::now() + timeout);
        let mut fetches = CycleFetches::spawn(&self.client, &self.gate, requests, deadline);
        let mut reports = Vec::new();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                next = fetches.next() => next,
            };
            let Some((uri, outcome)) = next else {
                break;
            };
            let Some(target) = self.registry.get(&uri) else {
                continue;
            };

            match &outcome {
                FetchOutcome::Success { .. } => self.stats.successes += 1,
                FetchOutcome::NotModified => self.stats.not_modified += 1,
                FetchOutcome::NotFound | FetchOutcome::Blocked => self.stats.dropped_targets += 1,
                FetchOutcome::TransientError { .. } => self.stats.transient_failures += 1,
            }
            reports.push(ProbeReport::new(target, &outcome, self.site.as_ref()));
        }

        reports.sort_by_key(|report| order.iter().position(|uri| uri == &report.uri));
        self.stats.cycles += 1;
        self.state = PollState::Done;
        reports
    }

    fn snapshot(&self) -> Vec<FetchRequest> {
        self.registry
            .iter()
            .map(|target| FetchRequest {
                uri: target.uri.clone(),
                token: target.token.clone(),
            })
            .collect()
    }

    async fn reconcile(&mut self, uri: &Url, outcome: FetchOutcome, report: &mut CycleReport) {
        let label = self
            .registry
            .get(uri)
            .map(|target| target.label())
            .unwrap_or_else(|| uri.to_string());

        match self.registry.apply_outcome(uri, &outcome) {
            Reconciled::Refreshed { board, thread } => {
                report.successes += 1;
                self.stats.successes += 1;
                let FetchOutcome::Success { content, .. } = outcome else {
                    return;
                };
                match thread {
                    None => self.expand(uri, &label, &board, &content, report),
                    Some(_) => self.deliver(&label, &board, &content).await,
                }
            }
            Reconciled::Unchanged => {
                report.not_modified += 1;
                self.stats.not_modified += 1;
                tracing::debug!(target = %label, "Not modified");
            }
            Reconciled::Retrying { failures } => {
                report.transient += 1;
                self.stats.transient_failures += 1;
                tracing::info!(
                    target = %label,
                    failures = failures,
                    "Fetch failed, retrying next cycle: {}",
                    describe(&outcome)
                );
            }
            Reconciled::Dropped(target) => {
                report.dropped += 1;
                self.stats.dropped_targets += 1;
                if outcome.is_fatal() {
                    tracing::error!(target = %label, uri = %target.uri, "Dropping target: {}", describe(&outcome));
                } else {
                    tracing::error!(
                        target = %label,
                        failures = target.consecutive_failures,
                        "Giving up on target: {}",
                        describe(&outcome)
                    );
                }
            }
            Reconciled::Untracked => {
                tracing::debug!(uri = %uri, "Outcome for untracked target ignored");
            }
        }
    }

    fn expand(
        &mut self,
        uri: &Url,
        label: &str,
        board: &str,
        listing: &Value,
        report: &mut CycleReport,
    ) {
        let expansion = expand_board(&mut self.registry, self.site.as_ref(), board, listing);
        report.threads_added += expansion.added.len();
        self.stats.threads_discovered += expansion.added.len() as u64;
        tracing::info!(
            target = %label,
            listed = expansion.listed,
            "Found {} new thread(s)",
            expansion.added.len()
        );

        // Run-once mode reads each board listing a single time
        if !self.continuous {
            self.registry.complete(uri);
        }
    }

    async fn deliver(&mut self, label: &str, board: &str, thread: &Value) {
        let posts = self.site.extract_posts(thread);
        let processed = pipeline::process(posts, board, &mut self.seen, &self.filters);
        self.stats.posts_filtered += processed.filtered as u64;

        if processed.survivors.is_empty() {
            tracing::debug!(target = %label, duplicates = processed.duplicates, "No new posts");
            return;
        }

        tracing::info!(
            target = %label,
            filtered = processed.filtered,
            "{} new post(s)",
            processed.survivors.len()
        );
        self.stats.posts_dispatched += processed.survivors.len() as u64;

        let dispatch = self
            .sink
            .dispatch(self.site.as_ref(), board, &processed.survivors)
            .await;
        self.stats.files_downloaded += dispatch.downloaded as u64;
        self.stats.dispatch_failures += dispatch.errors.len() as u64;
    }
}

fn describe(outcome: &FetchOutcome) -> String {
    match outcome {
        FetchOutcome::TransientError {
            code: Some(code),
            reason,
        } => format!("HTTP {}: {}", code, reason),
        FetchOutcome::TransientError { code: None, reason } => reason.clone(),
        FetchOutcome::NotFound => "not found (404)".to_string(),
        FetchOutcome::Blocked => "blocked (403)".to_string(),
        other => other.kind().to_string(),
    }
}

/// Runs one complete poll from operator options
///
/// # Flow
///
/// 1. Look up the site adapter
/// 2. Register targets; none valid is fatal
/// 3. Validate the output path and open the sink
/// 4. Poll (or probe) until done or cancelled
///
/// # Returns
///
/// * `Ok(RunReport)` - Statistics, plus per-target results in probe mode
/// * `Err(ChandereError)` - A fatal startup error; nothing was fetched
pub async fn run(
    config: &Config,
    options: RunOptions,
    sites: &SiteRegistry,
    cancel: CancellationToken,
) -> Result<RunReport> {
    let site = sites
        .get(&options.site)
        .ok_or_else(|| TargetError::UnknownSite(options.site.clone()))?;
    let client = build_http_client(config)?;

    let mut poller = Poller::new(
        config,
        site,
        client.clone(),
        options.filters,
        options.continuous,
    );
    poller.register_targets(&options.targets)?;

    let output = resolve_output_path(&options.output, options.mode, options.format)?;
    let sink = match options.mode {
        OutputMode::Download => Sink::Download(Downloader::new(
            client,
            output.clone(),
            config.poller.concurrency,
        )),
        OutputMode::Archive => Sink::Archive(open_archive(options.format, &output)?),
        OutputMode::Probe => Sink::Discard,
    };
    let mut poller = poller.with_sink(sink);

    if options.mode == OutputMode::Probe {
        let probes = poller.probe(&cancel).await;
        return Ok(RunReport {
            stats: poller.stats().clone(),
            probes,
        });
    }

    tracing::info!(
        output = %output.display(),
        mode = ?options.mode,
        continuous = options.continuous,
        "Polling started"
    );
    let stats = poller.run(&cancel).await;
    Ok(RunReport {
        stats,
        probes: Vec::new(),
    })
}
