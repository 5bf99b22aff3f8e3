//! Run statistics
//!
//! Counters gathered by the poll loop and printed when the run ends.

/// Poll run statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PollStatistics {
    /// Completed fetch cycles
    pub cycles: u64,

    /// Fetches that returned new content
    pub successes: u64,

    /// Fetches answered with 304
    pub not_modified: u64,

    /// Fetches that failed and will be retried
    pub transient_failures: u64,

    /// Targets removed after a not-found, blocked or retry-cap outcome
    pub dropped_targets: u64,

    /// Threads added from board listings
    pub threads_discovered: u64,

    /// Posts handed to the sink after dedup and filtering
    pub posts_dispatched: u64,

    /// Posts suppressed by a filter
    pub posts_filtered: u64,

    /// Attachments written to disk
    pub files_downloaded: u64,

    /// Archive writes or downloads that failed
    pub dispatch_failures: u64,
}

impl PollStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total fetch attempts across all cycles
    pub fn total_fetches(&self) -> u64 {
        self.successes + self.not_modified + self.transient_failures + self.dropped_targets
    }

    /// Share of fetches that did not fail, as a percentage
    pub fn success_rate(&self) -> f64 {
        let total = self.total_fetches();
        if total == 0 {
            return 0.0;
        }
        (self.successes + self.not_modified) as f64 / total as f64 * 100.0
    }

    /// Emits the summary as one structured INFO event
    pub fn log(&self) {
        tracing::info!(
            cycles = self.cycles,
            successes = self.successes,
            not_modified = self.not_modified,
            transient_failures = self.transient_failures,
            dropped_targets = self.dropped_targets,
            threads_discovered = self.threads_discovered,
            posts_dispatched = self.posts_dispatched,
            files_downloaded = self.files_downloaded,
            dispatch_failures = self.dispatch_failures,
            "Polling finished"
        );
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &PollStatistics) {
    println!("=== Poll Statistics ===\n");

    println!("Fetches:");
    println!("  Cycles: {}", stats.cycles);
    println!("  New content: {}", stats.successes);
    println!("  Not modified: {}", stats.not_modified);
    println!("  Transient failures: {}", stats.transient_failures);
    println!("  Dropped targets: {}", stats.dropped_targets);
    println!();

    println!("Content:");
    println!("  Threads discovered: {}", stats.threads_discovered);
    println!("  Posts dispatched: {}", stats.posts_dispatched);
    println!("  Posts filtered: {}", stats.posts_filtered);
    println!("  Files downloaded: {}", stats.files_downloaded);
    if stats.dispatch_failures > 0 {
        println!("  Dispatch failures: {}", stats.dispatch_failures);
    }
    println!();

    println!(
        "Success Rate: {:.1}% ({} fetches)",
        stats.success_rate(),
        stats.total_fetches()
    );
}
