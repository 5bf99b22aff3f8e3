use crate::poller::FetchOutcome;
use crate::site::SiteAdapter;
use crate::state::Target;
use crate::TargetError;
use indexmap::IndexMap;
use url::Url;

/// How a fetch outcome changed the registry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// New content arrived and the token was replaced
    Refreshed {
        board: String,
        thread: Option<String>,
    },
    /// Content unchanged since the last fetch
    Unchanged,
    /// Transient failure; the target stays for the next cycle
    Retrying { failures: u32 },
    /// The target was removed
    Dropped(Target),
    /// The URI was no longer tracked
    Untracked,
}

/// Ordered map from fetch URI to target state
///
/// Mutation only happens between snapshots: callers take `all_uris()`,
/// fetch, then fold each outcome back in with `apply_outcome`.
#[derive(Debug, Default)]
pub struct TargetRegistry {
    targets: IndexMap<Url, Target>,
    max_transient_failures: u32,
}

impl TargetRegistry {
    /// Creates an empty registry
    ///
    /// # Arguments
    ///
    /// * `max_transient_failures` - Consecutive transient failures before a
    ///   target is dropped; 0 retries forever
    pub fn new(max_transient_failures: u32) -> Self {
        Self {
            targets: IndexMap::new(),
            max_transient_failures,
        }
    }

    /// Resolves a board and optional thread into a tracked target
    ///
    /// Registering a URI that is already tracked leaves the existing target
    /// untouched and returns it.
    ///
    /// # Returns
    ///
    /// * `Ok(Target)` - The tracked target
    /// * `Err(TargetError::InvalidTarget)` - The site cannot form a URI
    pub fn register(
        &mut self,
        board: &str,
        thread: Option<&str>,
        site: &dyn SiteAdapter,
    ) -> Result<Target, TargetError> {
        let uri = site.build_uri(board, thread).ok_or_else(|| {
            TargetError::InvalidTarget(match thread {
                Some(thread) => format!("/{}/{}", board, thread),
                None => format!("/{}/", board),
            })
        })?;

        let target = self.targets.entry(uri.clone()).or_insert_with(|| {
            Target::new(uri, board.trim(), thread.map(str::to_string))
        });
        Ok(target.clone())
    }

    /// Tracks a thread discovered in a board listing
    ///
    /// Returns true when the thread was not tracked before.
    pub fn add_thread(&mut self, board: &str, thread: &str, site: &dyn SiteAdapter) -> bool {
        let Some(uri) = site.build_uri(board, Some(thread)) else {
            tracing::debug!(board = %board, thread = %thread, "Listing named an unusable thread");
            return false;
        };
        if self.targets.contains_key(&uri) {
            return false;
        }

        self.targets.insert(
            uri.clone(),
            Target::new(uri, board, Some(thread.to_string())),
        );
        true
    }

    /// Snapshot of every tracked URI, in registration order
    pub fn all_uris(&self) -> Vec<Url> {
        self.targets.keys().cloned().collect()
    }

    pub fn get(&self, uri: &Url) -> Option<&Target> {
        self.targets.get(uri)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Folds a fetch outcome into the target it belongs to
    ///
    /// Not-found and blocked targets are removed. Transient failures keep
    /// the target unless the configured failure cap is reached. A success
    /// replaces the conditional token, a not-modified leaves it alone.
    pub fn apply_outcome(&mut self, uri: &Url, outcome: &FetchOutcome) -> Reconciled {
        let Some(target) = self.targets.get_mut(uri) else {
            return Reconciled::Untracked;
        };
        target.polls = target.polls.saturating_add(1);

        match outcome {
            FetchOutcome::Success { token, .. } => {
                target.token = token.clone();
                target.consecutive_failures = 0;
                Reconciled::Refreshed {
                    board: target.board.clone(),
                    thread: target.thread.clone(),
                }
            }
            FetchOutcome::NotModified => {
                target.consecutive_failures = 0;
                Reconciled::Unchanged
            }
            FetchOutcome::NotFound | FetchOutcome::Blocked => self.drop_target(uri),
            FetchOutcome::TransientError { .. } => {
                target.consecutive_failures = target.consecutive_failures.saturating_add(1);
                let failures = target.consecutive_failures;
                if self.max_transient_failures > 0 && failures >= self.max_transient_failures {
                    self.drop_target(uri)
                } else {
                    Reconciled::Retrying { failures }
                }
            }
        }
    }

    /// Removes a target whose work is finished
    pub fn complete(&mut self, uri: &Url) -> Option<Target> {
        self.targets.shift_remove(uri)
    }

    /// True when only threads remain and each has been fetched at least once
    pub fn all_threads_polled(&self) -> bool {
        self.targets
            .values()
            .all(|target| target.is_thread() && target.polls > 0)
    }

    fn drop_target(&mut self, uri: &Url) -> Reconciled {
        match self.targets.shift_remove(uri) {
            Some(target) => Reconciled::Dropped(target),
            None => Reconciled::Untracked,
        }
    }
}
