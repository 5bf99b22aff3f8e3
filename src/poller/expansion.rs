use crate::site::SiteAdapter;
use crate::state::TargetRegistry;
use serde_json::Value;

/// Threads found in one board listing
#[derive(Debug, Default, PartialEq, Eq)]
pub struct Expansion {
    /// Thread numbers named by the listing
    pub listed: usize,

    /// Threads that were not tracked yet
    pub added: Vec<String>,
}

/// Registers every thread of a board listing as its own target
///
/// Threads already tracked are skipped, so re-expanding a board on later
/// cycles only picks up new threads.
pub fn expand_board(
    registry: &mut TargetRegistry,
    site: &dyn SiteAdapter,
    board: &str,
    listing: &Value,
) -> Expansion {
    let threads = site.extract_threads(listing);
    let listed = threads.len();

    let added = threads
        .into_iter()
        .filter(|thread| registry.add_thread(board, thread, site))
        .collect();

    Expansion { listed, added }
}
