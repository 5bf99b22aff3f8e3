//! Post pipeline between a thread fetch and the sink
//!
//! Every post examined is recorded in the seen cache, filtered or not, so a
//! post is delivered at most once per run and a filtered post never comes
//! back on a later cycle.

use crate::filter::{is_filtered, FilterPredicate};
use crate::site::Post;
use crate::state::SeenCache;

/// Posts of one thread fetch after dedup and filtering
#[derive(Debug, Default)]
pub struct Processed {
    /// Posts to hand to the sink, in thread order
    pub survivors: Vec<Post>,

    /// Posts already seen in an earlier fetch
    pub duplicates: usize,

    /// New posts suppressed by a filter
    pub filtered: usize,
}

/// Removes posts already seen and posts matching any filter
///
/// # Arguments
///
/// * `posts` - Posts extracted from one thread, in thread order
/// * `board` - Board the thread belongs to; ids are scoped by it
/// * `seen` - Run-wide cache of examined post ids
/// * `filters` - Suppression predicates
pub fn process(
    posts: Vec<Post>,
    board: &str,
    seen: &mut SeenCache,
    filters: &[FilterPredicate],
) -> Processed {
    let mut processed = Processed::default();

    for post in posts {
        if !seen.insert(board, &post.id) {
            processed.duplicates += 1;
        } else if is_filtered(&post, filters) {
            processed.filtered += 1;
        } else {
            processed.survivors.push(post);
        }
    }

    processed
}
