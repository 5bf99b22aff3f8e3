use std::collections::HashSet;

/// Post identifiers observed so far in this run
///
/// Keys are scoped by board since post numbers are only unique per board.
/// Entries are never removed.
#[derive(Debug, Default)]
pub struct SeenCache {
    seen: HashSet<(String, String)>,
}

impl SeenCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a post, returning true if it had not been seen before
    pub fn insert(&mut self, board: &str, id: &str) -> bool {
        self.seen.insert((board.to_string(), id.to_string()))
    }

    pub fn contains(&self, board: &str, id: &str) -> bool {
        self.seen.contains(&(board.to_string(), id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
