//! Visited Set (C3): the only shared mutable structure the workers touch.

use std::collections::HashSet;
use std::sync::Mutex;

use crate::model::AttributePath;

/// Process-wide set of already-queued attribute paths.
///
/// A path enters the set exactly once, at whichever of the Finder or a
/// Describer first reports it; it is never removed. Protected by a single
/// mutex: the set only ever does O(1) membership tests and inserts under
/// the lock, so contention is cheap even across many worker threads.
#[derive(Default)]
pub struct VisitedSet {
    inner: Mutex<HashSet<AttributePath>>,
}

impl VisitedSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if `path` was newly inserted — the caller must then
    /// schedule work for it. Returns `false` if another caller already won
    /// the race.
    pub fn try_insert(&self, path: AttributePath) -> bool {
        self.inner.lock().unwrap().insert(path)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let visited = VisitedSet::new();
        assert!(visited.try_insert(AttributePath::from("pkg1")));
        assert!(!visited.try_insert(AttributePath::from("pkg1")));
        assert_eq!(visited.len(), 1);
    }

    #[test]
    fn concurrent_inserts_exactly_one_winner() {
        use std::sync::Arc;
        use std::thread;

        let visited = Arc::new(VisitedSet::new());
        let mut handles = Vec::new();
        for _ in 0..32 {
            let visited = Arc::clone(&visited);
            handles.push(thread::spawn(move || {
                visited.try_insert(AttributePath::from("shared"))
            }));
        }

        let wins: usize = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(wins, 1);
        assert_eq!(visited.len(), 1);
    }
}
