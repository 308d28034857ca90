//! Duplicate-delivery suppression.

use std::collections::VecDeque;

/// Bounded FIFO window of recently seen message identifiers.
///
/// The underlying link may deliver the same message more than once; a
/// message whose identifier is still in the window is dropped. The oldest
/// identifier is evicted first once the window is at capacity.
#[derive(Debug)]
pub struct RecentWindow {
    capacity: usize,
    ids: VecDeque<String>,
}

impl RecentWindow {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ids: VecDeque::with_capacity(capacity),
        }
    }

    /// Record an identifier. Returns true when it was not in the window
    /// (the message is fresh and should be dispatched).
    pub fn observe(&mut self, id: &str) -> bool {
        if self.capacity == 0 {
            return true;
        }
        if self.ids.iter().any(|seen| seen == id) {
            return false;
        }
        if self.ids.len() == self.capacity {
            self.ids.pop_front();
        }
        self.ids.push_back(id.to_string());
        true
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_within_window_is_dropped() {
        let mut window = RecentWindow::new(10);
        assert!(window.observe("a"));
        assert!(!window.observe("a"));
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn test_fifo_eviction() {
        let mut window = RecentWindow::new(2);
        assert!(window.observe("a"));
        assert!(window.observe("b"));
        assert!(window.observe("c")); // evicts "a"

        assert_eq!(window.len(), 2);
        assert!(window.observe("a")); // no longer deduped
        assert!(!window.observe("c")); // still in the window
    }

    #[test]
    fn test_never_exceeds_capacity() {
        let mut window = RecentWindow::new(3);
        for i in 0..20 {
            window.observe(&i.to_string());
            assert!(window.len() <= 3);
        }
    }
}
