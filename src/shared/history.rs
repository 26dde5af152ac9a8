//! Bounded newest-first history buffer

use std::collections::VecDeque;

/// Capacity-capped sequence ordered newest-first.
///
/// Owned by whichever listener feeds it; there is no shared global buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct RollingHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

impl<T> RollingHistory<T> {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Insert as the newest entry, evicting the oldest ones past capacity.
    pub fn push_front(&mut self, item: T) {
        self.items.push_front(item);
        self.items.truncate(self.capacity);
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.front()
    }

    /// Newest-first iteration
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }
}

impl<T: Clone> RollingHistory<T> {
    pub fn to_vec(&self) -> Vec<T> {
        self.items.iter().cloned().collect()
    }
}
