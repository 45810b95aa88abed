//! Fixed-capacity per-bucket history.
//!
//! Pushing beyond capacity evicts the oldest entry, so the history always
//! holds the most recent readings in arrival order.

use serde::{Deserialize, Serialize};
use std::collections::vec_deque::Iter;
use std::collections::VecDeque;

/// Readings retained per bucket.
pub const HISTORY_CAPACITY: usize = 25;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(
    from = "HistoryRepr<T>",
    bound(deserialize = "T: Deserialize<'de>", serialize = "T: Serialize")
)]
pub struct BoundedHistory<T> {
    items: VecDeque<T>,
    capacity: usize,
}

#[derive(Deserialize)]
struct HistoryRepr<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> From<HistoryRepr<T>> for BoundedHistory<T> {
    /// Stored capacities are clamped to [`HISTORY_CAPACITY`]; only the newest
    /// readings that fit are kept.
    fn from(repr: HistoryRepr<T>) -> Self {
        let mut history = Self::new(repr.capacity.clamp(1, HISTORY_CAPACITY));
        for item in repr.items {
            history.push(item);
        }
        history
    }
}

impl<T> Default for BoundedHistory<T> {
    fn default() -> Self {
        Self::new(HISTORY_CAPACITY)
    }
}

impl<T> BoundedHistory<T> {
    /// # Panics
    /// Panics if `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "history capacity must be greater than 0");
        Self {
            items: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Appends `item`, dropping the oldest entry when full.
    pub fn push(&mut self, item: T) {
        if self.items.len() >= self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Oldest to newest.
    pub fn iter(&self) -> Iter<'_, T> {
        self.items.iter()
    }

    pub fn latest(&self) -> Option<&T> {
        self.items.back()
    }
}
