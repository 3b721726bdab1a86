//! Fixed-capacity, insertion-ordered ring of recent events.

use std::collections::vec_deque::{self, VecDeque};

/// Oldest-first ring buffer. Pushing into a full ring evicts the oldest
/// entry, whatever its timestamp.
#[derive(Debug, Clone)]
pub struct History<T> {
    buf: VecDeque<T>,
    capacity: usize,
}

impl<T> History<T> {
    /// A capacity of zero is raised to one.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            // Storage grows on demand up to `capacity`; idle entities stay small.
            buf: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Append `item`, returning the evicted entry when the ring was full.
    pub fn push(&mut self, item: T) -> Option<T> {
        let evicted = if self.buf.len() == self.capacity {
            self.buf.pop_front()
        } else {
            None
        };
        self.buf.push_back(item);
        evicted
    }

    /// Drop entries from the front while `pred` holds. Returns how many went.
    pub fn pop_front_while(&mut self, mut pred: impl FnMut(&T) -> bool) -> usize {
        let mut dropped = 0;
        while self.buf.front().is_some_and(&mut pred) {
            self.buf.pop_front();
            dropped += 1;
        }
        dropped
    }

    pub fn iter(&self) -> vec_deque::Iter<'_, T> {
        self.buf.iter()
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() == self.capacity
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<'a, T> IntoIterator for &'a History<T> {
    type Item = &'a T;
    type IntoIter = vec_deque::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
