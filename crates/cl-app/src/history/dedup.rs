use std::collections::{HashSet, VecDeque};

use cl_core::EntryKey;

/// Bounded memory of recently seen entry keys.
///
/// Once `window` keys are remembered, the oldest is forgotten to make room.
#[derive(Debug)]
pub struct SeenSet {
    window: usize,
    seen: HashSet<EntryKey>,
    order: VecDeque<EntryKey>,
}

impl SeenSet {
    /// A window of `0` is treated as `1`.
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            window,
            seen: HashSet::with_capacity(window),
            order: VecDeque::with_capacity(window),
        }
    }

    /// Record `key`. Returns `false` if it was already in the window.
    pub fn insert(&mut self, key: EntryKey) -> bool {
        if self.seen.contains(&key) {
            return false;
        }
        if self.order.len() >= self.window {
            if let Some(oldest) = self.order.pop_front() {
                self.seen.remove(&oldest);
            }
        }
        self.seen.insert(key.clone());
        self.order.push_back(key);
        true
    }

    pub fn contains(&self, key: &EntryKey) -> bool {
        self.seen.contains(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
