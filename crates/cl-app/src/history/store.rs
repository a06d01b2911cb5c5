use std::collections::VecDeque;
use std::num::NonZeroUsize;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use cl_core::ClipboardEntry;

/// Ordered, optionally bounded log of clipboard entries.
///
/// Entries are kept in arrival order and never reordered. When a capacity is
/// set, the oldest entry is evicted before an append would exceed it.
///
/// 剪贴板历史：按到达顺序保存，超出容量时淘汰最旧条目。
#[derive(Debug)]
pub struct HistoryStore {
    capacity: Option<NonZeroUsize>,
    inner: RwLock<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    entries: VecDeque<ClipboardEntry>,
    /// Position the next append will receive.
    next_position: u64,
}

impl HistoryStore {
    /// `None` keeps every entry.
    pub fn new(capacity: Option<NonZeroUsize>) -> Self {
        Self {
            capacity,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub fn unbounded() -> Self {
        Self::new(None)
    }

    pub fn capacity(&self) -> Option<NonZeroUsize> {
        self.capacity
    }

    /// Append at the end and return the entry's position.
    ///
    /// Positions count every entry ever appended, so they keep increasing
    /// after evictions.
    pub fn append(&self, entry: ClipboardEntry) -> u64 {
        let mut inner = self.write();
        if let Some(capacity) = self.capacity {
            while inner.entries.len() >= capacity.get() {
                inner.entries.pop_front();
            }
        }
        inner.entries.push_back(entry);

        let position = inner.next_position;
        inner.next_position += 1;
        position
    }

    /// Point-in-time copy of the history, oldest first.
    pub fn snapshot(&self) -> Vec<ClipboardEntry> {
        self.read().entries.iter().cloned().collect()
    }

    pub fn latest(&self) -> Option<ClipboardEntry> {
        self.read().entries.back().cloned()
    }

    pub fn len(&self) -> usize {
        self.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::unbounded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use cl_core::InstanceId;
    use std::sync::Arc;

    fn entry(content: &str, sequence: u64) -> ClipboardEntry {
        ClipboardEntry::local(content, InstanceId::from("A"), 1, sequence, Utc::now())
    }

    fn contents(store: &HistoryStore) -> Vec<String> {
        store.snapshot().into_iter().map(|e| e.content).collect()
    }

    #[test]
    fn test_snapshot_preserves_arrival_order() {
        let store = HistoryStore::unbounded();

        // Arrival order wins over sequence order.
        store.append(entry("a", 3));
        store.append(entry("b", 1));
        store.append(entry("c", 2));

        assert_eq!(contents(&store), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_capacity_evicts_oldest_first() {
        let store = HistoryStore::new(NonZeroUsize::new(3));

        for (i, content) in ["a", "b", "c", "d"].into_iter().enumerate() {
            store.append(entry(content, i as u64));
        }

        assert_eq!(store.len(), 3);
        assert_eq!(contents(&store), vec!["b", "c", "d"]);
    }

    #[test]
    fn test_positions_keep_increasing_after_eviction() {
        let store = HistoryStore::new(NonZeroUsize::new(1));

        assert_eq!(store.append(entry("a", 1)), 0);
        assert_eq!(store.append(entry("b", 2)), 1);
        assert_eq!(store.append(entry("c", 3)), 2);
        assert_eq!(contents(&store), vec!["c"]);
    }

    #[test]
    fn test_empty_store() {
        let store = HistoryStore::default();

        assert!(store.is_empty());
        assert!(store.snapshot().is_empty());
        assert_eq!(store.latest(), None);
        assert_eq!(store.capacity(), None);
    }

    #[test]
    fn test_snapshot_is_detached_from_later_appends() {
        let store = HistoryStore::unbounded();
        store.append(entry("a", 1));

        let snapshot = store.snapshot();
        store.append(entry("b", 2));

        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.latest().map(|e| e.content), Some("b".to_string()));
    }

    #[test]
    fn test_concurrent_appends_are_all_recorded() {
        let store = Arc::new(HistoryStore::new(NonZeroUsize::new(1_000)));

        let writers: Vec<_> = (0..4)
            .map(|w| {
                let store = store.clone();
                std::thread::spawn(move || {
                    for i in 0..100 {
                        store.append(entry(&format!("{w}-{i}"), i));
                        let _ = store.snapshot();
                    }
                })
            })
            .collect();
        for writer in writers {
            writer.join().unwrap();
        }

        assert_eq!(store.len(), 400);
    }
}
