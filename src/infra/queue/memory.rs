//! In-memory pending-work collections.
//!
//! The ready queue orders admitted items by descending priority with FIFO
//! ties; the delay heap parks retries until their backoff elapses. Both are
//! owned exclusively by the scheduler.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use tokio::time::Instant;
use uuid::Uuid;

use crate::core::work::WorkItem;

/// Max-heap entry: higher priority first, FIFO within a priority band.
struct ReadyEntry<T> {
    item: WorkItem<T>,
}

impl<T> PartialEq for ReadyEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.item.id == other.item.id
    }
}

impl<T> Eq for ReadyEntry<T> {}

impl<T> PartialOrd for ReadyEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ReadyEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.item
            .priority
            .cmp(&other.item.priority)
            .then_with(|| other.item.seq.cmp(&self.item.seq))
    }
}

/// Priority-ordered collection of items eligible for dispatch.
pub(crate) struct ReadyQueue<T> {
    heap: BinaryHeap<ReadyEntry<T>>,
}

impl<T> ReadyQueue<T> {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub(crate) fn push(&mut self, item: WorkItem<T>) {
        self.heap.push(ReadyEntry { item });
    }

    pub(crate) fn pop(&mut self) -> Option<WorkItem<T>> {
        self.heap.pop().map(|entry| entry.item)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove an item by id, rebuilding the heap. Returns whether it was
    /// present.
    pub(crate) fn remove(&mut self, id: Uuid) -> bool {
        let before = self.heap.len();
        let entries: Vec<_> = self.heap.drain().collect();
        self.heap = entries
            .into_iter()
            .filter(|entry| entry.item.id != id)
            .collect();
        before != self.heap.len()
    }
}

/// Min-heap entry keyed by ready time; the earliest wake comes out first.
struct DelayEntry<T> {
    ready_at: Instant,
    item: WorkItem<T>,
}

impl<T> PartialEq for DelayEntry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.item.id == other.item.id
    }
}

impl<T> Eq for DelayEntry<T> {}

impl<T> PartialOrd for DelayEntry<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for DelayEntry<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap behavior on BinaryHeap.
        other
            .ready_at
            .cmp(&self.ready_at)
            .then_with(|| other.item.seq.cmp(&self.item.seq))
    }
}

/// Retries parked until their backoff delay elapses.
pub(crate) struct DelayHeap<T> {
    heap: BinaryHeap<DelayEntry<T>>,
}

impl<T> DelayHeap<T> {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    pub(crate) fn push(&mut self, item: WorkItem<T>, ready_at: Instant) {
        self.heap.push(DelayEntry { ready_at, item });
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Earliest ready time among parked items.
    pub(crate) fn next_ready_at(&self) -> Option<Instant> {
        self.heap.peek().map(|entry| entry.ready_at)
    }

    /// Pop every item whose ready time has passed.
    pub(crate) fn pop_due(&mut self, now: Instant) -> Vec<WorkItem<T>> {
        let mut due = Vec::new();
        while self.heap.peek().is_some_and(|entry| entry.ready_at <= now) {
            if let Some(entry) = self.heap.pop() {
                due.push(entry.item);
            }
        }
        due
    }

    /// Remove an item by id, rebuilding the heap. Returns whether it was
    /// present.
    pub(crate) fn remove(&mut self, id: Uuid) -> bool {
        let before = self.heap.len();
        let entries: Vec<_> = self.heap.drain().collect();
        self.heap = entries
            .into_iter()
            .filter(|entry| entry.item.id != id)
            .collect();
        before != self.heap.len()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::core::error::WorkError;
    use crate::core::work::{FnWork, OutcomeSlot};

    fn make_item(priority: i64, seq: u64) -> WorkItem<u32> {
        let (outcome, _rx) = OutcomeSlot::new();
        WorkItem {
            id: Uuid::new_v4(),
            work: Arc::new(FnWork::new(|| async { Ok::<u32, WorkError>(0) })),
            priority,
            retry_count: 0,
            max_retries: 3,
            seq,
            outcome,
        }
    }

    #[test]
    fn pops_in_descending_priority_order() {
        let mut queue = ReadyQueue::new();
        queue.push(make_item(0, 0));
        queue.push(make_item(10, 1));
        queue.push(make_item(5, 2));

        assert_eq!(queue.pop().unwrap().priority, 10);
        assert_eq!(queue.pop().unwrap().priority, 5);
        assert_eq!(queue.pop().unwrap().priority, 0);
        assert!(queue.pop().is_none());
    }

    #[test]
    fn equal_priority_is_fifo() {
        let mut queue = ReadyQueue::new();
        queue.push(make_item(1, 2));
        queue.push(make_item(1, 0));
        queue.push(make_item(1, 1));

        assert_eq!(queue.pop().unwrap().seq, 0);
        assert_eq!(queue.pop().unwrap().seq, 1);
        assert_eq!(queue.pop().unwrap().seq, 2);
    }

    #[test]
    fn escalated_item_beats_later_peers_in_its_new_band() {
        let mut queue = ReadyQueue::new();
        // An early submission escalated into the same band as a later one.
        let mut escalated = make_item(0, 0);
        escalated.priority += 10;
        escalated.retry_count = 1;
        queue.push(make_item(10, 5));
        queue.push(escalated);

        let first = queue.pop().unwrap();
        assert_eq!(first.seq, 0);
        assert_eq!(first.retry_count, 1);
    }

    #[test]
    fn remove_by_id_rebuilds_queue() {
        let mut queue = ReadyQueue::new();
        let keep = make_item(0, 0);
        let drop_me = make_item(5, 1);
        let drop_id = drop_me.id;
        queue.push(keep);
        queue.push(drop_me);

        assert!(queue.remove(drop_id));
        assert!(!queue.remove(drop_id));
        assert_eq!(queue.len(), 1);
        assert_eq!(queue.pop().unwrap().priority, 0);
    }

    #[test]
    fn delay_heap_releases_in_ready_time_order() {
        let mut heap = DelayHeap::new();
        let now = Instant::now();
        heap.push(make_item(0, 0), now + Duration::from_millis(300));
        heap.push(make_item(0, 1), now + Duration::from_millis(100));
        heap.push(make_item(0, 2), now + Duration::from_millis(200));

        assert_eq!(heap.next_ready_at(), Some(now + Duration::from_millis(100)));

        let due = heap.pop_due(now + Duration::from_millis(250));
        assert_eq!(due.len(), 2);
        assert_eq!(due[0].seq, 1);
        assert_eq!(due[1].seq, 2);
        assert_eq!(heap.len(), 1);

        assert!(heap.pop_due(now).is_empty());
        assert!(!heap.is_empty());
    }

    #[test]
    fn delay_heap_remove_by_id() {
        let mut heap = DelayHeap::new();
        let now = Instant::now();
        let item = make_item(0, 0);
        let id = item.id;
        heap.push(item, now + Duration::from_secs(1));

        assert!(heap.remove(id));
        assert!(heap.is_empty());
        assert!(!heap.remove(id));
    }
}
