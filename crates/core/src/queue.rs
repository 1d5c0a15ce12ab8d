//! Bounded min-priority queue used by the tree builder.
//!
//! An array-backed binary min-heap with a capacity fixed at construction.
//! Storage is allocated once and never grows; pushing into a full queue is
//! reported as [`QueueError::Full`].
//!
//! # Ordering
//!
//! Elements are ordered by weight. Equal weights are ordered by arrival:
//! every push is stamped with a sequence number, and the earlier push wins.
//! This keeps tree construction deterministic without looking at symbols.
//!
//! # Layout
//!
//! ```text
//! parent(i) = (i - 1) / 2
//! left(i)   = 2 * i + 1
//! right(i)  = 2 * i + 2
//! ```

use crate::error::QueueError;

/// Anything that can be ranked by the queue.
pub trait Weighted {
    /// Non-negative weight; smaller weights are popped first.
    fn weight(&self) -> u64;
}

#[derive(Debug)]
struct Slot<T> {
    weight: u64,
    seq: u64,
    item: T,
}

impl<T> Slot<T> {
    fn key(&self) -> (u64, u64) {
        (self.weight, self.seq)
    }
}

/// Fixed-capacity binary min-heap.
///
/// # Invariants
/// - `slots.len() <= capacity`
/// - for every `i > 0`: `weight(slots[i]) >= weight(slots[parent(i)])`
#[derive(Debug)]
pub struct PriorityQueue<T> {
    slots: Vec<Slot<T>>,
    capacity: usize,
    next_seq: u64,
}

impl<T: Weighted> PriorityQueue<T> {
    /// Create an empty queue that holds at most `capacity` elements.
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            capacity,
            next_seq: 0,
        }
    }

    /// Insert an element.
    ///
    /// # Errors
    /// Returns `QueueError::Full` if the queue already holds `capacity` elements.
    pub fn push(&mut self, item: T) -> Result<(), QueueError> {
        if self.is_full() {
            return Err(QueueError::Full {
                capacity: self.capacity,
            });
        }

        let slot = Slot {
            weight: item.weight(),
            seq: self.next_seq,
            item,
        };
        self.next_seq += 1;

        self.slots.push(slot);
        self.sift_up(self.slots.len() - 1);
        Ok(())
    }

    /// Borrow the minimum element without removing it.
    pub fn top(&self) -> Result<&T, QueueError> {
        self.slots
            .first()
            .map(|slot| &slot.item)
            .ok_or(QueueError::Empty)
    }

    /// Remove and return the minimum element.
    pub fn pop(&mut self) -> Result<T, QueueError> {
        if self.slots.is_empty() {
            return Err(QueueError::Empty);
        }

        // Last element moves to the root, then sinks.
        let min = self.slots.swap_remove(0);
        if !self.slots.is_empty() {
            self.sift_down(0);
        }
        Ok(min.item)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.slots.len() == self.capacity
    }

    fn sift_up(&mut self, mut idx: usize) {
        while idx > 0 {
            let parent = (idx - 1) / 2;
            if self.slots[idx].key() >= self.slots[parent].key() {
                break;
            }
            self.slots.swap(idx, parent);
            idx = parent;
        }
    }

    fn sift_down(&mut self, mut idx: usize) {
        let size = self.slots.len();
        loop {
            let left = 2 * idx + 1;
            let right = 2 * idx + 2;
            let mut lowest = idx;

            if left < size && self.slots[left].key() < self.slots[lowest].key() {
                lowest = left;
            }
            if right < size && self.slots[right].key() < self.slots[lowest].key() {
                lowest = right;
            }
            if lowest == idx {
                break;
            }
            self.slots.swap(idx, lowest);
            idx = lowest;
        }
    }
}
