//! LRU Tracker Module
//!
//! Keeps keys in recency order so the store can find its eviction victim
//! without scanning.
//!
//! ```text
//!   index: HashMap<String, slot>
//!
//!   head ─► [slot 2] ◄──► [slot 0] ◄──► [slot 1] ◄── tail
//!   (MRU)                                        (LRU)
//! ```
//!
//! Nodes live in a `Vec` and link to each other by slot number. Freed slots
//! are recycled through a free list, so `touch`, `remove` and `evict_oldest`
//! are all O(1).

use std::collections::HashMap;

#[derive(Debug, Default)]
struct Node {
    key: String,
    prev: Option<usize>,
    next: Option<usize>,
}

// == LRU Tracker ==
/// Tracks access order for LRU eviction strategy.
///
/// - Front (head) = most recently used
/// - Back (tail) = least recently used
#[derive(Debug, Default)]
pub struct LruTracker {
    nodes: Vec<Node>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl LruTracker {
    // == Constructor ==
    /// Creates a new empty LRU tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a tracker with room for `capacity` keys before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
            free: Vec::new(),
            index: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    // == Touch ==
    /// Marks a key as most recently used, inserting it if it is new.
    pub fn touch(&mut self, key: &str) {
        if let Some(&slot) = self.index.get(key) {
            if self.head != Some(slot) {
                self.detach(slot);
                self.attach_front(slot);
            }
            return;
        }

        let node = Node {
            key: key.to_string(),
            prev: None,
            next: None,
        };
        let slot = match self.free.pop() {
            Some(slot) => {
                self.nodes[slot] = node;
                slot
            }
            None => {
                self.nodes.push(node);
                self.nodes.len() - 1
            }
        };
        self.index.insert(key.to_string(), slot);
        self.attach_front(slot);
    }

    // == Remove ==
    /// Removes a key from the tracker, returning whether it was tracked.
    pub fn remove(&mut self, key: &str) -> bool {
        match self.index.remove(key) {
            Some(slot) => {
                self.release(slot);
                true
            }
            None => false,
        }
    }

    // == Evict Oldest ==
    /// Returns and removes the least recently used key.
    pub fn evict_oldest(&mut self) -> Option<String> {
        let slot = self.tail?;
        let key = std::mem::take(&mut self.nodes[slot].key);
        self.index.remove(&key);
        self.release(slot);
        Some(key)
    }

    // == Peek Oldest ==
    /// Returns the least recently used key without removing it.
    pub fn peek_oldest(&self) -> Option<&str> {
        self.tail.map(|slot| self.nodes[slot].key.as_str())
    }

    /// Iterates keys from least to most recently used.
    pub fn iter_oldest_first(&self) -> impl Iterator<Item = &str> + '_ {
        let mut cursor = self.tail;
        std::iter::from_fn(move || {
            let slot = cursor?;
            let node = &self.nodes[slot];
            cursor = node.prev;
            Some(node.key.as_str())
        })
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Forgets every key, keeping allocated storage.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    // == Linking ==
    fn release(&mut self, slot: usize) {
        self.detach(slot);
        self.nodes[slot].key.clear();
        self.free.push(slot);
    }

    fn detach(&mut self, slot: usize) {
        let (prev, next) = {
            let node = &self.nodes[slot];
            (node.prev, node.next)
        };

        match prev {
            Some(p) => self.nodes[p].next = next,
            None => self.head = next,
        }
        match next {
            Some(n) => self.nodes[n].prev = prev,
            None => self.tail = prev,
        }

        let node = &mut self.nodes[slot];
        node.prev = None;
        node.next = None;
    }

    fn attach_front(&mut self, slot: usize) {
        let old_head = self.head;
        {
            let node = &mut self.nodes[slot];
            node.prev = None;
            node.next = old_head;
        }
        match old_head {
            Some(h) => self.nodes[h].prev = Some(slot),
            None => self.tail = Some(slot),
        }
        self.head = Some(slot);
    }
}
