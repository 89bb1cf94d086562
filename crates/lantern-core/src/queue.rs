use std::collections::VecDeque;

use crate::message::Message;

/// Bounded queue of messages discovered above the watermark and not yet
/// placed in the working set, kept in ascending id order. Overflow evicts
/// from the front, so exactly the lowest ids beyond capacity are dropped
/// (they re-enter through the historical scan instead).
#[derive(Debug)]
pub struct PriorityQueue {
    items: VecDeque<Message>,
    max_size: usize,
    dropped: u64,
}

impl PriorityQueue {
    pub fn new(max_size: usize) -> Self {
        Self {
            items: VecDeque::new(),
            max_size,
            dropped: 0,
        }
    }

    /// Insert in id order. Duplicate ids are rejected. Returns whether the
    /// message was newly inserted (it may still be evicted immediately if
    /// it is the lowest id in an already-full queue).
    pub fn push(&mut self, message: Message) -> bool {
        match self.items.binary_search_by(|m| m.id.cmp(&message.id)) {
            Ok(_) => false,
            Err(pos) => {
                self.items.insert(pos, message);
                while self.items.len() > self.max_size {
                    self.items.pop_front();
                    self.dropped += 1;
                }
                true
            }
        }
    }

    /// Lowest-id entry, FIFO with respect to discovery order.
    pub fn pop_front(&mut self) -> Option<Message> {
        self.items.pop_front()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.items.binary_search_by(|m| m.id.cmp(&id)).is_ok()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Lifetime count of entries evicted by overflow.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.items.iter()
    }
}
