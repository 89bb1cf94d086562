use std::collections::{BTreeMap, BTreeSet};

use crate::message::Message;

/// Outcome of a working-set insert attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted,
    /// The id is already a member; the existing entry is kept.
    Duplicate,
    /// The set is at capacity; the message was not admitted.
    AtCapacity,
    /// The message was not visible at insertion time.
    NotVisible,
}

/// The fixed-size pool of messages eligible for cluster selection.
/// Backed by an ordered map so lowest-id access is deterministic.
/// Owned exclusively by the traversal coordinator and mutated only
/// during cycling.
#[derive(Debug)]
pub struct WorkingSet {
    members: BTreeMap<i64, Message>,
    capacity: usize,
}

impl WorkingSet {
    pub fn new(capacity: usize) -> Self {
        Self {
            members: BTreeMap::new(),
            capacity,
        }
    }

    pub fn insert(&mut self, message: Message) -> InsertOutcome {
        if !message.is_visible() {
            return InsertOutcome::NotVisible;
        }
        if self.members.contains_key(&message.id) {
            return InsertOutcome::Duplicate;
        }
        if self.members.len() >= self.capacity {
            return InsertOutcome::AtCapacity;
        }
        self.members.insert(message.id, message);
        InsertOutcome::Inserted
    }

    pub fn remove(&mut self, id: i64) -> Option<Message> {
        self.members.remove(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.members.contains_key(&id)
    }

    pub fn get(&self, id: i64) -> Option<&Message> {
        self.members.get(&id)
    }

    /// Lowest-id member.
    pub fn first(&self) -> Option<&Message> {
        self.members.values().next()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Snapshot of member ids, used as the replenishment exclusion set.
    pub fn ids(&self) -> BTreeSet<i64> {
        self.members.keys().copied().collect()
    }

    /// Members in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &Message> {
        self.members.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(id: i64) -> Message {
        Message {
            id,
            content: format!("message {id}"),
            created_at: 1_700_000_000,
            approved: true,
            deleted_at: None,
        }
    }

    #[test]
    fn test_insert_and_lookup() {
        let mut set = WorkingSet::new(4);
        assert_eq!(set.insert(message(3)), InsertOutcome::Inserted);
        assert!(set.contains(3));
        assert_eq!(set.get(3).unwrap().id, 3);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut set = WorkingSet::new(4);
        set.insert(message(3));
        assert_eq!(set.insert(message(3)), InsertOutcome::Duplicate);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_capacity_enforced() {
        let mut set = WorkingSet::new(2);
        set.insert(message(1));
        set.insert(message(2));
        assert_eq!(set.insert(message(3)), InsertOutcome::AtCapacity);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_invisible_rejected() {
        let mut set = WorkingSet::new(4);
        let mut hidden = message(1);
        hidden.approved = false;
        assert_eq!(set.insert(hidden), InsertOutcome::NotVisible);
        let mut deleted = message(2);
        deleted.deleted_at = Some(1_700_000_001);
        assert_eq!(set.insert(deleted), InsertOutcome::NotVisible);
        assert!(set.is_empty());
    }

    #[test]
    fn test_first_is_lowest_id() {
        let mut set = WorkingSet::new(4);
        set.insert(message(9));
        set.insert(message(2));
        set.insert(message(5));
        assert_eq!(set.first().unwrap().id, 2);
    }

    #[test]
    fn test_remove() {
        let mut set = WorkingSet::new(4);
        set.insert(message(1));
        assert_eq!(set.remove(1).unwrap().id, 1);
        assert!(set.remove(1).is_none());
        // Freed capacity is reusable.
        assert_eq!(set.insert(message(2)), InsertOutcome::Inserted);
    }

    #[test]
    fn test_ids_snapshot() {
        let mut set = WorkingSet::new(4);
        set.insert(message(4));
        set.insert(message(1));
        let ids: Vec<i64> = set.ids().into_iter().collect();
        assert_eq!(ids, vec![1, 4]);
    }
}
