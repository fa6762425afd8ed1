//! Bounded-concurrency transfer scheduler
//!
//! The [`Scheduler`] owns the ordered queue of pending file ids and the set
//! of currently active ids, bounded by the configured concurrent-transfer
//! limit. It is the only place that mutates the active set; the engine calls
//! [`admit`](Scheduler::admit) whenever a slot frees or a file is added or
//! resumed, so throughput stays exactly at the limit without head-of-line
//! blocking from a single slow file.
//!
//! The scheduler is a plain data structure; the engine serializes access
//! with a mutex and spawns one tokio task per admitted id.

use std::collections::{HashSet, VecDeque};

use hauler_core::domain::newtypes::FileId;

/// Queue of pending uploads plus the bounded active set
#[derive(Debug)]
pub struct Scheduler {
    /// Ordered pending ids; front is admitted first
    queue: VecDeque<FileId>,
    /// Ids with a running per-file task
    active: HashSet<FileId>,
    /// Maximum simultaneously active transfers
    limit: usize,
}

impl Scheduler {
    /// Creates a scheduler with the given concurrency limit (floored at 1)
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            queue: VecDeque::new(),
            active: HashSet::new(),
            limit: limit.max(1),
        }
    }

    /// Appends a newly enqueued id at the back of the queue
    pub fn push_back(&mut self, id: FileId) {
        if !self.queue.contains(&id) && !self.active.contains(&id) {
            self.queue.push_back(id);
        }
    }

    /// Inserts a resumed or retried id at the front of the queue
    ///
    /// Resumed work is prioritized over newly queued files.
    pub fn push_front(&mut self, id: FileId) {
        if !self.queue.contains(&id) && !self.active.contains(&id) {
            self.queue.push_front(id);
        }
    }

    /// Removes a queued id (pause or cancel before admission)
    ///
    /// Returns true if the id was queued.
    pub fn remove_queued(&mut self, id: &FileId) -> bool {
        let before = self.queue.len();
        self.queue.retain(|queued| queued != id);
        self.queue.len() != before
    }

    /// Frees the slot held by a finished, paused, or cancelled task
    pub fn release(&mut self, id: &FileId) {
        self.active.remove(id);
    }

    /// Admits queued ids while free slots remain
    ///
    /// Every returned id has been moved into the active set; the caller
    /// must start exactly one task per id and call [`release`](Self::release)
    /// when it exits.
    pub fn admit(&mut self) -> Vec<FileId> {
        let mut admitted = Vec::new();
        while self.active.len() < self.limit {
            match self.queue.pop_front() {
                Some(id) => {
                    self.active.insert(id.clone());
                    admitted.push(id);
                }
                None => break,
            }
        }
        admitted
    }

    /// Number of currently active transfers
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Number of queued (not yet admitted) transfers
    #[must_use]
    pub fn queued_count(&self) -> usize {
        self.queue.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u32) -> FileId {
        FileId::new(format!("file-{n}")).unwrap()
    }

    #[test]
    fn test_admission_respects_limit() {
        let mut s = Scheduler::new(6);
        for n in 0..10 {
            s.push_back(id(n));
        }

        let admitted = s.admit();
        assert_eq!(admitted.len(), 6);
        assert_eq!(s.active_count(), 6);
        assert_eq!(s.queued_count(), 4);

        // No free slot: nothing more is admitted
        assert!(s.admit().is_empty());
    }

    #[test]
    fn test_release_frees_exactly_one_slot() {
        let mut s = Scheduler::new(2);
        for n in 0..4 {
            s.push_back(id(n));
        }
        let admitted = s.admit();
        assert_eq!(admitted.len(), 2);

        s.release(&admitted[0]);
        let next = s.admit();
        assert_eq!(next.len(), 1);
        assert_eq!(s.active_count(), 2);
    }

    #[test]
    fn test_push_front_prioritizes_resumed_work() {
        let mut s = Scheduler::new(1);
        s.push_back(id(1));
        s.push_back(id(2));
        s.push_front(id(3));

        assert_eq!(s.admit(), vec![id(3)]);
    }

    #[test]
    fn test_remove_queued() {
        let mut s = Scheduler::new(1);
        s.push_back(id(1));
        s.push_back(id(2));

        assert!(s.remove_queued(&id(2)));
        assert!(!s.remove_queued(&id(2)));
        assert_eq!(s.queued_count(), 1);
    }

    #[test]
    fn test_duplicate_ids_are_not_requeued() {
        let mut s = Scheduler::new(1);
        s.push_back(id(1));
        s.push_back(id(1));
        assert_eq!(s.queued_count(), 1);

        let admitted = s.admit();
        assert_eq!(admitted.len(), 1);
        // Active ids cannot be queued again
        s.push_back(id(1));
        s.push_front(id(1));
        assert_eq!(s.queued_count(), 0);
    }

    #[test]
    fn test_zero_limit_is_floored() {
        let mut s = Scheduler::new(0);
        s.push_back(id(1));
        assert_eq!(s.admit().len(), 1);
    }
}
