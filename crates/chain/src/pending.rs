//! Mempool admission tracking.

use crate::IndexedBlock;
use alloy::primitives::B256;
use std::collections::{HashSet, VecDeque};

/// Tracks transaction hashes seen in the mempool but not yet included.
///
/// [`PendingPool::admit`] reports each hash once, however many times the
/// mempool announces it before inclusion. Inclusion in a committed block
/// forgets the hash, and a late announcement of an included hash is
/// ignored until its block is retracted. Both sets hold at most `capacity`
/// hashes, oldest forgotten first.
#[derive(Debug, Clone)]
pub struct PendingPool {
    tracked: HashSet<B256>,
    arrival: VecDeque<B256>,
    included: HashSet<B256>,
    inclusion: VecDeque<B256>,
    capacity: usize,
}

impl PendingPool {
    /// Create a pool tracking at most `capacity` hashes.
    pub fn new(capacity: usize) -> Self {
        Self {
            tracked: HashSet::new(),
            arrival: VecDeque::new(),
            included: HashSet::new(),
            inclusion: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Number of hashes currently tracked.
    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    /// True if nothing is tracked.
    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// True if `hash` is tracked as pending.
    pub fn contains(&self, hash: &B256) -> bool {
        self.tracked.contains(hash)
    }

    /// Record a mempool arrival. Returns `true` the first time a hash is
    /// seen while pending. Hashes of recently included transactions are
    /// refused.
    pub fn admit(&mut self, hash: B256) -> bool {
        if self.included.contains(&hash) || !self.tracked.insert(hash) {
            return false;
        }
        self.arrival.push_back(hash);

        while self.tracked.len() > self.capacity {
            let Some(oldest) = self.arrival.pop_front() else { break };
            self.tracked.remove(&oldest);
        }
        true
    }

    /// Forget every transaction included in `block`. Returns how many
    /// tracked hashes were dropped.
    pub fn on_block(&mut self, block: &IndexedBlock) -> usize {
        let before = self.tracked.len();
        for hash in block.transactions() {
            self.tracked.remove(hash);
            if self.included.insert(*hash) {
                self.inclusion.push_back(*hash);
            }
        }
        let dropped = before - self.tracked.len();

        while self.included.len() > self.capacity {
            let Some(oldest) = self.inclusion.pop_front() else { break };
            self.included.remove(&oldest);
        }

        // arrival entries for included hashes are stale, drop them once
        // they dominate the queue
        if dropped > 0 && self.arrival.len() > self.tracked.len() * 2 {
            let tracked = &self.tracked;
            self.arrival.retain(|h| tracked.contains(h));
        }
        dropped
    }

    /// Forget the inclusion of every transaction in a retracted block, so
    /// the mempool may announce them again.
    pub fn on_revert(&mut self, block: &IndexedBlock) {
        for hash in block.transactions() {
            self.included.remove(hash);
        }
        let included = &self.included;
        self.inclusion.retain(|h| included.contains(h));
    }
}
