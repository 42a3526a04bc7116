//! Chain head tracking.

use std::sync::{
    Arc,
    atomic::{AtomicU64, Ordering},
};

/// Shared view of the chain's head, safe and finalized heights.
///
/// Clones share the same counters. The owner of the canonical chain
/// advances them; everyone else only reads.
///
/// # Example
///
/// ```
/// use gateway_chain::BlockTags;
///
/// let tags = BlockTags::new(12);
/// assert_eq!(tags.latest(), 12);
/// assert_eq!(tags.finalized(), 12);
///
/// let reader = tags.clone();
/// tags.set_latest(13);
/// assert_eq!(reader.latest(), 13);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BlockTags {
    latest: Arc<AtomicU64>,
    safe: Arc<AtomicU64>,
    finalized: Arc<AtomicU64>,
}

impl BlockTags {
    /// Create tags with all three heights at `head`.
    pub fn new(head: u64) -> Self {
        Self {
            latest: Arc::new(AtomicU64::new(head)),
            safe: Arc::new(AtomicU64::new(head)),
            finalized: Arc::new(AtomicU64::new(head)),
        }
    }

    /// Height of the chain head.
    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Height of the latest safe block.
    pub fn safe(&self) -> u64 {
        self.safe.load(Ordering::Acquire)
    }

    /// Height of the latest finalized block.
    pub fn finalized(&self) -> u64 {
        self.finalized.load(Ordering::Acquire)
    }

    /// Move the head.
    pub fn set_latest(&self, n: u64) {
        self.latest.store(n, Ordering::Release);
    }

    fn set_safe(&self, n: u64) {
        self.safe.store(n, Ordering::Release);
    }

    fn set_finalized(&self, n: u64) {
        self.finalized.store(n, Ordering::Release);
    }

    /// Move all three heights to `n`. Used by sources without a finality
    /// notion, where every committed block is treated as final.
    pub fn set_all(&self, n: u64) {
        // Store order keeps finalized <= safe <= latest for concurrent
        // readers in both directions.
        if n >= self.latest() {
            self.set_latest(n);
            self.set_safe(n);
            self.set_finalized(n);
        } else {
            self.set_finalized(n);
            self.set_safe(n);
            self.set_latest(n);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn set_all_moves_every_height() {
        let tags = BlockTags::new(5);
        tags.set_all(9);
        assert_eq!((tags.latest(), tags.safe(), tags.finalized()), (9, 9, 9));

        tags.set_all(2);
        assert_eq!((tags.latest(), tags.safe(), tags.finalized()), (2, 2, 2));
    }
}
