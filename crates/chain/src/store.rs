//! The canonical chain.

use crate::{BlockTags, IndexedBlock};
use alloy::primitives::B256;
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, RwLock},
};
use tracing::{debug, trace};

/// Read access to committed, indexed blocks.
///
/// Blocks handed out are immutable snapshots. A block that is later
/// retracted stays valid for whoever already holds it.
pub trait BlockSource: Send + Sync {
    /// Head tracking for symbolic block resolution.
    fn tags(&self) -> &BlockTags;

    /// Height of the first block held, or `0` when empty.
    fn earliest(&self) -> u64;

    /// Fetch a canonical block by height.
    fn block_by_number(&self, number: u64) -> Option<Arc<IndexedBlock>>;

    /// Fetch a canonical block by hash.
    fn block_by_hash(&self, hash: &B256) -> Option<Arc<IndexedBlock>>;

    /// Height of the chain head.
    fn latest(&self) -> u64 {
        self.tags().latest()
    }

    /// The head block, or `None` before the first block.
    fn head_block(&self) -> Option<Arc<IndexedBlock>> {
        self.block_by_number(self.latest())
    }
}

/// Errors raised while mutating the [`ChainStore`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChainError {
    /// The block does not extend the current head.
    #[error("expected block {expected}, got block {got}")]
    NonContiguous {
        /// The next height the store accepts.
        expected: u64,
        /// The height offered.
        got: u64,
    },
    /// The block's parent is not the current head.
    #[error("block {number} has parent {got}, head is {expected}")]
    ParentMismatch {
        /// Height of the offered block.
        number: u64,
        /// Hash of the current head.
        expected: B256,
        /// Parent hash carried by the offered block.
        got: B256,
    },
    /// The revert target is below the first stored block.
    #[error("cannot revert to block {target}, earliest held block is {earliest}")]
    RevertOutOfRange {
        /// Requested new head.
        target: u64,
        /// First block held.
        earliest: u64,
    },
}

#[derive(Debug, Default)]
struct Canonical {
    blocks: VecDeque<Arc<IndexedBlock>>,
    by_hash: HashMap<B256, u64>,
}

impl Canonical {
    fn first(&self) -> Option<u64> {
        self.blocks.front().map(|b| b.number())
    }

    fn get(&self, number: u64) -> Option<&Arc<IndexedBlock>> {
        let first = self.first()?;
        let idx = number.checked_sub(first)?;
        self.blocks.get(usize::try_from(idx).ok()?)
    }
}

/// In-process canonical chain.
///
/// Append-only at the tip, with tip retraction for reorgs. Reads take a
/// short read lock and return [`Arc`] snapshots, so scans over historical
/// blocks never hold the lock that [`ChainStore::append`] needs.
#[derive(Debug, Clone, Default)]
pub struct ChainStore {
    canonical: Arc<RwLock<Canonical>>,
    tags: BlockTags,
}

impl ChainStore {
    /// Create an empty store. The first appended block may have any height.
    pub fn new() -> Self {
        Self::default()
    }

    /// The head block, if any.
    pub fn head(&self) -> Option<Arc<IndexedBlock>> {
        self.canonical.read().expect("chain lock poisoned").blocks.back().cloned()
    }

    /// Number of blocks held.
    pub fn len(&self) -> usize {
        self.canonical.read().expect("chain lock poisoned").blocks.len()
    }

    /// True if no block has been appended yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append a block at the tip. The block must sit at `head + 1` and name
    /// the head as its parent.
    pub fn append(&self, block: IndexedBlock) -> Result<Arc<IndexedBlock>, ChainError> {
        let mut canonical = self.canonical.write().expect("chain lock poisoned");

        if let Some(head) = canonical.blocks.back() {
            let expected = head.number() + 1;
            if block.number() != expected {
                return Err(ChainError::NonContiguous { expected, got: block.number() });
            }
            if block.parent_hash() != head.hash() {
                return Err(ChainError::ParentMismatch {
                    number: block.number(),
                    expected: head.hash(),
                    got: block.parent_hash(),
                });
            }
        }

        let block = Arc::new(block);
        canonical.by_hash.insert(block.hash(), block.number());
        canonical.blocks.push_back(block.clone());
        self.tags.set_all(block.number());
        trace!(number = block.number(), hash = %block.hash(), "appended block");

        Ok(block)
    }

    /// Retract every block above `target`, making `target` the head.
    ///
    /// Returns the retracted blocks in ascending height order. Reverting to
    /// the current head or above is a no-op.
    pub fn revert_to(&self, target: u64) -> Result<Vec<Arc<IndexedBlock>>, ChainError> {
        let mut canonical = self.canonical.write().expect("chain lock poisoned");

        let Some(first) = canonical.first() else { return Ok(Vec::new()) };
        if target < first {
            return Err(ChainError::RevertOutOfRange { target, earliest: first });
        }

        let mut retracted = Vec::new();
        while canonical.blocks.back().is_some_and(|b| b.number() > target) {
            if let Some(block) = canonical.blocks.pop_back() {
                canonical.by_hash.remove(&block.hash());
                retracted.push(block);
            }
        }
        retracted.reverse();

        if !retracted.is_empty() {
            self.tags.set_all(target);
            debug!(target, count = retracted.len(), "retracted blocks");
        }
        Ok(retracted)
    }
}

impl BlockSource for ChainStore {
    fn tags(&self) -> &BlockTags {
        &self.tags
    }

    fn earliest(&self) -> u64 {
        self.canonical.read().expect("chain lock poisoned").first().unwrap_or_default()
    }

    fn block_by_number(&self, number: u64) -> Option<Arc<IndexedBlock>> {
        self.canonical.read().expect("chain lock poisoned").get(number).cloned()
    }

    fn block_by_hash(&self, hash: &B256) -> Option<Arc<IndexedBlock>> {
        let canonical = self.canonical.read().expect("chain lock poisoned");
        let number = *canonical.by_hash.get(hash)?;
        canonical.get(number).cloned()
    }
}
