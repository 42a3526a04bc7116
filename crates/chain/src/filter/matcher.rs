use crate::{BlockSource, IndexedBlock, filter::{BlockRange, Clause, LogCriteria}};
use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Bloom, BloomInput},
};
use gateway_types::LogRecord;

impl LogCriteria {
    /// True if the log satisfies the address and topic clauses.
    ///
    /// The block selection is not consulted. A log with fewer topics than
    /// a constrained position fails that position.
    pub fn matches_log(&self, log: &LogRecord) -> bool {
        self.address_clause().matches(&log.address)
            && self
                .topic_clauses()
                .iter()
                .enumerate()
                .all(|(idx, clause)| clause.is_any() || log.topic(idx).is_some_and(|t| clause.matches(t)))
    }

    /// True if a block with this bloom may hold a matching log. Never
    /// false for a block that does.
    pub fn matches_bloom(&self, bloom: &Bloom) -> bool {
        clause_in_bloom(self.address_clause(), bloom, |a| a.as_slice())
            && self.topic_clauses().iter().all(|clause| clause_in_bloom(clause, bloom, |t| t.as_slice()))
    }

    /// True if `block` falls inside the block selection, with symbolic
    /// markers resolved against `source` now.
    pub fn contains_block<S: BlockSource + ?Sized>(&self, block: &IndexedBlock, source: &S) -> bool {
        match *self.block_range() {
            BlockRange::Hash(hash) => block.hash() == hash,
            BlockRange::Span { from, to } => {
                let n = block.number();
                resolve_marker(from, source) <= n && n <= resolve_marker(to, source)
            }
        }
    }
}

/// Resolve a block marker against the current head.
pub(crate) fn resolve_marker<S: BlockSource + ?Sized>(marker: BlockNumberOrTag, source: &S) -> u64 {
    match marker {
        BlockNumberOrTag::Latest | BlockNumberOrTag::Pending => source.latest(),
        BlockNumberOrTag::Safe => source.tags().safe(),
        BlockNumberOrTag::Finalized => source.tags().finalized(),
        BlockNumberOrTag::Earliest => source.earliest(),
        BlockNumberOrTag::Number(n) => n,
    }
}

fn clause_in_bloom<T: PartialEq>(
    clause: &Clause<T>,
    bloom: &Bloom,
    bytes: impl Fn(&T) -> &[u8],
) -> bool {
    clause.is_any() || clause.values().iter().any(|v| bloom.contains_input(BloomInput::Raw(bytes(v))))
}
