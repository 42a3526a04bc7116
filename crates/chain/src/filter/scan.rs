use crate::{
    BlockSource, IndexedBlock,
    filter::{BlockRange, LogCriteria, matcher::resolve_marker},
};
use alloy::{eips::BlockNumberOrTag, primitives::B256};
use gateway_types::LogRecord;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{trace, trace_span};

/// Errors raised while evaluating criteria against committed blocks.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryError {
    /// `fromBlock` resolved above `toBlock`.
    #[error("invalid block range: fromBlock {from} is after toBlock {to}")]
    InvalidRange {
        /// Resolved first block.
        from: u64,
        /// Resolved last block.
        to: u64,
    },
    /// The span exceeds the configured maximum.
    #[error("maximum [from, to] blocks distance: {max}")]
    BlockRangeTooLarge {
        /// Configured maximum span.
        max: u64,
    },
    /// The scan matched more logs than the configured maximum.
    #[error("query returned more than {max} results")]
    TooManyResults {
        /// Configured maximum result count.
        max: usize,
    },
    /// No canonical block has this hash.
    #[error("block not found: {0}")]
    BlockNotFound(B256),
    /// The caller abandoned the scan.
    #[error("query cancelled")]
    Cancelled,
}

/// Bounds applied to a range scan. A zero disables the bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanLimits {
    /// Largest allowed `to - from`.
    pub max_blocks: u64,
    /// Largest allowed result count.
    pub max_logs: usize,
}

impl Default for ScanLimits {
    fn default() -> Self {
        Self { max_blocks: 10_000, max_logs: 10_000 }
    }
}

/// Concrete blocks a criteria evaluates over, after marker resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTarget {
    /// Inclusive height range as requested. `to` may lie above the head.
    Span {
        /// First height.
        from: u64,
        /// Last height.
        to: u64,
    },
    /// A single block selected by hash.
    Block(Arc<IndexedBlock>),
}

impl LogCriteria {
    /// Reject a range whose concrete bounds are inverted. Symbolic bounds
    /// are only checked when resolved.
    pub fn check_range(&self) -> Result<(), QueryError> {
        if let BlockRange::Span {
            from: BlockNumberOrTag::Number(from),
            to: BlockNumberOrTag::Number(to),
        } = *self.block_range()
            && from > to
        {
            return Err(QueryError::InvalidRange { from, to });
        }
        Ok(())
    }

    /// Resolve the block selection against the chain as it is now.
    pub fn resolve<S: BlockSource + ?Sized>(&self, source: &S) -> Result<ScanTarget, QueryError> {
        match *self.block_range() {
            BlockRange::Hash(hash) => source
                .block_by_hash(&hash)
                .map(ScanTarget::Block)
                .ok_or(QueryError::BlockNotFound(hash)),
            BlockRange::Span { from, to } => {
                let from = resolve_marker(from, source);
                let to = resolve_marker(to, source);
                if from > to {
                    return Err(QueryError::InvalidRange { from, to });
                }
                Ok(ScanTarget::Span { from, to })
            }
        }
    }
}

/// Run `criteria` over committed blocks.
///
/// Blocks are visited in ascending height. A block whose bloom rules out a
/// match is skipped without touching its logs. Results come back in
/// `(blockNumber, transactionIndex, logIndex)` order. The cancellation
/// token is checked before each block.
///
/// The span limit applies to the requested range. Heights above the head
/// are then dropped from the walk.
pub fn range_scan<S: BlockSource + ?Sized>(
    source: &S,
    criteria: &LogCriteria,
    limits: ScanLimits,
    cancel: &CancellationToken,
) -> Result<Vec<LogRecord>, QueryError> {
    let _span = trace_span!("range_scan", ?limits).entered();
    let mut out = Vec::new();

    match criteria.resolve(source)? {
        ScanTarget::Block(block) => {
            scan_block(&block, criteria, limits, &mut out)?;
        }
        ScanTarget::Span { from, to } => {
            if limits.max_blocks > 0 && to - from > limits.max_blocks {
                return Err(QueryError::BlockRangeTooLarge { max: limits.max_blocks });
            }
            let to = to.min(source.latest());

            let mut skipped = 0u64;
            for number in from..=to {
                if cancel.is_cancelled() {
                    trace!(number, "scan cancelled");
                    return Err(QueryError::Cancelled);
                }
                let Some(block) = source.block_by_number(number) else { continue };
                if !scan_block(&block, criteria, limits, &mut out)? {
                    skipped += 1;
                }
            }
            trace!(from, to, skipped, found = out.len(), "scan complete");
        }
    }

    Ok(out)
}

/// Append the block's matching logs to `out`. Returns false if the bloom
/// ruled the block out.
fn scan_block(
    block: &IndexedBlock,
    criteria: &LogCriteria,
    limits: ScanLimits,
    out: &mut Vec<LogRecord>,
) -> Result<bool, QueryError> {
    if !criteria.matches_bloom(block.logs_bloom()) {
        return Ok(false);
    }
    for log in block.logs().iter().filter(|log| criteria.matches_log(log)) {
        if limits.max_logs > 0 && out.len() >= limits.max_logs {
            return Err(QueryError::TooManyResults { max: limits.max_logs });
        }
        out.push(log.clone());
    }
    Ok(true)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        ChainStore,
        test_utils::{emitted, empty_chain, push, tx},
    };
    use alloy::primitives::Address;

    const EMITTER: Address = Address::repeat_byte(0xee);
    const TOPIC: B256 = B256::repeat_byte(0x01);

    /// Blocks 0..=4, with one matching log in blocks 1 and 3 and two in 4.
    fn chain() -> ChainStore {
        let store = empty_chain(0);
        push(&store, vec![tx(1, vec![emitted(EMITTER, vec![TOPIC])])]);
        push(&store, vec![tx(2, vec![emitted(Address::ZERO, vec![TOPIC])])]);
        push(&store, vec![tx(3, vec![emitted(EMITTER, vec![TOPIC])])]);
        push(
            &store,
            vec![tx(4, vec![emitted(EMITTER, vec![])]), tx(5, vec![emitted(EMITTER, vec![TOPIC])])],
        );
        store
    }

    fn scan(store: &ChainStore, criteria: &LogCriteria) -> Result<Vec<LogRecord>, QueryError> {
        range_scan(store, criteria, ScanLimits::default(), &CancellationToken::new())
    }

    #[test]
    fn ascending_matches() {
        let store = chain();
        let criteria = LogCriteria::new().from_block(BlockNumberOrTag::Earliest).address(EMITTER).topic(0, TOPIC);
        let logs = scan(&store, &criteria).unwrap();
        let positions: Vec<_> = logs.iter().map(|l| (l.block_number, l.log_index)).collect();
        assert_eq!(positions, vec![(1, 0), (3, 0), (4, 1)]);
    }

    #[test]
    fn default_range_is_head_only() {
        let store = chain();
        let logs = scan(&store, &LogCriteria::new()).unwrap();
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.block_number == 4));
    }

    #[test]
    fn no_match_is_empty() {
        let store = chain();
        let criteria = LogCriteria::new().from_block(0u64).address(Address::repeat_byte(0x42));
        assert_eq!(scan(&store, &criteria).unwrap(), vec![]);
    }

    #[test]
    fn inverted_range_fails() {
        let store = chain();
        let criteria = LogCriteria::new().from_block(3u64).to_block(1u64);
        assert_eq!(scan(&store, &criteria), Err(QueryError::InvalidRange { from: 3, to: 1 }));
    }

    #[test]
    fn check_range_only_rejects_concrete_inversion() {
        assert!(LogCriteria::new().from_block(5u64).to_block(4u64).check_range().is_err());
        assert!(LogCriteria::new().from_block(5u64).check_range().is_ok());
        assert!(LogCriteria::new().from_block(4u64).to_block(5u64).check_range().is_ok());
    }

    #[test]
    fn to_block_above_head_stops_at_head() {
        let store = chain();
        let criteria = LogCriteria::new().from_block(3u64).to_block(100u64).address(EMITTER);
        assert_eq!(criteria.resolve(&store).unwrap(), ScanTarget::Span { from: 3, to: 100 });
        assert_eq!(scan(&store, &criteria).unwrap().len(), 3);
    }

    #[test]
    fn span_limit_counts_heights_above_head() {
        let store = chain();
        let criteria = LogCriteria::new().from_block(0u64).to_block(0xffff_ffffu64);
        assert_eq!(scan(&store, &criteria), Err(QueryError::BlockRangeTooLarge { max: 10_000 }));

        let limits = ScanLimits { max_blocks: 0, max_logs: 0 };
        let logs = range_scan(&store, &criteria, limits, &CancellationToken::new()).unwrap();
        assert_eq!(logs.len(), 5);
    }

    #[test]
    fn span_limit() {
        let store = chain();
        let criteria = LogCriteria::new().from_block(0u64).to_block(4u64);
        let limits = ScanLimits { max_blocks: 3, max_logs: 0 };
        assert_eq!(
            range_scan(&store, &criteria, limits, &CancellationToken::new()),
            Err(QueryError::BlockRangeTooLarge { max: 3 })
        );
    }

    #[test]
    fn result_limit() {
        let store = chain();
        let criteria = LogCriteria::new().from_block(0u64).address(EMITTER);
        let limits = ScanLimits { max_blocks: 0, max_logs: 2 };
        assert_eq!(
            range_scan(&store, &criteria, limits, &CancellationToken::new()),
            Err(QueryError::TooManyResults { max: 2 })
        );
    }

    #[test]
    fn by_block_hash() {
        let store = chain();
        let three = store.block_by_number(3).unwrap();
        let logs = scan(&store, &LogCriteria::new().at_block_hash(three.hash())).unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].block_hash, three.hash());

        // a hash target ignores the span limit
        let limits = ScanLimits { max_blocks: 1, max_logs: 0 };
        let four = LogCriteria::new().at_block_hash(store.block_by_number(4).unwrap().hash());
        assert_eq!(range_scan(&store, &four, limits, &CancellationToken::new()).unwrap().len(), 2);

        let missing = B256::repeat_byte(0x99);
        assert_eq!(
            scan(&store, &LogCriteria::new().at_block_hash(missing)),
            Err(QueryError::BlockNotFound(missing))
        );
    }

    #[test]
    fn cancelled_scan_stops() {
        let store = chain();
        let cancel = CancellationToken::new();
        cancel.cancel();
        let criteria = LogCriteria::new().from_block(0u64);
        assert_eq!(
            range_scan(&store, &criteria, ScanLimits::default(), &cancel),
            Err(QueryError::Cancelled)
        );
    }
}
