//! The ingest pipeline: committed blocks, reorgs and pending transactions.
//!
//! Every chain mutation happens under the context's ingest lock, and the
//! filter registry and subscription hub are notified before the lock is
//! released. Interests therefore observe events in chain order.

use crate::{GatewayCtx, metrics};
use alloy::primitives::B256;
use gateway_chain::{BlockSource, ChainError, IndexError, IndexedBlock};
use gateway_types::BlockData;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Errors rejecting a block or reorg.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IngestError {
    /// The block could not be indexed.
    #[error(transparent)]
    Index(#[from] IndexError),
    /// The chain store rejected the block or reorg.
    #[error(transparent)]
    Chain(#[from] ChainError),
}

impl GatewayCtx {
    /// Index and append a block at the tip, then notify filters and
    /// subscribers. Transactions included by the block leave the pending
    /// pool.
    #[instrument(skip_all, fields(number = block.number, hash = %block.hash))]
    pub fn commit_block(&self, block: BlockData) -> Result<Arc<IndexedBlock>, IngestError> {
        let _ingest = self.ingest_lock().lock().expect("ingest lock poisoned");

        let committed = IndexedBlock::index(block)
            .map_err(IngestError::from)
            .and_then(|indexed| self.chain().append(indexed).map_err(IngestError::from))
            .inspect_err(|err| {
                warn!(%err, "rejected block");
                metrics::record_ingest_failure();
            })?;

        self.filters().notify_block(self.chain());
        self.subscriptions().notify_block(&committed);
        let cleared = self.pending().lock().expect("pending lock poisoned").on_block(&committed);

        metrics::record_block_ingested(committed.logs().len());
        debug!(logs = committed.logs().len(), cleared, "committed block");
        Ok(committed)
    }

    /// Retract every block above `target`, then report the removed logs to
    /// filters and subscribers. Returns the retracted blocks in ascending
    /// order.
    #[instrument(skip(self))]
    pub fn revert_to(&self, target: u64) -> Result<Vec<Arc<IndexedBlock>>, IngestError> {
        let _ingest = self.ingest_lock().lock().expect("ingest lock poisoned");

        let retracted = self.chain().revert_to(target).inspect_err(|err| {
            warn!(%err, "rejected reorg");
            metrics::record_ingest_failure();
        })?;
        if retracted.is_empty() {
            return Ok(retracted);
        }

        self.filters().notify_revert(&retracted, self.chain().latest());
        self.subscriptions().notify_revert(&retracted);
        let mut pending = self.pending().lock().expect("pending lock poisoned");
        retracted.iter().for_each(|block| pending.on_revert(block));
        drop(pending);

        metrics::record_blocks_reverted(retracted.len());
        info!(retracted = retracted.len(), head = self.chain().latest(), "reverted chain");
        Ok(retracted)
    }

    /// Admit a pending transaction. Returns `false` for a hash already
    /// tracked or already included in a committed block. Neither is
    /// reported.
    pub fn admit_pending(&self, hash: B256) -> bool {
        let _ingest = self.ingest_lock().lock().expect("ingest lock poisoned");
        let mut pending = self.pending().lock().expect("pending lock poisoned");
        if !pending.admit(hash) {
            return false;
        }
        // notified under the pool lock so arrival order is preserved
        self.filters().notify_pending(hash);
        self.subscriptions().notify_pending(hash);
        metrics::record_pending_admitted();
        true
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        GatewayConfig,
        interest::{FilterOutput, InterestKind},
        test_utils::{emitted, next_block, tx},
    };
    use alloy::primitives::Address;
    use gateway_chain::{ChainStore, LogCriteria};

    const EMITTER: Address = Address::repeat_byte(0xee);

    fn ctx() -> GatewayCtx {
        GatewayCtx::new(ChainStore::new(), 1, GatewayConfig::default())
    }

    fn commit(ctx: &GatewayCtx, logs: u8) -> Arc<IndexedBlock> {
        let txs = (0..logs).map(|i| tx(i + 1, vec![emitted(EMITTER, vec![])])).collect();
        ctx.commit_block(next_block(ctx.chain(), txs)).unwrap()
    }

    #[test]
    fn commit_feeds_filters() {
        let ctx = ctx();
        commit(&ctx, 0);
        let id = ctx.install_filter(InterestKind::Log(Box::new(LogCriteria::new().address(EMITTER)))).unwrap();
        commit(&ctx, 2);

        let FilterOutput::Logs(logs) = ctx.filters().poll(id, ctx.chain()).unwrap() else {
            panic!("expected logs")
        };
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.block_number == 1));
    }

    #[test]
    fn rejects_non_contiguous_block() {
        let ctx = ctx();
        commit(&ctx, 0);
        let mut skipped = next_block(ctx.chain(), vec![]);
        skipped.number += 1;
        assert!(matches!(
            ctx.commit_block(skipped),
            Err(IngestError::Chain(ChainError::NonContiguous { .. }))
        ));
        assert_eq!(ctx.chain().latest(), 0);
    }

    #[test]
    fn revert_reports_removed_logs() {
        let ctx = ctx();
        commit(&ctx, 0);
        let id = ctx.install_filter(InterestKind::Log(Box::default())).unwrap();
        commit(&ctx, 1);
        commit(&ctx, 1);
        assert_eq!(ctx.filters().poll(id, ctx.chain()).unwrap().len(), 2);

        let retracted = ctx.revert_to(0).unwrap();
        assert_eq!(retracted.iter().map(|b| b.number()).collect::<Vec<_>>(), vec![1, 2]);
        assert_eq!(ctx.chain().latest(), 0);

        let FilterOutput::Logs(logs) = ctx.filters().poll(id, ctx.chain()).unwrap() else {
            panic!("expected logs")
        };
        assert_eq!(logs.len(), 2);
        assert!(logs.iter().all(|l| l.removed));

        assert!(ctx.revert_to(5).unwrap().is_empty());
    }

    #[test]
    fn pending_is_deduplicated() {
        let ctx = ctx();
        let id = ctx.install_filter(InterestKind::PendingTransaction).unwrap();
        let hash = B256::repeat_byte(7);
        assert!(ctx.admit_pending(hash));
        assert!(!ctx.admit_pending(hash));
        assert_eq!(ctx.filters().poll(id, ctx.chain()).unwrap().len(), 1);
    }

    #[test]
    fn inclusion_clears_pending() {
        let ctx = ctx();
        let hash = B256::repeat_byte(1);
        assert!(ctx.admit_pending(hash));
        commit(&ctx, 1);
        assert!(!ctx.pending().lock().unwrap().contains(&hash));
    }

    #[test]
    fn late_announcement_of_included_hash_is_ignored() {
        let ctx = ctx();
        commit(&ctx, 0);
        let id = ctx.install_filter(InterestKind::PendingTransaction).unwrap();
        let included = commit(&ctx, 1);
        let hash = included.transactions()[0];

        assert!(!ctx.admit_pending(hash));
        assert!(ctx.filters().poll(id, ctx.chain()).unwrap().is_empty());

        ctx.revert_to(included.number() - 1).unwrap();
        assert!(ctx.admit_pending(hash));
    }

    #[test]
    fn installs_racing_ingest_miss_no_block() {
        let ctx = ctx();
        commit(&ctx, 0);

        let writer = {
            let ctx = ctx.clone();
            std::thread::spawn(move || {
                for round in 0..50u64 {
                    commit(&ctx, 1);
                    if round % 10 == 9 {
                        ctx.revert_to(ctx.chain().latest() - 2).unwrap();
                        commit(&ctx, 2);
                        commit(&ctx, 0);
                    }
                }
            })
        };

        // (filter, head observed once the install returned)
        let mut installed = Vec::new();
        while !writer.is_finished() && installed.len() < 150 {
            let id = ctx.install_filter(InterestKind::Block).unwrap();
            installed.push((id, ctx.chain().latest()));
            std::thread::yield_now();
        }
        writer.join().unwrap();

        let head = ctx.chain().latest();
        for (id, after) in installed {
            let FilterOutput::Hashes(hashes) = ctx.filters().poll(id, ctx.chain()).unwrap() else {
                panic!("expected hashes")
            };
            let canonical: Vec<_> =
                (after + 1..=head).map(|n| ctx.chain().block_by_number(n).unwrap().hash()).collect();
            assert!(hashes.len() >= canonical.len());
            let tail: Vec<_> = hashes.iter().skip(hashes.len() - canonical.len()).copied().collect();
            assert_eq!(tail, canonical);
        }
    }
}
