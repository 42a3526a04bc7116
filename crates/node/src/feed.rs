//! The newline-delimited JSON block feed.

use alloy::primitives::B256;
use gateway_rpc::{GatewayCtx, IngestError};
use gateway_types::BlockData;
use serde::Deserialize;
use tracing::{debug, trace};

/// One line of the block feed.
///
/// ```text
/// {"block":{...}}
/// {"pendingTransaction":"0x.."}
/// {"revert":12}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedEvent {
    /// A block extending the canonical chain.
    Block(Box<BlockData>),
    /// A transaction entering the mempool.
    PendingTransaction(B256),
    /// Retract every block above this height.
    Revert(u64),
}

impl FeedEvent {
    /// Apply the event through the ingest pipeline.
    pub fn apply(self, ctx: &GatewayCtx) -> Result<(), IngestError> {
        match self {
            Self::Block(block) => {
                ctx.commit_block(*block)?;
            }
            Self::PendingTransaction(hash) => {
                if !ctx.admit_pending(hash) {
                    trace!(%hash, "ignoring known pending transaction");
                }
            }
            Self::Revert(target) => {
                let retracted = ctx.revert_to(target)?;
                debug!(target, retracted = retracted.len(), "applied revert");
            }
        }
        Ok(())
    }
}
