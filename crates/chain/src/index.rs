//! Block indexing: log positions and the block bloom.

use alloy::primitives::{B256, Bloom, BloomInput};
use gateway_types::{BlockData, BlockHeaderSummary, LogRecord, MAX_TOPICS};
use std::collections::HashSet;

/// Errors raised while indexing a block.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    /// A log carries more topics than the EVM can emit.
    #[error("log {log_index} of transaction {tx} has {count} topics (max {MAX_TOPICS})")]
    TooManyTopics {
        /// The emitting transaction.
        tx: B256,
        /// Block-wide index the log would have received.
        log_index: u64,
        /// Number of topics found.
        count: usize,
    },
    /// The same transaction hash appears twice in one block.
    #[error("transaction {0} appears more than once in block")]
    DuplicateTransaction(B256),
}

/// A block whose logs have been positioned and bloom-indexed.
///
/// Immutable once built. Shared between the store, filters and scans
/// behind an [`Arc`](std::sync::Arc).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedBlock {
    header: BlockHeaderSummary,
    transactions: Vec<B256>,
    logs: Vec<LogRecord>,
}

impl IndexedBlock {
    /// Index a block. Assigns each log its block-wide `logIndex` and
    /// accrues every log address and topic into the block bloom.
    pub fn index(block: BlockData) -> Result<Self, IndexError> {
        let BlockData {
            number,
            hash,
            parent_hash,
            base_fee_per_gas,
            miner,
            gas_used,
            gas_limit,
            timestamp,
            transactions: outcomes,
        } = block;

        let mut logs_bloom = Bloom::ZERO;
        let mut logs = Vec::with_capacity(outcomes.iter().map(|tx| tx.logs.len()).sum());
        let mut transactions = Vec::with_capacity(outcomes.len());
        let mut seen = HashSet::with_capacity(outcomes.len());

        for (transaction_index, outcome) in outcomes.into_iter().enumerate() {
            if !seen.insert(outcome.hash) {
                return Err(IndexError::DuplicateTransaction(outcome.hash));
            }

            for log in outcome.logs {
                let log_index = logs.len() as u64;
                if log.topics.len() > MAX_TOPICS {
                    return Err(IndexError::TooManyTopics {
                        tx: outcome.hash,
                        log_index,
                        count: log.topics.len(),
                    });
                }

                logs_bloom.accrue(BloomInput::Raw(log.address.as_slice()));
                for topic in &log.topics {
                    logs_bloom.accrue(BloomInput::Raw(topic.as_slice()));
                }

                logs.push(LogRecord {
                    address: log.address,
                    topics: log.topics,
                    data: log.data,
                    block_number: number,
                    block_hash: hash,
                    transaction_hash: outcome.hash,
                    transaction_index: transaction_index as u64,
                    log_index,
                    removed: false,
                });
            }
            transactions.push(outcome.hash);
        }

        let header = BlockHeaderSummary {
            number,
            hash,
            parent_hash,
            logs_bloom,
            base_fee_per_gas,
            miner,
            gas_used,
            gas_limit,
            timestamp,
        };

        Ok(Self { header, transactions, logs })
    }

    /// The block header, including the computed bloom.
    pub const fn header(&self) -> &BlockHeaderSummary {
        &self.header
    }

    /// Block height.
    pub const fn number(&self) -> u64 {
        self.header.number
    }

    /// Block hash.
    pub const fn hash(&self) -> B256 {
        self.header.hash
    }

    /// Hash of the parent block.
    pub const fn parent_hash(&self) -> B256 {
        self.header.parent_hash
    }

    /// The block bloom.
    pub const fn logs_bloom(&self) -> &Bloom {
        &self.header.logs_bloom
    }

    /// Transaction hashes, in block order.
    pub fn transactions(&self) -> &[B256] {
        &self.transactions
    }

    /// Logs in `(transactionIndex, logIndex)` order.
    pub fn logs(&self) -> &[LogRecord] {
        &self.logs
    }

    /// Copies of the block's logs flagged as removed, for retraction.
    pub fn removed_logs(&self) -> impl Iterator<Item = LogRecord> + '_ {
        self.logs.iter().cloned().map(LogRecord::into_removed)
    }
}
