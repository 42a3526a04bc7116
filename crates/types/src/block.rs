use alloy::primitives::{Address, B256, Bloom, Bytes};
use serde::{Deserialize, Serialize};

/// Header view of an indexed block, as pushed to `newHeads` subscribers.
///
/// The `logs_bloom` is computed from the block's logs at index time, so it
/// never yields a false negative for a log the block actually holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockHeaderSummary {
    /// Block height.
    #[serde(with = "alloy::serde::quantity")]
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Bloom over every log address and topic in the block.
    pub logs_bloom: Bloom,
    /// Base fee, absent for pre-London blocks.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy::serde::quantity::opt"
    )]
    pub base_fee_per_gas: Option<u64>,
    /// Fee recipient.
    pub miner: Address,
    /// Gas used by the block's transactions.
    #[serde(with = "alloy::serde::quantity")]
    pub gas_used: u64,
    /// Block gas limit.
    #[serde(with = "alloy::serde::quantity")]
    pub gas_limit: u64,
    /// Block timestamp, in seconds.
    #[serde(with = "alloy::serde::quantity")]
    pub timestamp: u64,
}

/// A block as delivered by the execution layer, before indexing.
///
/// Carries no bloom and no log positions. Both are derived when the block
/// is indexed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockData {
    /// Block height.
    #[serde(with = "alloy::serde::quantity")]
    pub number: u64,
    /// Block hash.
    pub hash: B256,
    /// Hash of the parent block.
    pub parent_hash: B256,
    /// Base fee, absent for pre-London blocks.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "alloy::serde::quantity::opt"
    )]
    pub base_fee_per_gas: Option<u64>,
    /// Fee recipient.
    #[serde(default)]
    pub miner: Address,
    /// Gas used by the block's transactions.
    #[serde(default, with = "alloy::serde::quantity")]
    pub gas_used: u64,
    /// Block gas limit.
    #[serde(default, with = "alloy::serde::quantity")]
    pub gas_limit: u64,
    /// Block timestamp, in seconds.
    #[serde(default, with = "alloy::serde::quantity")]
    pub timestamp: u64,
    /// Executed transactions, in block order.
    #[serde(default)]
    pub transactions: Vec<TransactionOutcome>,
}

impl BlockData {
    /// Number of logs emitted across all transactions.
    pub fn log_count(&self) -> usize {
        self.transactions.iter().map(|tx| tx.logs.len()).sum()
    }

    /// Hashes of the block's transactions, in block order.
    pub fn transaction_hashes(&self) -> impl Iterator<Item = B256> + '_ {
        self.transactions.iter().map(|tx| tx.hash)
    }
}

/// Execution output of a single transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionOutcome {
    /// Transaction hash.
    pub hash: B256,
    /// Logs emitted during execution, in emission order.
    #[serde(default)]
    pub logs: Vec<EmittedLog>,
}

/// A log as emitted by the EVM, without chain coordinates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmittedLog {
    /// Emitting contract.
    pub address: Address,
    /// Indexed topics.
    #[serde(default)]
    pub topics: Vec<B256>,
    /// Non-indexed payload.
    #[serde(default)]
    pub data: Bytes,
}
