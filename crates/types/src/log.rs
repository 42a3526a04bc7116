use alloy::primitives::{Address, B256, Bytes};
use serde::{Deserialize, Serialize};

/// A log positioned within the canonical chain.
///
/// Records are created once, when the block that emitted them is indexed.
/// The only derived variant is the retraction copy produced by
/// [`LogRecord::into_removed`] when that block leaves the canonical chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogRecord {
    /// Address of the contract that emitted the log.
    pub address: Address,
    /// Indexed topics, at most [`MAX_TOPICS`](crate::MAX_TOPICS).
    pub topics: Vec<B256>,
    /// Non-indexed payload.
    pub data: Bytes,
    /// Height of the including block.
    #[serde(with = "alloy::serde::quantity")]
    pub block_number: u64,
    /// Hash of the including block.
    pub block_hash: B256,
    /// Hash of the emitting transaction.
    pub transaction_hash: B256,
    /// Position of the emitting transaction within the block.
    #[serde(with = "alloy::serde::quantity")]
    pub transaction_index: u64,
    /// Position of the log within the block, counted across all
    /// transactions.
    #[serde(with = "alloy::serde::quantity")]
    pub log_index: u64,
    /// True if the including block was retracted by a reorg.
    pub removed: bool,
}

impl LogRecord {
    /// Consume the record, returning a copy flagged as removed.
    pub fn into_removed(self) -> Self {
        Self { removed: true, ..self }
    }

    /// The topic at position `idx`, if the log has one.
    pub fn topic(&self, idx: usize) -> Option<&B256> {
        self.topics.get(idx)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy::primitives::{address, b256, bytes};
    use serde_json::json;

    fn record() -> LogRecord {
        LogRecord {
            address: address!("0x5fbdb2315678afecb367f032d93f642f64180aa3"),
            topics: vec![b256!(
                "0x0000000000000000000000000000000000000000000000000000000000000001"
            )],
            data: bytes!("0x0102"),
            block_number: 26,
            block_hash: B256::repeat_byte(0xaa),
            transaction_hash: B256::repeat_byte(0xbb),
            transaction_index: 0,
            log_index: 3,
            removed: false,
        }
    }

    #[test]
    fn serializes_as_rpc_log() {
        let value = serde_json::to_value(record()).unwrap();
        assert_eq!(value["blockNumber"], json!("0x1a"));
        assert_eq!(value["transactionIndex"], json!("0x0"));
        assert_eq!(value["logIndex"], json!("0x3"));
        assert_eq!(value["data"], json!("0x0102"));
        assert_eq!(value["removed"], json!(false));
        assert_eq!(value["address"], json!("0x5fbdb2315678afecb367f032d93f642f64180aa3"));
    }

    #[test]
    fn into_removed_keeps_position() {
        let log = record();
        let removed = log.clone().into_removed();
        assert!(removed.removed);
        assert_eq!(removed.log_index, log.log_index);
        assert_eq!(removed.block_hash, log.block_hash);
    }
}
