use crate::{ChainStore, IndexedBlock};
use alloy::primitives::{Address, B256, Bytes, keccak256};
use gateway_types::{BlockData, EmittedLog, TransactionOutcome};

/// Deterministic hash for a block at `number` on top of `parent`.
pub(crate) fn block_hash(number: u64, parent: B256) -> B256 {
    let mut buf = number.to_be_bytes().to_vec();
    buf.extend_from_slice(parent.as_slice());
    keccak256(buf)
}

pub(crate) fn block(number: u64, parent: B256, transactions: Vec<TransactionOutcome>) -> BlockData {
    BlockData {
        number,
        hash: block_hash(number, parent),
        parent_hash: parent,
        base_fee_per_gas: Some(7),
        miner: Address::ZERO,
        gas_used: 0,
        gas_limit: 30_000_000,
        timestamp: 1_700_000_000 + number,
        transactions,
    }
}

pub(crate) fn tx(id: u8, logs: Vec<EmittedLog>) -> TransactionOutcome {
    TransactionOutcome { hash: B256::repeat_byte(id), logs }
}

pub(crate) fn emitted(address: Address, topics: Vec<B256>) -> EmittedLog {
    EmittedLog { address, topics, data: Bytes::new() }
}

/// Append a block to the store's tip.
pub(crate) fn push(store: &ChainStore, transactions: Vec<TransactionOutcome>) -> B256 {
    let (number, parent) = match store.head() {
        Some(head) => (head.number() + 1, head.hash()),
        None => (0, B256::ZERO),
    };
    let indexed = IndexedBlock::index(block(number, parent, transactions)).unwrap();
    store.append(indexed).unwrap().hash()
}

/// A store holding empty blocks `0..=head`.
pub(crate) fn empty_chain(head: u64) -> ChainStore {
    let store = ChainStore::default();
    for _ in 0..=head {
        push(&store, vec![]);
    }
    store
}
