use alloy::primitives::{Address, B256, Bytes, keccak256};
use gateway_chain::{ChainStore, IndexedBlock};
use gateway_types::{BlockData, EmittedLog, TransactionOutcome};

pub(crate) fn block(number: u64, parent: B256, transactions: Vec<TransactionOutcome>) -> BlockData {
    let mut preimage = number.to_be_bytes().to_vec();
    preimage.extend_from_slice(parent.as_slice());
    BlockData {
        number,
        hash: keccak256(preimage),
        parent_hash: parent,
        base_fee_per_gas: Some(7),
        miner: Address::ZERO,
        gas_used: 21_000,
        gas_limit: 30_000_000,
        timestamp: 1_700_000_000 + number,
        transactions,
    }
}

/// The block extending the store's tip.
pub(crate) fn next_block(store: &ChainStore, transactions: Vec<TransactionOutcome>) -> BlockData {
    match store.head() {
        Some(head) => block(head.number() + 1, head.hash(), transactions),
        None => block(0, B256::ZERO, transactions),
    }
}

/// Append a block to the store without notifying anyone.
pub(crate) fn commit(store: &ChainStore, transactions: Vec<TransactionOutcome>) -> B256 {
    let indexed = IndexedBlock::index(next_block(store, transactions)).unwrap();
    store.append(indexed).unwrap().hash()
}

/// An indexed block detached from any store.
pub(crate) fn index(number: u64, transactions: Vec<TransactionOutcome>) -> IndexedBlock {
    IndexedBlock::index(block(number, B256::repeat_byte(0xaa), transactions)).unwrap()
}

pub(crate) fn tx(id: u8, logs: Vec<EmittedLog>) -> TransactionOutcome {
    TransactionOutcome { hash: B256::repeat_byte(id), logs }
}

pub(crate) fn emitted(address: Address, topics: Vec<B256>) -> EmittedLog {
    EmittedLog { address, topics, data: Bytes::new() }
}
