#![doc = include_str!("../README.md")]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod filter;
pub use filter::{
    BlockRange, Clause, CriteriaError, LogCriteria, QueryError, ScanLimits, ScanTarget, range_scan,
};

mod index;
pub use index::{IndexError, IndexedBlock};

mod pending;
pub use pending::PendingPool;

mod store;
pub use store::{BlockSource, ChainError, ChainStore};

mod tags;
pub use tags::BlockTags;

#[cfg(test)]
pub(crate) mod test_utils;
