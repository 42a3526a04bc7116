//! Client interests in chain events.
//!
//! - [`FilterManager`] holds poll filters (`eth_newFilter`,
//!   `eth_newBlockFilter`, `eth_newPendingTransactionFilter`). Matching
//!   events are buffered per filter until the client calls
//!   `eth_getFilterChanges`.
//! - [`SubscriptionManager`] holds push subscriptions (`eth_subscribe`).
//!   Matching events are queued per subscription and forwarded to the
//!   owning connection by a dedicated task.
//!
//! Both wrap an `Arc<Inner>` around a [`DashMap`], so clones are cheap and
//! unrelated entries never contend on a global lock. Neither manager reads
//! the chain on its own: the ingest pipeline calls their `notify_*` methods
//! once per committed block, reverted block or admitted transaction, in
//! chain order.
//!
//! The filter manager spawns an OS thread that periodically removes
//! expired filters. It holds a [`Weak`] reference and exits once the
//! manager is dropped. [`DashMap::retain`] runs there rather than on the
//! async runtime, where it could deadlock against a shard guard held across
//! an await point.
//!
//! [`Weak`]: std::sync::Weak
//! [`DashMap`]: dashmap::DashMap
//! [`DashMap::retain`]: dashmap::DashMap::retain

mod buffer;
pub(crate) use buffer::{FilterOutput, SubscriptionItem};

mod filters;
pub(crate) use filters::{FilterId, FilterManager};

mod kind;
pub(crate) use kind::{InterestKind, SubscriptionKind};

mod subs;
pub(crate) use subs::{Connection, SubscriptionManager};
