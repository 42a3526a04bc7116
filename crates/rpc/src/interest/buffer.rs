//! Event buffers for filters and subscription queues.

use alloy::primitives::B256;
use gateway_types::{BlockHeaderSummary, LogRecord};
use serde::Serialize;
use std::collections::VecDeque;

/// Events accumulated by a poll filter, drained by
/// `eth_getFilterChanges`.
///
/// Serializes as a bare JSON array of logs or hashes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum FilterOutput {
    /// Log entries, for log filters.
    Logs(VecDeque<LogRecord>),
    /// Block hashes or transaction hashes.
    Hashes(VecDeque<B256>),
}

impl FilterOutput {
    /// An empty log buffer.
    pub(crate) const fn logs() -> Self {
        Self::Logs(VecDeque::new())
    }

    /// An empty hash buffer.
    pub(crate) const fn hashes() -> Self {
        Self::Hashes(VecDeque::new())
    }

    /// Number of buffered events.
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Logs(logs) => logs.len(),
            Self::Hashes(hashes) => hashes.len(),
        }
    }

    /// True if nothing is buffered.
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append logs. Ignored by a hash buffer.
    pub(crate) fn extend_logs(&mut self, new: impl IntoIterator<Item = LogRecord>) {
        if let Self::Logs(logs) = self {
            logs.extend(new);
        }
    }

    /// Append a hash. Ignored by a log buffer.
    pub(crate) fn push_hash(&mut self, hash: B256) {
        if let Self::Hashes(hashes) = self {
            hashes.push_back(hash);
        }
    }

    /// Take the buffered events, leaving an empty buffer of the same kind.
    pub(crate) fn take(&mut self) -> Self {
        let empty = match self {
            Self::Logs(_) => Self::logs(),
            Self::Hashes(_) => Self::hashes(),
        };
        std::mem::replace(self, empty)
    }
}

/// A single event queued for a subscription.
///
/// Serializes as the `result` of an `eth_subscription` notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub(crate) enum SubscriptionItem {
    /// A log, possibly flagged as removed.
    Log(Box<LogRecord>),
    /// A new head.
    Header(Box<BlockHeaderSummary>),
    /// A pending transaction hash.
    Transaction(B256),
}
