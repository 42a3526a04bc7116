//! Interest kinds shared by filters and subscriptions.

use crate::interest::{FilterOutput, SubscriptionItem};
use alloy::primitives::B256;
use gateway_chain::{BlockSource, IndexedBlock, LogCriteria};
use serde::Deserialize;

/// What a filter or subscription is interested in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum InterestKind {
    /// Logs matching the criteria.
    Log(Box<LogCriteria>),
    /// New canonical blocks.
    Block,
    /// Transactions entering the mempool.
    PendingTransaction,
    /// Sync status. Never pushes anything.
    Syncing,
}

/// Subscription names accepted by `eth_subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) enum SubscriptionKind {
    /// `logs`
    Logs,
    /// `newHeads`
    NewHeads,
    /// `newPendingTransactions`
    NewPendingTransactions,
    /// `syncing`
    Syncing,
}

impl SubscriptionKind {
    /// Build the interest, with `criteria` used by `logs` only.
    pub(crate) fn into_interest(self, criteria: Option<LogCriteria>) -> InterestKind {
        match self {
            Self::Logs => InterestKind::Log(Box::new(criteria.unwrap_or_default())),
            Self::NewHeads => InterestKind::Block,
            Self::NewPendingTransactions => InterestKind::PendingTransaction,
            Self::Syncing => InterestKind::Syncing,
        }
    }
}

impl InterestKind {
    /// Short name for logs and spans.
    pub(crate) const fn name(&self) -> &'static str {
        match self {
            Self::Log(_) => "logs",
            Self::Block => "blocks",
            Self::PendingTransaction => "pendingTransactions",
            Self::Syncing => "syncing",
        }
    }

    /// Fallible cast to log criteria.
    pub(crate) fn as_criteria(&self) -> Option<&LogCriteria> {
        match self {
            Self::Log(criteria) => Some(criteria),
            _ => None,
        }
    }

    /// An empty poll buffer of the matching kind.
    pub(crate) const fn empty_output(&self) -> FilterOutput {
        match self {
            Self::Log(_) => FilterOutput::logs(),
            Self::Block | Self::PendingTransaction | Self::Syncing => FilterOutput::hashes(),
        }
    }

    /// Add a committed block's events to a poll buffer. Log filters honour
    /// their block selection, resolved against `source` now.
    pub(crate) fn buffer_block<S: BlockSource + ?Sized>(
        &self,
        block: &IndexedBlock,
        source: &S,
        out: &mut FilterOutput,
    ) {
        match self {
            Self::Log(criteria) => {
                if criteria.contains_block(block, source) && criteria.matches_bloom(block.logs_bloom()) {
                    out.extend_logs(block.logs().iter().filter(|l| criteria.matches_log(l)).cloned());
                }
            }
            Self::Block => out.push_hash(block.hash()),
            Self::PendingTransaction | Self::Syncing => {}
        }
    }

    /// Add a retracted block's logs, flagged as removed, to a poll buffer.
    pub(crate) fn buffer_retraction(&self, block: &IndexedBlock, out: &mut FilterOutput) {
        if let Self::Log(criteria) = self {
            out.extend_logs(block.removed_logs().filter(|l| criteria.matches_log(l)));
        }
    }

    /// Subscription pushes for a committed block.
    pub(crate) fn block_items(&self, block: &IndexedBlock) -> Vec<SubscriptionItem> {
        match self {
            Self::Log(criteria) => {
                if !criteria.matches_bloom(block.logs_bloom()) {
                    return Vec::new();
                }
                block
                    .logs()
                    .iter()
                    .filter(|l| criteria.matches_log(l))
                    .map(|l| SubscriptionItem::Log(Box::new(l.clone())))
                    .collect()
            }
            Self::Block => vec![SubscriptionItem::Header(Box::new(block.header().clone()))],
            Self::PendingTransaction | Self::Syncing => Vec::new(),
        }
    }

    /// Subscription pushes for a retracted block.
    pub(crate) fn retraction_items(&self, block: &IndexedBlock) -> Vec<SubscriptionItem> {
        match self {
            Self::Log(criteria) => block
                .removed_logs()
                .filter(|l| criteria.matches_log(l))
                .map(|l| SubscriptionItem::Log(Box::new(l)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Subscription push for an admitted transaction.
    pub(crate) const fn pending_item(&self, hash: B256) -> Option<SubscriptionItem> {
        match self {
            Self::PendingTransaction => Some(SubscriptionItem::Transaction(hash)),
            _ => None,
        }
    }
}
