//! Errors raised by the filter registry and log queries.

use alloy::primitives::U64;
use gateway_chain::QueryError;
use std::time::Duration;

/// Errors from filter operations and log queries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FilterError {
    /// The filter is unknown, expired or uninstalled.
    #[error("filter {0:#x} not found")]
    NotFound(U64),
    /// The registry holds the maximum number of filters.
    #[error("error creating filter: max limit reached")]
    CapacityExceeded {
        /// Configured filter cap.
        max: usize,
    },
    /// `eth_getFilterLogs` on a block or pending-transaction filter.
    #[error("filter {0:#x} is not a log filter")]
    UnsupportedKind(U64),
    /// Range resolution or scan failure.
    #[error(transparent)]
    Query(#[from] QueryError),
    /// The scan exceeded its deadline.
    #[error("query timed out after {0:?}")]
    Timeout(Duration),
    /// The scan task failed.
    #[error("query task failed: {0}")]
    Task(String),
}
