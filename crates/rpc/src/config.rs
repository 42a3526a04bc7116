//! Configuration for the gateway.

use gateway_chain::ScanLimits;
use std::time::Duration;

/// Limits and timings for filters, subscriptions and log queries.
///
/// # Example
///
/// ```
/// use gateway_rpc::GatewayConfig;
///
/// let config = GatewayConfig::default();
/// assert_eq!(config.max_filters, 200);
/// assert_eq!(config.scan_limits().max_blocks, 10_000);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct GatewayConfig {
    /// Maximum number of live poll filters across all clients.
    ///
    /// Default: `200`.
    pub max_filters: usize,

    /// A filter not polled for this long is removed.
    ///
    /// Default: `5 minutes`.
    pub filter_ttl: Duration,

    /// How often the background cleaner looks for expired filters.
    ///
    /// Default: `30 seconds`.
    pub clean_interval: Duration,

    /// Maximum `toBlock - fromBlock` for `eth_getLogs` and
    /// `eth_getFilterLogs`. Set to `0` to disable the limit.
    ///
    /// Default: `10_000`.
    pub max_blocks_per_filter: u64,

    /// Maximum number of logs returned by a single query.
    /// Set to `0` to disable the limit.
    ///
    /// Default: `10_000`.
    pub max_logs_per_response: usize,

    /// Per-subscription queue depth. A subscriber that falls this far
    /// behind is terminated with an overflow error.
    ///
    /// Default: `1024`.
    pub subscription_buffer: usize,

    /// Deadline for a single range scan.
    ///
    /// Default: `30 seconds`.
    pub scan_timeout: Duration,

    /// Number of pending transaction hashes remembered for deduplication.
    ///
    /// Default: `4096`.
    pub max_pending_tracked: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_filters: 200,
            filter_ttl: Duration::from_secs(5 * 60),
            clean_interval: Duration::from_secs(30),
            max_blocks_per_filter: 10_000,
            max_logs_per_response: 10_000,
            subscription_buffer: 1024,
            scan_timeout: Duration::from_secs(30),
            max_pending_tracked: 4096,
        }
    }
}

impl GatewayConfig {
    /// Scan bounds derived from this configuration.
    pub const fn scan_limits(&self) -> ScanLimits {
        ScanLimits {
            max_blocks: self.max_blocks_per_filter,
            max_logs: self.max_logs_per_response,
        }
    }
}
