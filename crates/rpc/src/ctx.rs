use crate::{
    FilterError, GatewayConfig, metrics,
    interest::{FilterId, FilterManager, InterestKind, SubscriptionManager},
};
use gateway_chain::{ChainStore, LogCriteria, PendingPool, range_scan};
use gateway_types::LogRecord;
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug_span};

/// Shared state behind every RPC transport.
///
/// Holds the canonical chain, the pending pool, the filter registry and
/// the subscription hub. Clones share the same state.
///
/// Building a context spawns the filter cleaner thread. Subscription
/// forwarders and log scans run on the ambient tokio runtime.
#[derive(Debug, Clone)]
pub struct GatewayCtx {
    inner: Arc<GatewayCtxInner>,
}

impl GatewayCtx {
    /// Create a context over `chain`.
    pub fn new(chain: ChainStore, chain_id: u64, config: GatewayConfig) -> Self {
        let inner = GatewayCtxInner {
            chain,
            pending: Mutex::new(PendingPool::new(config.max_pending_tracked)),
            filters: FilterManager::new(config.max_filters, config.filter_ttl, config.clean_interval),
            subs: SubscriptionManager::new(config.subscription_buffer),
            ingest: Mutex::new(()),
            chain_id,
            config,
        };
        Self { inner: Arc::new(inner) }
    }

    /// Run a one-shot log query against the committed chain.
    ///
    /// The scan runs on the blocking pool. If it outlives the configured
    /// timeout, or the returned future is dropped, the scan is cancelled
    /// at the next block boundary.
    pub async fn logs(&self, criteria: LogCriteria) -> Result<Vec<LogRecord>, FilterError> {
        let timeout = self.inner.config.scan_timeout;
        let limits = self.inner.config.scan_limits();
        let cancel = CancellationToken::new();
        let _guard = cancel.clone().drop_guard();

        metrics::record_scan();
        let this = self.clone();
        let span = debug_span!("logs", ?timeout);
        let task = tokio::task::spawn_blocking(move || {
            range_scan(this.chain(), &criteria, limits, &cancel)
        });

        match tokio::time::timeout(timeout, task).instrument(span).await {
            Ok(Ok(res)) => res.map_err(Into::into),
            Ok(Err(join)) => Err(FilterError::Task(join.to_string())),
            Err(_) => Err(FilterError::Timeout(timeout)),
        }
    }

    /// Install a poll filter starting after the current head. Holds the
    /// ingest lock so no block or reorg lands between reading the head and
    /// inserting the filter.
    pub(crate) fn install_filter(&self, kind: InterestKind) -> Result<FilterId, FilterError> {
        let _ingest = self.ingest_lock().lock().expect("ingest lock poisoned");
        self.filters().install(kind, self.chain())
    }

    /// The canonical chain.
    pub fn chain(&self) -> &ChainStore {
        &self.inner.chain
    }

    /// The chain ID reported by `eth_chainId`.
    pub fn chain_id(&self) -> u64 {
        self.inner.chain_id
    }

    /// The gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.inner.config
    }

    /// Number of live poll filters.
    pub fn filter_count(&self) -> usize {
        self.inner.filters.len()
    }

    /// Number of live subscriptions across all connections.
    pub fn subscription_count(&self) -> usize {
        self.inner.subs.subscriber_count()
    }

    pub(crate) fn filters(&self) -> &FilterManager {
        &self.inner.filters
    }

    pub(crate) fn subscriptions(&self) -> &SubscriptionManager {
        &self.inner.subs
    }

    pub(crate) fn pending(&self) -> &Mutex<PendingPool> {
        &self.inner.pending
    }

    pub(crate) fn ingest_lock(&self) -> &Mutex<()> {
        &self.inner.ingest
    }
}

#[derive(Debug)]
struct GatewayCtxInner {
    chain: ChainStore,
    pending: Mutex<PendingPool>,
    filters: FilterManager,
    subs: SubscriptionManager,
    /// Serializes chain mutations with their notifications.
    ingest: Mutex<()>,
    chain_id: u64,
    config: GatewayConfig,
}
