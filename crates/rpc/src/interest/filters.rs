//! Poll filters for `eth_newFilter` / `eth_getFilterChanges`.

use crate::{
    FilterError,
    interest::{FilterOutput, InterestKind},
    metrics,
};
use alloy::primitives::{B256, U64};
use dashmap::{DashMap, mapref::one::RefMut};
use gateway_chain::{BlockSource, IndexedBlock, LogCriteria};
use std::{
    sync::{
        Arc, Weak,
        atomic::{AtomicU64, AtomicUsize, Ordering},
    },
    time::{Duration, Instant},
};
use tracing::{debug, trace};

pub(crate) type FilterId = U64;

/// An installed filter.
///
/// `last_seen_block` is the last block folded into the buffer, `None`
/// until the chain has a block. `cursor` is
/// the last position handed to the client: a block height for log and
/// block filters, an arrival sequence number for pending-transaction
/// filters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ActiveFilter {
    kind: InterestKind,
    buffer: FilterOutput,
    cursor: u64,
    last_seen_block: Option<u64>,
    next_seq: u64,
    created_at: Instant,
    last_poll_time: Instant,
}

impl core::fmt::Display for ActiveFilter {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "ActiveFilter {{ kind: {}, cursor: {}, buffered: {}, ms_since_last_poll: {} }}",
            self.kind.name(),
            self.cursor,
            self.buffer.len(),
            self.last_poll_time.elapsed().as_millis(),
        )
    }
}

impl ActiveFilter {
    fn new(kind: InterestKind, head: Option<u64>) -> Self {
        let now = Instant::now();
        let cursor = match kind {
            InterestKind::PendingTransaction => 0,
            _ => head.unwrap_or_default(),
        };
        Self {
            buffer: kind.empty_output(),
            kind,
            cursor,
            last_seen_block: head,
            next_seq: 1,
            created_at: now,
            last_poll_time: now,
        }
    }

    /// Fold every block above `last_seen_block` up to the head into the
    /// buffer, in height order. A filter that has seen nothing starts at
    /// the first block held.
    fn catch_up<S: BlockSource + ?Sized>(&mut self, source: &S) {
        let head = source.latest();
        let start = self.last_seen_block.map_or_else(|| source.earliest(), |n| n + 1);
        for number in start..=head {
            // heights retracted since `head` was read are skipped
            let Some(block) = source.block_by_number(number) else { continue };
            self.kind.buffer_block(&block, source, &mut self.buffer);
            self.last_seen_block = Some(number);
        }
    }

    /// Buffer removed logs for retracted blocks already folded in, and
    /// step back to the new head.
    fn retract(&mut self, retracted: &[Arc<IndexedBlock>], new_head: u64) {
        let Some(last_seen) = self.last_seen_block else { return };
        for block in retracted.iter().filter(|b| b.number() <= last_seen) {
            self.kind.buffer_retraction(block, &mut self.buffer);
        }
        self.last_seen_block = Some(last_seen.min(new_head));
    }

    fn push_pending(&mut self, hash: B256) {
        if matches!(self.kind, InterestKind::PendingTransaction) {
            self.buffer.push_hash(hash);
            self.next_seq += 1;
        }
    }

    /// Drain the buffer and advance the cursor past what was drained.
    fn take_changes(&mut self) -> FilterOutput {
        let changes = self.buffer.take();
        self.cursor = match self.kind {
            InterestKind::PendingTransaction => self.next_seq - 1,
            _ => self.cursor.max(self.last_seen_block.unwrap_or_default()),
        };
        self.touch();
        changes
    }

    fn touch(&mut self) {
        self.last_poll_time = Instant::now();
    }

    /// Duration since the client last used the filter.
    pub(crate) fn time_since_last_poll(&self) -> Duration {
        self.last_poll_time.elapsed()
    }

    /// Age of the filter.
    pub(crate) fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

/// Inner logic for [`FilterManager`].
#[derive(Debug)]
pub(crate) struct FilterManagerInner {
    current_id: AtomicU64,
    live: AtomicUsize,
    max_filters: usize,
    ttl: Duration,
    filters: DashMap<FilterId, ActiveFilter>,
}

impl FilterManagerInner {
    fn new(max_filters: usize, ttl: Duration) -> Self {
        // Start from 1, as 0 is weird in quantity encoding.
        Self {
            current_id: AtomicU64::new(1),
            live: AtomicUsize::new(0),
            max_filters,
            ttl,
            filters: DashMap::new(),
        }
    }

    /// Next filter ID. IDs are never reused.
    fn next_id(&self) -> FilterId {
        FilterId::from(self.current_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Number of live filters.
    pub(crate) fn len(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }

    /// Install a filter whose first visible block is the one after the
    /// current head, or the first block ever committed if the chain is
    /// empty.
    ///
    /// The head must not move while this runs: callers hold the ingest
    /// lock. Fails with [`FilterError::CapacityExceeded`] at the cap. A
    /// slot is reserved before the filter is inserted, so concurrent
    /// installs never overshoot.
    pub(crate) fn install<S: BlockSource + ?Sized>(
        &self,
        kind: InterestKind,
        source: &S,
    ) -> Result<FilterId, FilterError> {
        let max = self.max_filters;
        self.live
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < max).then_some(n + 1))
            .map_err(|_| FilterError::CapacityExceeded { max })?;

        let id = self.next_id();
        let head = source.head_block().map(|block| block.number());
        debug!(%id, kind = kind.name(), ?head, "installed filter");
        self.filters.insert(id, ActiveFilter::new(kind, head));
        metrics::record_filter_installed();
        Ok(id)
    }

    /// Lock a live filter. An expired filter is removed and reported as
    /// not found.
    fn live_filter(&self, id: FilterId) -> Result<RefMut<'_, FilterId, ActiveFilter>, FilterError> {
        match self.filters.get_mut(&id) {
            None => return Err(FilterError::NotFound(id)),
            Some(filter) if filter.time_since_last_poll() < self.ttl => return Ok(filter),
            Some(_) => {}
        }
        // shard guard released above
        if self.filters.remove(&id).is_some() {
            self.live.fetch_sub(1, Ordering::AcqRel);
            metrics::record_filters_expired(1);
            debug!(%id, "filter expired");
        }
        Err(FilterError::NotFound(id))
    }

    /// Return events since the last poll and advance the cursor.
    pub(crate) fn poll<S: BlockSource + ?Sized>(
        &self,
        id: FilterId,
        source: &S,
    ) -> Result<FilterOutput, FilterError> {
        let mut filter = self.live_filter(id)?;
        filter.catch_up(source);
        let changes = filter.take_changes();
        trace!(%id, count = changes.len(), "polled filter");
        Ok(changes)
    }

    /// Criteria of a log filter, for a full re-scan. Counts as activity
    /// for expiry.
    pub(crate) fn log_criteria(&self, id: FilterId) -> Result<LogCriteria, FilterError> {
        let mut filter = self.live_filter(id)?;
        filter.touch();
        filter.kind.as_criteria().cloned().ok_or(FilterError::UnsupportedKind(id))
    }

    /// Remove a filter. Returns `false` if it was not installed.
    pub(crate) fn uninstall(&self, id: FilterId) -> bool {
        let Some((_, filter)) = self.filters.remove(&id) else { return false };
        self.live.fetch_sub(1, Ordering::AcqRel);
        metrics::record_filter_uninstalled();
        debug!(%id, %filter, age_ms = filter.age().as_millis(), "uninstalled filter");
        true
    }

    /// Fold newly committed blocks into every filter.
    pub(crate) fn notify_block<S: BlockSource + ?Sized>(&self, source: &S) {
        for mut filter in self.filters.iter_mut() {
            filter.catch_up(source);
        }
    }

    /// Record retracted blocks in every filter.
    pub(crate) fn notify_revert(&self, retracted: &[Arc<IndexedBlock>], new_head: u64) {
        for mut filter in self.filters.iter_mut() {
            filter.retract(retracted, new_head);
        }
    }

    /// Record an admitted pending transaction.
    pub(crate) fn notify_pending(&self, hash: B256) {
        for mut filter in self.filters.iter_mut() {
            filter.push_pending(hash);
        }
    }

    /// Remove filters not polled within the TTL.
    fn clean_stale(&self) {
        let ttl = self.ttl;
        let mut expired = 0;
        self.filters.retain(|_, filter| {
            let keep = filter.time_since_last_poll() < ttl;
            expired += usize::from(!keep);
            keep
        });
        if expired > 0 {
            self.live.fetch_sub(expired, Ordering::AcqRel);
            metrics::record_filters_expired(expired);
            debug!(expired, "cleaned stale filters");
        }
    }
}

/// Registry of poll filters.
///
/// Filters are stored in a [`DashMap`] keyed by filter ID, so operations on
/// unrelated filters proceed in parallel while each filter is mutated
/// under its shard lock. IDs are assigned sequentially from 1.
///
/// Calling [`Self::new`] spawns a thread that periodically removes filters
/// not polled within the TTL. [`DashMap::retain`] runs on that thread so it
/// never contends with async handlers.
#[derive(Debug, Clone)]
pub(crate) struct FilterManager {
    inner: Arc<FilterManagerInner>,
}

impl FilterManager {
    /// Create a filter manager and start its cleaner.
    pub(crate) fn new(max_filters: usize, ttl: Duration, clean_interval: Duration) -> Self {
        let inner = Arc::new(FilterManagerInner::new(max_filters, ttl));
        FilterCleanTask::new(Arc::downgrade(&inner), clean_interval).spawn();
        Self { inner }
    }
}

impl std::ops::Deref for FilterManager {
    type Target = FilterManagerInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// Task removing expired filters.
#[derive(Debug)]
struct FilterCleanTask {
    manager: Weak<FilterManagerInner>,
    sleep: Duration,
}

impl FilterCleanTask {
    const fn new(manager: Weak<FilterManagerInner>, sleep: Duration) -> Self {
        Self { manager, sleep }
    }

    fn spawn(self) {
        std::thread::spawn(move || {
            loop {
                std::thread::sleep(self.sleep);
                match self.manager.upgrade() {
                    Some(manager) => manager.clean_stale(),
                    None => break,
                }
            }
        });
    }
}
