//! Subscription management for `eth_subscribe` / `eth_unsubscribe`.

use crate::{
    gateway::RpcError,
    interest::{InterestKind, SubscriptionItem},
    metrics,
};
use alloy::primitives::{B256, U64};
use dashmap::DashMap;
use gateway_chain::IndexedBlock;
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicU64, Ordering},
    },
};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, debug_span, trace, warn};

pub(crate) type SubscriptionId = U64;

/// Code carried by the final notification of an overflowed subscription.
const OVERFLOW_CODE: i64 = -32003;

/// Identifies a live client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ConnectionId(u64);

impl core::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// JSON-RPC subscription notification envelope.
#[derive(serde::Serialize)]
struct SubscriptionNotification<'a> {
    jsonrpc: &'static str,
    method: &'static str,
    params: SubscriptionParams<'a>,
}

/// Params field of a subscription notification.
#[derive(serde::Serialize)]
struct SubscriptionParams<'a> {
    subscription: SubscriptionId,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<&'a SubscriptionItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<RpcError>,
}

impl<'a> SubscriptionNotification<'a> {
    const fn new(params: SubscriptionParams<'a>) -> Self {
        Self { jsonrpc: "2.0", method: "eth_subscription", params }
    }

    fn item(subscription: SubscriptionId, item: &'a SubscriptionItem) -> Self {
        Self::new(SubscriptionParams { subscription, result: Some(item), error: None })
    }

    fn overflow(subscription: SubscriptionId) -> Self {
        let error = RpcError::new(OVERFLOW_CODE, "subscription queue overflow");
        Self::new(SubscriptionParams { subscription, result: None, error: Some(error) })
    }
}

/// A registered subscription, as held by the hub.
#[derive(Debug)]
struct ActiveSubscription {
    kind: InterestKind,
    queue: mpsc::Sender<SubscriptionItem>,
    token: CancellationToken,
}

/// Subscriptions of one connection. IDs are scoped to the connection.
#[derive(Debug)]
struct ConnectionSubs {
    next_id: u64,
    subs: HashMap<SubscriptionId, ActiveSubscription>,
}

impl Default for ConnectionSubs {
    fn default() -> Self {
        Self { next_id: 1, subs: HashMap::new() }
    }
}

/// Fan-out hub for push subscriptions.
///
/// Performs the following functions:
/// - tracks live connections and assigns connection-scoped IDs
/// - queues matching events per subscription, without blocking the
///   ingest pipeline
/// - terminates a subscription whose queue is full
/// - tears down every subscription of a connection on disconnect
#[derive(Clone)]
pub(crate) struct SubscriptionManager {
    inner: Arc<SubscriptionManagerInner>,
}

impl SubscriptionManager {
    /// Create a hub with the given per-subscription queue depth.
    pub(crate) fn new(buffer: usize) -> Self {
        Self { inner: Arc::new(SubscriptionManagerInner::new(buffer)) }
    }
}

impl core::ops::Deref for SubscriptionManager {
    type Target = SubscriptionManagerInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl core::fmt::Debug for SubscriptionManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("SubscriptionManager")
            .field("connections", &self.inner.connections.len())
            .finish_non_exhaustive()
    }
}

/// Inner logic for [`SubscriptionManager`].
#[derive(Debug)]
pub(crate) struct SubscriptionManagerInner {
    next_conn: AtomicU64,
    buffer: usize,
    connections: DashMap<ConnectionId, ConnectionSubs>,
}

impl SubscriptionManagerInner {
    fn new(buffer: usize) -> Self {
        Self { next_conn: AtomicU64::new(1), buffer: buffer.max(1), connections: DashMap::new() }
    }

    /// Register a new connection.
    fn connect(&self) -> ConnectionId {
        let id = ConnectionId(self.next_conn.fetch_add(1, Ordering::Relaxed));
        self.connections.insert(id, ConnectionSubs::default());
        id
    }

    /// Number of subscriptions held by a connection.
    pub(crate) fn count(&self, conn: ConnectionId) -> usize {
        self.connections.get(&conn).map_or(0, |c| c.subs.len())
    }

    /// Number of subscriptions across all connections.
    pub(crate) fn subscriber_count(&self) -> usize {
        self.connections.iter().map(|c| c.subs.len()).sum()
    }

    /// Register a subscription. Returns `None` if the connection is gone.
    fn subscribe(
        &self,
        conn: ConnectionId,
        kind: InterestKind,
    ) -> Option<(SubscriptionId, SubscriptionTask)> {
        let mut entry = self.connections.get_mut(&conn)?;

        let id = SubscriptionId::from(entry.next_id);
        entry.next_id += 1;

        let (tx, rx) = mpsc::channel(self.buffer);
        let token = CancellationToken::new();
        let name = kind.name();
        entry.subs.insert(id, ActiveSubscription { kind, queue: tx, token: token.clone() });

        metrics::record_subscription_opened();
        debug!(%conn, %id, kind = name, "registered new subscription");
        Some((id, SubscriptionTask { conn, id, kind: name, token, queue: rx }))
    }

    /// Cancel a subscription. Returns `false` if the connection holds no
    /// such subscription.
    pub(crate) fn unsubscribe(&self, conn: ConnectionId, id: SubscriptionId) -> bool {
        let Some(sub) = self.connections.get_mut(&conn).and_then(|mut c| c.subs.remove(&id))
        else {
            return false;
        };
        sub.token.cancel();
        metrics::record_subscriptions_closed(1);
        debug!(%conn, %id, "unsubscribed");
        true
    }

    /// Drop a connection and cancel all of its subscriptions.
    fn disconnect(&self, conn: ConnectionId) {
        let Some((_, subs)) = self.connections.remove(&conn) else { return };
        for sub in subs.subs.values() {
            sub.token.cancel();
        }
        metrics::record_subscriptions_closed(subs.subs.len());
        debug!(%conn, subscriptions = subs.subs.len(), "connection closed");
    }

    /// Queue events for every subscription. A subscription whose queue is
    /// full is removed without cancellation, which its forwarder reports
    /// to the client as an overflow.
    fn fan_out(&self, items_for: impl Fn(&InterestKind) -> Vec<SubscriptionItem>) {
        for mut entry in self.connections.iter_mut() {
            let conn = *entry.key();
            entry.subs.retain(|id, sub| {
                for item in items_for(&sub.kind) {
                    match sub.queue.try_send(item) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) => {
                            warn!(%conn, %id, "subscription queue overflow");
                            metrics::record_subscription_overflow();
                            return false;
                        }
                        Err(TrySendError::Closed(_)) => {
                            trace!(%conn, %id, "subscription forwarder gone");
                            return false;
                        }
                    }
                }
                true
            });
        }
    }

    /// Push a committed block to `newHeads` and `logs` subscribers.
    pub(crate) fn notify_block(&self, block: &IndexedBlock) {
        self.fan_out(|kind| kind.block_items(block));
    }

    /// Push removed logs of retracted blocks to `logs` subscribers.
    pub(crate) fn notify_revert(&self, retracted: &[Arc<IndexedBlock>]) {
        self.fan_out(|kind| retracted.iter().flat_map(|b| kind.retraction_items(b)).collect());
    }

    /// Push an admitted transaction to `newPendingTransactions` subscribers.
    pub(crate) fn notify_pending(&self, hash: B256) {
        self.fan_out(|kind| kind.pending_item(hash).into_iter().collect());
    }
}

/// Forwards one subscription's queue to its connection.
#[derive(Debug)]
pub(crate) struct SubscriptionTask {
    conn: ConnectionId,
    id: SubscriptionId,
    kind: &'static str,
    token: CancellationToken,
    queue: mpsc::Receiver<SubscriptionItem>,
}

impl SubscriptionTask {
    async fn task_future(self, outbound: mpsc::Sender<String>) {
        let SubscriptionTask { id, token, mut queue, .. } = self;

        loop {
            // NB: biased select ensures cancellation wins over queued
            // items once unsubscribe has returned.
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!("subscription cancelled");
                    break;
                }
                item = queue.recv() => {
                    let Some(item) = item else {
                        // the hub dropped the queue without cancelling
                        let _ = outbound.send(to_json(&SubscriptionNotification::overflow(id))).await;
                        break;
                    };
                    if outbound.send(to_json(&SubscriptionNotification::item(id, &item))).await.is_err() {
                        trace!("connection writer closed");
                        token.cancel();
                        break;
                    }
                }
            }
        }
    }

    /// Spawn the forwarder onto the runtime.
    fn spawn(self, outbound: mpsc::Sender<String>) {
        let span = debug_span!(parent: None, "SubscriptionTask", conn = %self.conn, id = %self.id, kind = self.kind);
        tokio::spawn(self.task_future(outbound).instrument(span));
    }
}

fn to_json(notification: &SubscriptionNotification<'_>) -> String {
    serde_json::to_string(notification).unwrap_or_default()
}

/// A client connection's handle on the hub.
///
/// Subscriptions registered through the handle are staged until
/// [`Connection::launch_staged`] is called, so the `eth_subscribe` response
/// reaches the client ahead of the first notification. Dropping the handle
/// disconnects, cancelling every subscription it owns.
#[derive(Debug)]
pub(crate) struct Connection {
    id: ConnectionId,
    hub: SubscriptionManager,
    outbound: mpsc::Sender<String>,
    staged: Mutex<Vec<SubscriptionTask>>,
}

impl Connection {
    /// Register a connection writing to `outbound`.
    pub(crate) fn open(hub: SubscriptionManager, outbound: mpsc::Sender<String>) -> Self {
        let id = hub.connect();
        Self { id, hub, outbound, staged: Mutex::new(Vec::new()) }
    }

    /// The connection's ID.
    pub(crate) const fn id(&self) -> ConnectionId {
        self.id
    }

    /// Register a subscription. Its forwarder starts at the next
    /// [`Self::launch_staged`].
    pub(crate) fn subscribe(&self, kind: InterestKind) -> Result<SubscriptionId, RpcError> {
        let (id, task) = self
            .hub
            .subscribe(self.id, kind)
            .ok_or_else(|| RpcError::internal("connection closed"))?;
        self.staged.lock().expect("staged lock poisoned").push(task);
        Ok(id)
    }

    /// Cancel a subscription owned by this connection.
    pub(crate) fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.hub.unsubscribe(self.id, id)
    }

    /// Start forwarders for subscriptions registered since the last call.
    pub(crate) fn launch_staged(&self) {
        let staged = std::mem::take(&mut *self.staged.lock().expect("staged lock poisoned"));
        for task in staged {
            task.spawn(self.outbound.clone());
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.hub.disconnect(self.id);
    }
}
