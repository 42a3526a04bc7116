use metrics::{Counter, Gauge, counter, describe_counter, describe_gauge, gauge};
use std::sync::LazyLock;

const BLOCKS_INGESTED: &str = "gateway.blocks_ingested";
const BLOCKS_INGESTED_HELP: &str = "Number of blocks committed to the canonical chain";

const BLOCKS_REVERTED: &str = "gateway.blocks_reverted";
const BLOCKS_REVERTED_HELP: &str = "Number of blocks retracted by reorgs";

const INGEST_FAILURES: &str = "gateway.ingest_failures";
const INGEST_FAILURES_HELP: &str = "Number of blocks rejected by indexing or the chain store";

const LOGS_INDEXED: &str = "gateway.logs_indexed";
const LOGS_INDEXED_HELP: &str = "Number of logs indexed from committed blocks";

const PENDING_ADMITTED: &str = "gateway.pending_admitted";
const PENDING_ADMITTED_HELP: &str = "Number of distinct pending transactions admitted";

const FILTERS_INSTALLED: &str = "gateway.filters_installed";
const FILTERS_INSTALLED_HELP: &str = "Number of poll filters installed";

const FILTERS_UNINSTALLED: &str = "gateway.filters_uninstalled";
const FILTERS_UNINSTALLED_HELP: &str = "Number of poll filters uninstalled by clients";

const FILTERS_EXPIRED: &str = "gateway.filters_expired";
const FILTERS_EXPIRED_HELP: &str = "Number of poll filters removed for inactivity";

const FILTERS_LIVE: &str = "gateway.filters_live";
const FILTERS_LIVE_HELP: &str = "Number of live poll filters";

const SUBSCRIPTIONS_OPENED: &str = "gateway.subscriptions_opened";
const SUBSCRIPTIONS_OPENED_HELP: &str = "Number of subscriptions registered";

const SUBSCRIPTIONS_CLOSED: &str = "gateway.subscriptions_closed";
const SUBSCRIPTIONS_CLOSED_HELP: &str = "Number of subscriptions ended by unsubscribe or disconnect";

const SUBSCRIPTION_OVERFLOWS: &str = "gateway.subscription_overflows";
const SUBSCRIPTION_OVERFLOWS_HELP: &str = "Number of subscriptions terminated by a full queue";

const SCANS: &str = "gateway.scans";
const SCANS_HELP: &str = "Number of log range scans started";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    describe_counter!(BLOCKS_INGESTED, BLOCKS_INGESTED_HELP);
    describe_counter!(BLOCKS_REVERTED, BLOCKS_REVERTED_HELP);
    describe_counter!(INGEST_FAILURES, INGEST_FAILURES_HELP);
    describe_counter!(LOGS_INDEXED, LOGS_INDEXED_HELP);
    describe_counter!(PENDING_ADMITTED, PENDING_ADMITTED_HELP);
    describe_counter!(FILTERS_INSTALLED, FILTERS_INSTALLED_HELP);
    describe_counter!(FILTERS_UNINSTALLED, FILTERS_UNINSTALLED_HELP);
    describe_counter!(FILTERS_EXPIRED, FILTERS_EXPIRED_HELP);
    describe_gauge!(FILTERS_LIVE, FILTERS_LIVE_HELP);
    describe_counter!(SUBSCRIPTIONS_OPENED, SUBSCRIPTIONS_OPENED_HELP);
    describe_counter!(SUBSCRIPTIONS_CLOSED, SUBSCRIPTIONS_CLOSED_HELP);
    describe_counter!(SUBSCRIPTION_OVERFLOWS, SUBSCRIPTION_OVERFLOWS_HELP);
    describe_counter!(SCANS, SCANS_HELP);
});

fn described_counter(name: &'static str) -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(name)
}

fn filters_live() -> Gauge {
    LazyLock::force(&DESCRIBE);
    gauge!(FILTERS_LIVE)
}

pub(crate) fn record_block_ingested(logs: usize) {
    described_counter(BLOCKS_INGESTED).increment(1);
    described_counter(LOGS_INDEXED).increment(logs as u64);
}

pub(crate) fn record_ingest_failure() {
    described_counter(INGEST_FAILURES).increment(1);
}

pub(crate) fn record_blocks_reverted(count: usize) {
    described_counter(BLOCKS_REVERTED).increment(count as u64);
}

pub(crate) fn record_pending_admitted() {
    described_counter(PENDING_ADMITTED).increment(1);
}

pub(crate) fn record_filter_installed() {
    described_counter(FILTERS_INSTALLED).increment(1);
    filters_live().increment(1.0);
}

pub(crate) fn record_filter_uninstalled() {
    described_counter(FILTERS_UNINSTALLED).increment(1);
    filters_live().decrement(1.0);
}

pub(crate) fn record_filters_expired(count: usize) {
    if count == 0 {
        return;
    }
    described_counter(FILTERS_EXPIRED).increment(count as u64);
    filters_live().decrement(count as f64);
}

pub(crate) fn record_subscription_opened() {
    described_counter(SUBSCRIPTIONS_OPENED).increment(1);
}

pub(crate) fn record_subscriptions_closed(count: usize) {
    described_counter(SUBSCRIPTIONS_CLOSED).increment(count as u64);
}

pub(crate) fn record_subscription_overflow() {
    described_counter(SUBSCRIPTION_OVERFLOWS).increment(1);
}

pub(crate) fn record_scan() {
    described_counter(SCANS).increment(1);
}
