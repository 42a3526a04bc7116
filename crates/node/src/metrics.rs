use crate::FeedEvent;
use metrics::{Counter, counter, describe_counter};
use std::sync::LazyLock;

const EVENTS_RECEIVED: &str = "gateway.node.feed_events_received";
const EVENTS_RECEIVED_HELP: &str = "Number of feed events read";

const REVERTS_RECEIVED: &str = "gateway.node.feed_reverts_received";
const REVERTS_RECEIVED_HELP: &str = "Number of revert events read";

const EVENTS_PROCESSED: &str = "gateway.node.feed_events_processed";
const EVENTS_PROCESSED_HELP: &str = "Number of feed events applied";

static DESCRIBE: LazyLock<()> = LazyLock::new(|| {
    describe_counter!(EVENTS_RECEIVED, EVENTS_RECEIVED_HELP);
    describe_counter!(REVERTS_RECEIVED, REVERTS_RECEIVED_HELP);
    describe_counter!(EVENTS_PROCESSED, EVENTS_PROCESSED_HELP);
});

fn described_counter(name: &'static str) -> Counter {
    LazyLock::force(&DESCRIBE);
    counter!(name)
}

pub(crate) fn record_event_received(event: &FeedEvent) {
    described_counter(EVENTS_RECEIVED).increment(1);
    if matches!(event, FeedEvent::Revert(_)) {
        described_counter(REVERTS_RECEIVED).increment(1);
    }
}

pub(crate) fn record_event_processed() {
    described_counter(EVENTS_PROCESSED).increment(1);
}
