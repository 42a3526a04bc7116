/// Items that can be sent via the status channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeStatus {
    /// Node is booting.
    Booting,
    /// The feed is being applied. Holds the current head.
    AtHeight(u64),
    /// The feed ended. Holds the final head.
    FeedEnded(u64),
}
