use alloy::{
    eips::BlockNumberOrTag,
    primitives::{Address, B256},
};
use gateway_types::MAX_TOPICS;
use serde::Deserialize;

/// A single constraint slot of a log filter.
///
/// `Any` is vacuously true, `One` requires equality, `Or` requires
/// membership.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Clause<T> {
    /// Unconstrained.
    #[default]
    Any,
    /// Exactly this value.
    One(T),
    /// Any of these values. Never empty.
    Or(Vec<T>),
}

impl<T: PartialEq> Clause<T> {
    /// True if the clause places no constraint.
    pub const fn is_any(&self) -> bool {
        matches!(self, Self::Any)
    }

    /// True if `value` satisfies the clause.
    pub fn matches(&self, value: &T) -> bool {
        match self {
            Self::Any => true,
            Self::One(v) => v == value,
            Self::Or(vs) => vs.contains(value),
        }
    }

    /// The values the clause accepts. Empty for `Any`.
    pub fn values(&self) -> &[T] {
        match self {
            Self::Any => &[],
            Self::One(v) => std::slice::from_ref(v),
            Self::Or(vs) => vs,
        }
    }

    /// Collapse degenerate sets: an empty set is `Any`, a singleton `One`.
    fn normalized(self) -> Self {
        match self {
            Self::Or(mut vs) if vs.len() <= 1 => vs.pop().map_or(Self::Any, Self::One),
            other => other,
        }
    }
}

impl From<Address> for Clause<Address> {
    fn from(value: Address) -> Self {
        Self::One(value)
    }
}

impl From<Vec<Address>> for Clause<Address> {
    fn from(values: Vec<Address>) -> Self {
        Self::Or(values).normalized()
    }
}

impl From<B256> for Clause<B256> {
    fn from(value: B256) -> Self {
        Self::One(value)
    }
}

impl From<Vec<B256>> for Clause<B256> {
    fn from(values: Vec<B256>) -> Self {
        Self::Or(values).normalized()
    }
}

/// Block selection of a [`LogCriteria`].
///
/// Symbolic markers stay symbolic here. They are resolved against the chain
/// head each time the criteria are evaluated, so `latest` follows the head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRange {
    /// Inclusive range between two block markers.
    Span {
        /// First block considered.
        from: BlockNumberOrTag,
        /// Last block considered.
        to: BlockNumberOrTag,
    },
    /// Exactly the block with this hash.
    Hash(B256),
}

impl Default for BlockRange {
    fn default() -> Self {
        Self::Span { from: BlockNumberOrTag::Latest, to: BlockNumberOrTag::Latest }
    }
}

/// Invalid filter structure, reported when the criteria are parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum CriteriaError {
    /// `blockHash` given together with `fromBlock` or `toBlock`.
    #[error("cannot specify both blockHash and fromBlock/toBlock")]
    HashWithRange,
    /// More topic positions than a log can carry.
    #[error("too many topic positions: {0} (max {MAX_TOPICS})")]
    TooManyTopics(usize),
}

/// A parsed log filter, as accepted by `eth_newFilter`, `eth_getLogs` and
/// `logs` subscriptions.
///
/// Addresses are OR-ed. Topic positions are AND-ed, values within a
/// position are OR-ed. Trailing unconstrained positions are dropped at
/// construction, so a log only needs as many topics as the last
/// constrained position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawCriteria")]
pub struct LogCriteria {
    range: BlockRange,
    address: Clause<Address>,
    topics: Vec<Clause<B256>>,
}

impl LogCriteria {
    /// Criteria matching every log of the head block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the first block.
    pub fn from_block(mut self, from: impl Into<BlockNumberOrTag>) -> Self {
        let to = match self.range {
            BlockRange::Span { to, .. } => to,
            BlockRange::Hash(_) => BlockNumberOrTag::Latest,
        };
        self.range = BlockRange::Span { from: from.into(), to };
        self
    }

    /// Set the last block.
    pub fn to_block(mut self, to: impl Into<BlockNumberOrTag>) -> Self {
        let from = match self.range {
            BlockRange::Span { from, .. } => from,
            BlockRange::Hash(_) => BlockNumberOrTag::Latest,
        };
        self.range = BlockRange::Span { from, to: to.into() };
        self
    }

    /// Restrict to a single block by hash.
    pub const fn at_block_hash(mut self, hash: B256) -> Self {
        self.range = BlockRange::Hash(hash);
        self
    }

    /// Set the address clause.
    pub fn address(mut self, address: impl Into<Clause<Address>>) -> Self {
        self.address = address.into();
        self
    }

    /// Constrain topic position `idx`.
    ///
    /// # Panics
    ///
    /// Panics if `idx` is not below [`MAX_TOPICS`].
    pub fn topic(mut self, idx: usize, topic: impl Into<Clause<B256>>) -> Self {
        assert!(idx < MAX_TOPICS, "topic position out of range");
        if self.topics.len() <= idx {
            self.topics.resize(idx + 1, Clause::Any);
        }
        self.topics[idx] = topic.into();
        self.trim_topics();
        self
    }

    /// The block selection.
    pub const fn block_range(&self) -> &BlockRange {
        &self.range
    }

    /// The address clause.
    pub const fn address_clause(&self) -> &Clause<Address> {
        &self.address
    }

    /// The topic clauses, one per constrained position.
    pub fn topic_clauses(&self) -> &[Clause<B256>] {
        &self.topics
    }

    fn trim_topics(&mut self) {
        while self.topics.last().is_some_and(Clause::is_any) {
            self.topics.pop();
        }
    }
}

/// Wire form: a single value or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T: PartialEq> From<Option<OneOrMany<T>>> for Clause<T> {
    fn from(value: Option<OneOrMany<T>>) -> Self {
        match value {
            None => Self::Any,
            Some(OneOrMany::One(v)) => Self::One(v),
            Some(OneOrMany::Many(vs)) => Self::Or(vs).normalized(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCriteria {
    #[serde(default)]
    from_block: Option<BlockNumberOrTag>,
    #[serde(default)]
    to_block: Option<BlockNumberOrTag>,
    #[serde(default)]
    block_hash: Option<B256>,
    #[serde(default)]
    address: Option<OneOrMany<Address>>,
    #[serde(default)]
    topics: Option<Vec<Option<OneOrMany<B256>>>>,
}

impl TryFrom<RawCriteria> for LogCriteria {
    type Error = CriteriaError;

    fn try_from(raw: RawCriteria) -> Result<Self, Self::Error> {
        let range = match (raw.block_hash, raw.from_block, raw.to_block) {
            (Some(hash), None, None) => BlockRange::Hash(hash),
            (Some(_), _, _) => return Err(CriteriaError::HashWithRange),
            (None, from, to) => BlockRange::Span {
                from: from.unwrap_or(BlockNumberOrTag::Latest),
                to: to.unwrap_or(BlockNumberOrTag::Latest),
            },
        };

        let topics = raw.topics.unwrap_or_default();
        if topics.len() > MAX_TOPICS {
            return Err(CriteriaError::TooManyTopics(topics.len()));
        }

        let mut criteria = Self {
            range,
            address: raw.address.into(),
            topics: topics.into_iter().map(Clause::from).collect(),
        };
        criteria.trim_topics();
        Ok(criteria)
    }
}
