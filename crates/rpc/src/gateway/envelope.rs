//! JSON-RPC 2.0 request and response envelopes.

use crate::gateway::RpcError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A single call. `id` is `None` for notifications and `Some(Null)` for
/// an explicit `"id": null`.
#[derive(Debug, Deserialize)]
pub(crate) struct Request {
    #[serde(default)]
    pub(crate) jsonrpc: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub(crate) id: Option<Value>,
    pub(crate) method: String,
    #[serde(default)]
    pub(crate) params: Value,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl Request {
    /// True if the envelope declares JSON-RPC 2.0.
    pub(crate) fn is_v2(&self) -> bool {
        self.jsonrpc.as_deref() == Some("2.0")
    }
}

/// A response to a single call.
#[derive(Debug, Serialize)]
pub(crate) struct Response {
    jsonrpc: &'static str,
    id: Value,
    #[serde(flatten)]
    outcome: Outcome,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Outcome {
    Result(Value),
    Error(RpcError),
}

impl Response {
    pub(crate) fn new(id: Value, result: Result<Value, RpcError>) -> Self {
        let outcome = match result {
            Ok(value) => Outcome::Result(value),
            Err(err) => Outcome::Error(err),
        };
        Self { jsonrpc: "2.0", id, outcome }
    }

    pub(crate) fn error(id: Value, err: RpcError) -> Self {
        Self::new(id, Err(err))
    }
}
