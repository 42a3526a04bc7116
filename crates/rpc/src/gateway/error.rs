//! JSON-RPC error objects.

use crate::FilterError;
use gateway_chain::QueryError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Display;

/// Invalid JSON was received.
pub const PARSE_ERROR: i64 = -32700;
/// The payload is not a valid request object.
pub const INVALID_REQUEST: i64 = -32600;
/// The method does not exist or is unavailable on this transport.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// Internal error.
pub const INTERNAL_ERROR: i64 = -32603;
/// Server error: unknown filter, filter cap, unknown block.
pub const SERVER_ERROR: i64 = -32000;
/// A query limit was exceeded.
pub const LIMIT_EXCEEDED: i64 = -32005;

/// A JSON-RPC error object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{message} ({code})")]
pub struct RpcError {
    /// Error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
    /// Optional structured detail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl RpcError {
    /// Create an error without data.
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self { code, message: message.into(), data: None }
    }

    /// Payload was not valid JSON.
    pub fn parse_error(err: impl Display) -> Self {
        Self::new(PARSE_ERROR, format!("parse error: {err}"))
    }

    /// Payload was JSON but not a request.
    pub fn invalid_request(err: impl Display) -> Self {
        Self::new(INVALID_REQUEST, format!("invalid request: {err}"))
    }

    /// Unknown method.
    pub fn method_not_found(method: &str) -> Self {
        Self::new(METHOD_NOT_FOUND, format!("the method {method} does not exist/is not available"))
    }

    /// Subscription methods called on a transport without push support.
    pub fn notifications_unsupported() -> Self {
        Self::new(METHOD_NOT_FOUND, "notifications not supported")
    }

    /// Parameters failed to parse or validate.
    pub fn invalid_params(err: impl Display) -> Self {
        Self::new(INVALID_PARAMS, format!("invalid params: {err}"))
    }

    /// Internal failure.
    pub fn internal(err: impl Display) -> Self {
        Self::new(INTERNAL_ERROR, err.to_string())
    }
}

impl From<FilterError> for RpcError {
    fn from(err: FilterError) -> Self {
        let code = match &err {
            FilterError::NotFound(_) | FilterError::CapacityExceeded { .. } => SERVER_ERROR,
            FilterError::UnsupportedKind(_) => INVALID_PARAMS,
            FilterError::Query(query) => match query {
                QueryError::InvalidRange { .. } => INVALID_PARAMS,
                QueryError::BlockRangeTooLarge { .. } | QueryError::TooManyResults { .. } => {
                    LIMIT_EXCEEDED
                }
                QueryError::BlockNotFound(_) => SERVER_ERROR,
                QueryError::Cancelled => INTERNAL_ERROR,
            },
            FilterError::Timeout(_) | FilterError::Task(_) => INTERNAL_ERROR,
        };
        Self::new(code, err.to_string())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use alloy::primitives::U64;

    #[test]
    fn filter_errors_map_to_codes() {
        let not_found = RpcError::from(FilterError::NotFound(U64::from(1)));
        assert_eq!(not_found.code, SERVER_ERROR);
        assert_eq!(not_found.message, "filter 0x1 not found");

        let cap = RpcError::from(FilterError::CapacityExceeded { max: 200 });
        assert_eq!(cap.message, "error creating filter: max limit reached");

        let range = RpcError::from(FilterError::from(QueryError::BlockRangeTooLarge { max: 10 }));
        assert_eq!(range.code, LIMIT_EXCEEDED);
        assert_eq!(range.message, "maximum [from, to] blocks distance: 10");

        let inverted = RpcError::from(FilterError::from(QueryError::InvalidRange { from: 2, to: 1 }));
        assert_eq!(inverted.code, INVALID_PARAMS);
    }

    #[test]
    fn omits_empty_data() {
        let value = serde_json::to_value(RpcError::new(-1, "boom")).unwrap();
        assert_eq!(value, serde_json::json!({ "code": -1, "message": "boom" }));
    }
}
