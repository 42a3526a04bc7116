//! The JSON-RPC gateway: envelope handling, batches and method dispatch.

mod connection;
pub use connection::serve_connection;

mod endpoints;

mod envelope;
use envelope::{Request, Response};

mod error;
pub use error::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, LIMIT_EXCEEDED, METHOD_NOT_FOUND,
    PARSE_ERROR, RpcError, SERVER_ERROR,
};

use crate::{GatewayCtx, interest::Connection};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use tracing::{Instrument, debug, debug_span};

/// Handle a raw JSON-RPC payload: a single call or a batch.
///
/// Returns the serialized response, or `None` when nothing is owed to the
/// client (a notification, or a batch made only of notifications).
/// `conn` is the caller's connection on transports that support
/// subscriptions.
pub(crate) async fn handle_payload(
    ctx: &GatewayCtx,
    conn: Option<&Connection>,
    payload: &[u8],
) -> Option<String> {
    let value: Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(err) => return Some(to_json(&Response::error(Value::Null, RpcError::parse_error(err)))),
    };

    match value {
        Value::Array(calls) if calls.is_empty() => {
            Some(to_json(&Response::error(Value::Null, RpcError::invalid_request("empty batch"))))
        }
        Value::Array(calls) => {
            let mut responses = Vec::with_capacity(calls.len());
            for call in calls {
                responses.extend(handle_call(ctx, conn, call).await);
            }
            (!responses.is_empty()).then(|| to_json(&responses))
        }
        call => handle_call(ctx, conn, call).await.map(|response| to_json(&response)),
    }
}

async fn handle_call(ctx: &GatewayCtx, conn: Option<&Connection>, call: Value) -> Option<Response> {
    let request: Request = match serde_json::from_value(call) {
        Ok(request) => request,
        Err(err) => return Some(Response::error(Value::Null, RpcError::invalid_request(err))),
    };
    if !request.is_v2() {
        let id = request.id.unwrap_or(Value::Null);
        return Some(Response::error(id, RpcError::invalid_request("jsonrpc must be \"2.0\"")));
    }

    let span = debug_span!("rpc", method = %request.method);
    let result = dispatch(ctx, conn, &request.method, request.params).instrument(span).await;
    if let Err(err) = &result {
        debug!(method = %request.method, code = err.code, message = %err.message, "call failed");
    }

    request.id.map(|id| Response::new(id, result))
}

async fn dispatch(
    ctx: &GatewayCtx,
    conn: Option<&Connection>,
    method: &str,
    params: Value,
) -> Result<Value, RpcError> {
    match method {
        "eth_blockNumber" => respond(endpoints::block_number(ctx)),
        "eth_chainId" => respond(endpoints::chain_id(ctx)),
        "eth_newFilter" => respond(endpoints::new_filter(ctx, parse(params)?)),
        "eth_newBlockFilter" => respond(endpoints::new_block_filter(ctx)),
        "eth_newPendingTransactionFilter" => {
            respond(endpoints::new_pending_transaction_filter(ctx))
        }
        "eth_getFilterChanges" => respond(endpoints::get_filter_changes(ctx, parse(params)?)),
        "eth_getFilterLogs" => respond(endpoints::get_filter_logs(ctx, parse(params)?).await),
        "eth_uninstallFilter" => respond(endpoints::uninstall_filter(ctx, parse(params)?)),
        "eth_getLogs" => respond(endpoints::get_logs(ctx, parse(params)?).await),
        "eth_subscribe" => {
            let conn = conn.ok_or_else(RpcError::notifications_unsupported)?;
            respond(endpoints::subscribe(conn, parse(params)?))
        }
        "eth_unsubscribe" => {
            let conn = conn.ok_or_else(RpcError::notifications_unsupported)?;
            respond(endpoints::unsubscribe(conn, parse(params)?))
        }
        _ => Err(RpcError::method_not_found(method)),
    }
}

/// Parse positional params. Absent params parse as an empty list.
fn parse<T: DeserializeOwned>(params: Value) -> Result<T, RpcError> {
    let params = if params.is_null() { Value::Array(Vec::new()) } else { params };
    serde_json::from_value(params).map_err(RpcError::invalid_params)
}

fn respond<T: Serialize>(result: Result<T, RpcError>) -> Result<Value, RpcError> {
    serde_json::to_value(result?).map_err(RpcError::internal)
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_default()
}
