//! Method handlers.

use crate::{
    GatewayCtx,
    gateway::RpcError,
    interest::{Connection, FilterOutput, InterestKind, SubscriptionKind},
};
use alloy::primitives::U64;
use gateway_chain::{BlockSource, LogCriteria};
use gateway_types::LogRecord;
use serde::Deserialize;

/// Params of `eth_subscribe`: a kind and, for `logs`, optional criteria.
#[derive(Debug, Deserialize)]
pub(crate) struct SubscribeParams(SubscriptionKind, #[serde(default)] Option<LogCriteria>);

pub(crate) fn block_number(ctx: &GatewayCtx) -> Result<U64, RpcError> {
    Ok(U64::from(ctx.chain().latest()))
}

pub(crate) fn chain_id(ctx: &GatewayCtx) -> Result<U64, RpcError> {
    Ok(U64::from(ctx.chain_id()))
}

pub(crate) fn new_filter(ctx: &GatewayCtx, (criteria,): (LogCriteria,)) -> Result<U64, RpcError> {
    criteria.check_range().map_err(RpcError::invalid_params)?;
    ctx.install_filter(InterestKind::Log(Box::new(criteria))).map_err(Into::into)
}

pub(crate) fn new_block_filter(ctx: &GatewayCtx) -> Result<U64, RpcError> {
    ctx.install_filter(InterestKind::Block).map_err(Into::into)
}

pub(crate) fn new_pending_transaction_filter(ctx: &GatewayCtx) -> Result<U64, RpcError> {
    ctx.install_filter(InterestKind::PendingTransaction).map_err(Into::into)
}

pub(crate) fn get_filter_changes(
    ctx: &GatewayCtx,
    (id,): (U64,),
) -> Result<FilterOutput, RpcError> {
    ctx.filters().poll(id, ctx.chain()).map_err(Into::into)
}

pub(crate) async fn get_filter_logs(
    ctx: &GatewayCtx,
    (id,): (U64,),
) -> Result<Vec<LogRecord>, RpcError> {
    let criteria = ctx.filters().log_criteria(id)?;
    ctx.logs(criteria).await.map_err(Into::into)
}

pub(crate) fn uninstall_filter(ctx: &GatewayCtx, (id,): (U64,)) -> Result<bool, RpcError> {
    Ok(ctx.filters().uninstall(id))
}

pub(crate) async fn get_logs(
    ctx: &GatewayCtx,
    (criteria,): (LogCriteria,),
) -> Result<Vec<LogRecord>, RpcError> {
    ctx.logs(criteria).await.map_err(Into::into)
}

pub(crate) fn subscribe(
    conn: &Connection,
    SubscribeParams(kind, criteria): SubscribeParams,
) -> Result<U64, RpcError> {
    conn.subscribe(kind.into_interest(criteria))
}

pub(crate) fn unsubscribe(conn: &Connection, (id,): (U64,)) -> Result<bool, RpcError> {
    Ok(conn.unsubscribe(id))
}
