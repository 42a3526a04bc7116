#![doc = include_str!("../README.md")]
#![warn(
    missing_copy_implementations,
    missing_debug_implementations,
    missing_docs,
    unreachable_pub,
    clippy::missing_const_for_fn,
    rustdoc::all
)]
#![cfg_attr(not(test), warn(unused_crate_dependencies))]
#![deny(unused_must_use, rust_2018_idioms)]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

mod config;
pub use config::GatewayConfig;

mod ctx;
pub use ctx::GatewayCtx;

mod error;
pub use error::FilterError;

mod gateway;
pub use gateway::{
    INTERNAL_ERROR, INVALID_PARAMS, INVALID_REQUEST, LIMIT_EXCEEDED, METHOD_NOT_FOUND,
    PARSE_ERROR, RpcError, SERVER_ERROR, serve_connection,
};

mod ingest;
pub use ingest::IngestError;

mod interest;

mod metrics;

mod serve;
pub use serve::{CorsDomainError, RpcServerGuard, ServeConfig, ServeError, http_router, ws_router};

#[cfg(test)]
pub(crate) mod test_utils;
