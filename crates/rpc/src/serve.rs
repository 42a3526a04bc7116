//! RPC transports (HTTP and WebSocket).
//!
//! The [`ServeConfig`] describes which addresses to bind;
//! [`ServeConfig::serve`] starts all configured transports and returns an
//! [`RpcServerGuard`] that shuts them down on drop.
//!
//! HTTP carries request/response calls only. WebSocket connections are
//! persistent and additionally carry subscriptions, whose lifetime is
//! bound to the socket.

use crate::{
    GatewayCtx,
    gateway::{handle_payload, serve_connection},
};
use axum::{
    Router,
    body::Bytes,
    extract::{
        State, WebSocketUpgrade,
        ws::{Message, WebSocket},
    },
    http::{HeaderValue, Method, StatusCode, header},
    response::{IntoResponse, Response},
    routing::post,
};
use futures_util::{SinkExt, StreamExt};
use std::{future::IntoFuture, net::SocketAddr};
use tokio::{sync::mpsc, task::JoinHandle};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::{debug, error, info, trace};

/// Inbound messages buffered per WebSocket before the reader waits.
const INBOUND_BUFFER: usize = 64;

/// Errors that can occur when starting the RPC server.
#[derive(Debug, thiserror::Error)]
pub enum ServeError {
    /// An I/O error (bind failure, etc).
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Invalid CORS configuration.
    #[error(transparent)]
    Cors(#[from] CorsDomainError),
}

/// Error parsing a CORS domain configuration string.
#[derive(Debug, thiserror::Error)]
pub enum CorsDomainError {
    /// Wildcard `*` was mixed with explicit origins.
    #[error("wildcard origin `*` cannot be combined with other domains: {input}")]
    WildCardNotAllowed {
        /// The raw input string.
        input: String,
    },
    /// A domain could not be parsed as an HTTP header value.
    #[error("invalid CORS header value: {domain}")]
    InvalidHeader {
        /// The domain string that failed to parse.
        domain: String,
    },
}

/// Guard that shuts down the RPC servers on drop.
#[derive(Default)]
pub struct RpcServerGuard {
    http: Option<(SocketAddr, JoinHandle<()>)>,
    ws: Option<(SocketAddr, JoinHandle<()>)>,
}

impl RpcServerGuard {
    /// Address the HTTP transport is bound to, if running.
    pub fn http_addr(&self) -> Option<SocketAddr> {
        self.http.as_ref().map(|(addr, _)| *addr)
    }

    /// Address the WebSocket transport is bound to, if running.
    pub fn ws_addr(&self) -> Option<SocketAddr> {
        self.ws.as_ref().map(|(addr, _)| *addr)
    }
}

impl core::fmt::Debug for RpcServerGuard {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RpcServerGuard")
            .field("http", &self.http_addr())
            .field("ws", &self.ws_addr())
            .finish()
    }
}

impl Drop for RpcServerGuard {
    fn drop(&mut self) {
        if let Some((_, http)) = self.http.take() {
            http.abort();
        }
        if let Some((_, ws)) = self.ws.take() {
            ws.abort();
        }
    }
}

/// Configuration for the RPC transport layer.
#[derive(Clone, Debug, Default)]
pub struct ServeConfig {
    /// HTTP server bind addresses.
    pub http: Vec<SocketAddr>,
    /// CORS header to use for HTTP (if any).
    pub http_cors: Option<String>,
    /// WebSocket server bind addresses.
    pub ws: Vec<SocketAddr>,
    /// CORS header to use for WebSocket (if any).
    pub ws_cors: Option<String>,
}

impl ServeConfig {
    /// Serve the gateway on all configured transports.
    ///
    /// Returns an [`RpcServerGuard`] that aborts the servers on drop.
    pub async fn serve(&self, ctx: GatewayCtx) -> Result<RpcServerGuard, ServeError> {
        let (http, ws) = tokio::try_join!(self.serve_http(ctx.clone()), self.serve_ws(ctx))?;
        Ok(RpcServerGuard { http, ws })
    }

    /// Start the HTTP transport (if configured).
    async fn serve_http(
        &self,
        ctx: GatewayCtx,
    ) -> Result<Option<(SocketAddr, JoinHandle<()>)>, ServeError> {
        if self.http.is_empty() {
            return Ok(None);
        }
        let service = http_router(ctx).layer(make_cors(self.http_cors.as_deref())?);
        let served = bind_and_serve(&self.http, service).await?;
        info!(addr = %served.0, "serving HTTP RPC");
        Ok(Some(served))
    }

    /// Start the WebSocket transport (if configured).
    async fn serve_ws(
        &self,
        ctx: GatewayCtx,
    ) -> Result<Option<(SocketAddr, JoinHandle<()>)>, ServeError> {
        if self.ws.is_empty() {
            return Ok(None);
        }
        let service = ws_router(ctx).layer(make_cors(self.ws_cors.as_deref())?);
        let served = bind_and_serve(&self.ws, service).await?;
        info!(addr = %served.0, "serving WebSocket RPC");
        Ok(Some(served))
    }
}

fn make_cors(cors: Option<&str>) -> Result<CorsLayer, CorsDomainError> {
    let origins = match cors {
        None | Some("*") => AllowOrigin::any(),
        Some(cors) => {
            if cors.split(',').any(|o| o == "*") {
                return Err(CorsDomainError::WildCardNotAllowed { input: cors.to_string() });
            }
            cors.split(',')
                .map(|domain| {
                    domain
                        .parse::<HeaderValue>()
                        .map_err(|_| CorsDomainError::InvalidHeader { domain: domain.to_string() })
                })
                .collect::<Result<Vec<_>, _>>()?
                .into()
        }
    };

    Ok(CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_origin(origins)
        .allow_headers(Any))
}

/// Bind a TCP listener and serve the axum service.
async fn bind_and_serve(
    addrs: &[SocketAddr],
    service: Router,
) -> Result<(SocketAddr, JoinHandle<()>), ServeError> {
    let listener = tokio::net::TcpListener::bind(addrs).await?;
    let local = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(err) = axum::serve(listener, service).into_future().await {
            error!(%err, "error serving RPC via axum");
        }
    });
    Ok((local, handle))
}

/// Router answering JSON-RPC calls POSTed to `/`.
///
/// Subscription methods are unavailable on this router.
pub fn http_router(ctx: GatewayCtx) -> Router {
    Router::new().route("/", post(http_handler)).with_state(ctx)
}

/// Router accepting WebSocket upgrades on `/`. Plain POSTs to `/` are
/// answered as on [`http_router`].
pub fn ws_router(ctx: GatewayCtx) -> Router {
    Router::new().route("/", post(http_handler).get(ws_handler)).with_state(ctx)
}

async fn http_handler(State(ctx): State<GatewayCtx>, body: Bytes) -> Response {
    match handle_payload(&ctx, None, &body).await {
        Some(json) => ([(header::CONTENT_TYPE, "application/json")], json).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn ws_handler(State(ctx): State<GatewayCtx>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| handle_socket(ctx, socket))
}

/// Pump a socket through [`serve_connection`].
async fn handle_socket(ctx: GatewayCtx, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (in_tx, in_rx) = mpsc::channel(INBOUND_BUFFER);
    let (out_tx, mut out_rx) = mpsc::channel::<String>(ctx.config().subscription_buffer.max(1));

    let writer = tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            if sink.send(Message::Text(msg.into())).await.is_err() {
                trace!("socket closed by peer");
                break;
            }
        }
        let _ = sink.close().await;
    });
    let conn = tokio::spawn(serve_connection(ctx, in_rx, out_tx));

    while let Some(msg) = stream.next().await {
        let payload = match msg {
            Ok(Message::Text(text)) => text.as_str().to_owned(),
            Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                Ok(text) => text,
                Err(err) => {
                    debug!(%err, "dropping non-utf8 binary frame");
                    continue;
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(err) => {
                debug!(%err, "websocket read failed");
                break;
            }
        };
        if in_tx.send(payload).await.is_err() {
            break;
        }
    }

    drop(in_tx);
    let _ = conn.await;
    let _ = writer.await;
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn cors_parsing() {
        assert!(make_cors(None).is_ok());
        assert!(make_cors(Some("*")).is_ok());
        assert!(make_cors(Some("https://a.example,https://b.example")).is_ok());
        assert!(matches!(
            make_cors(Some("https://a.example,*")),
            Err(CorsDomainError::WildCardNotAllowed { .. })
        ));
        assert!(matches!(
            make_cors(Some("bad\ndomain")),
            Err(CorsDomainError::InvalidHeader { .. })
        ));
    }
}
