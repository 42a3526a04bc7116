use crate::{GatewayCtx, gateway::handle_payload, interest::Connection};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, debug_span};

/// Serve one persistent connection.
///
/// Each inbound message is a JSON-RPC payload. Responses and subscription
/// notifications are written to `outbound` as serialized JSON. Messages are
/// handled in arrival order, and a subscription's first notification is
/// never written ahead of its `eth_subscribe` response.
///
/// Returns once `inbound` closes or `outbound` is dropped, and cancels
/// every subscription opened on the connection.
pub async fn serve_connection(
    ctx: GatewayCtx,
    mut inbound: mpsc::Receiver<String>,
    outbound: mpsc::Sender<String>,
) {
    let conn = Connection::open(ctx.subscriptions().clone(), outbound.clone());
    let span = debug_span!("connection", conn = %conn.id());

    async move {
        debug!("connection opened");
        while let Some(message) = inbound.recv().await {
            if let Some(response) = handle_payload(&ctx, Some(&conn), message.as_bytes()).await
                && outbound.send(response).await.is_err()
            {
                break;
            }
            conn.launch_staged();
        }
        debug!(subscriptions = ctx.subscriptions().count(conn.id()), "connection closed");
    }
    .instrument(span)
    .await
}
