use crate::{FeedEvent, NodeConfig, NodeStatus, metrics};
use eyre::Context;
use gateway_chain::{BlockSource, ChainStore};
use gateway_rpc::{GatewayCtx, RpcServerGuard};
use std::fmt;
use tokio::{
    io::{AsyncBufRead, AsyncBufReadExt, BufReader},
    sync::watch,
};
use tracing::{debug, error, info, instrument};

/// A gateway node: the shared context, its transports and the block feed
/// driving it.
pub struct GatewayNode {
    config: NodeConfig,
    ctx: GatewayCtx,
    status: watch::Sender<NodeStatus>,
}

impl fmt::Debug for GatewayNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayNode").field("config", &self.config).finish_non_exhaustive()
    }
}

impl GatewayNode {
    /// Create a node over an empty chain. Returns the node and a receiver
    /// for its status updates.
    pub fn new(config: NodeConfig) -> (Self, watch::Receiver<NodeStatus>) {
        let ctx = GatewayCtx::new(ChainStore::new(), config.chain_id, config.gateway_config());
        let (status, receiver) = watch::channel(NodeStatus::Booting);
        (Self { config, ctx, status }, receiver)
    }

    /// The shared gateway context.
    pub const fn ctx(&self) -> &GatewayCtx {
        &self.ctx
    }

    /// Start the transports and apply the configured feed, then serve
    /// until ctrl-c. A feed failure is logged and the node keeps serving
    /// the chain ingested so far.
    pub async fn start(self) -> eyre::Result<()> {
        let guard = self.start_rpc().await?;
        debug!(?guard, "transports started");

        tokio::select! {
            res = self.run_configured_feed() => {
                if let Err(err) = res {
                    // using `:#` invokes the alternate formatter, which for
                    // eyre includes cause reporting.
                    let err = format!("{err:#}");
                    error!(err, head = self.ctx.chain().latest(), "block feed stopped");
                }
            }
            res = tokio::signal::ctrl_c() => {
                res.wrap_err("failed to listen for ctrl-c")?;
                info!("gateway shutting down");
                return Ok(());
            }
        }

        tokio::signal::ctrl_c().await.wrap_err("failed to listen for ctrl-c")?;
        info!("gateway shutting down");
        Ok(())
    }

    async fn start_rpc(&self) -> eyre::Result<RpcServerGuard> {
        let serve = self.config.serve_config();
        let guard = serve.serve(self.ctx.clone()).await.wrap_err("failed to start RPC servers")?;
        info!(
            http = ?guard.http_addr(),
            ws = ?guard.ws_addr(),
            chain_id = self.ctx.chain_id(),
            "gateway serving"
        );
        Ok(guard)
    }

    async fn run_configured_feed(&self) -> eyre::Result<u64> {
        match &self.config.feed_path {
            Some(path) => {
                let file = tokio::fs::File::open(path)
                    .await
                    .wrap_err_with(|| format!("failed to open feed {}", path.display()))?;
                info!(path = %path.display(), "reading block feed");
                self.run_feed(BufReader::new(file)).await
            }
            None => {
                info!("reading block feed from stdin");
                self.run_feed(BufReader::new(tokio::io::stdin())).await
            }
        }
    }

    /// Apply every event of a newline-delimited feed in order. Returns the
    /// number of events applied.
    ///
    /// Blank lines are skipped. A malformed line or a rejected event stops
    /// the feed. Events are applied on the blocking pool, since ingest
    /// takes std locks and walks every live filter.
    #[instrument(skip_all)]
    pub async fn run_feed<R: AsyncBufRead + Unpin>(&self, reader: R) -> eyre::Result<u64> {
        let mut lines = reader.lines();
        let mut line_no = 0u64;
        let mut applied = 0u64;

        while let Some(line) = lines.next_line().await.wrap_err("error reading block feed")? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let event: FeedEvent = serde_json::from_str(line)
                .wrap_err_with(|| format!("malformed feed event on line {line_no}"))?;
            metrics::record_event_received(&event);
            let ctx = self.ctx.clone();
            tokio::task::spawn_blocking(move || event.apply(&ctx))
                .await
                .wrap_err("feed ingest task failed")?
                .wrap_err_with(|| format!("rejected feed event on line {line_no}"))?;
            metrics::record_event_processed();
            applied += 1;

            let head = self.ctx.chain().latest();
            self.status.send_modify(|s| *s = NodeStatus::AtHeight(head));
        }

        let head = self.ctx.chain().latest();
        self.status.send_modify(|s| *s = NodeStatus::FeedEnded(head));
        info!(applied, head, "block feed ended");
        Ok(applied)
    }
}
