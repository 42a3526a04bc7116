use clap::Parser;
use gateway_rpc::{GatewayConfig, ServeConfig};
use std::{
    net::{IpAddr, Ipv4Addr, SocketAddr},
    num::{NonZeroU64, NonZeroUsize},
    path::PathBuf,
    time::Duration,
};

/// Default port for serving JSON-RPC over HTTP.
pub const DEFAULT_HTTP_PORT: u16 = 8545;

/// Default port for serving JSON-RPC over WebSocket.
pub const DEFAULT_WS_PORT: u16 = 8546;

/// Configuration for a gateway node.
///
/// Every option can be given as a flag or through its environment
/// variable. Zero values are rejected for the filter cap, filter TTL and
/// subscription buffer.
///
/// # Example
///
/// ```
/// use clap::Parser;
/// use gateway_node::NodeConfig;
///
/// let config = NodeConfig::try_parse_from(["gateway-node", "--chain-id", "10"]).unwrap();
/// assert_eq!(config.chain_id, 10);
/// assert_eq!(config.gateway_config().max_filters, 200);
/// ```
#[derive(Debug, Clone, Parser)]
#[command(name = "gateway-node", version, about = "Ethereum log filter and subscription gateway")]
pub struct NodeConfig {
    /// Interface the HTTP and WebSocket servers bind to.
    #[arg(long, env = "GATEWAY_HOST", default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED))]
    pub host: IpAddr,

    /// HTTP JSON-RPC port.
    #[arg(long, env = "GATEWAY_HTTP_PORT", default_value_t = DEFAULT_HTTP_PORT)]
    pub http_port: u16,

    /// WebSocket JSON-RPC port.
    #[arg(long, env = "GATEWAY_WS_PORT", default_value_t = DEFAULT_WS_PORT)]
    pub ws_port: u16,

    /// Comma-separated allowed CORS origins, or `*`.
    #[arg(long, env = "GATEWAY_CORS")]
    pub cors: Option<String>,

    /// Chain ID reported by `eth_chainId`.
    #[arg(long, env = "GATEWAY_CHAIN_ID", default_value_t = 1)]
    pub chain_id: u64,

    /// Maximum number of live poll filters.
    #[arg(long, env = "GATEWAY_FILTER_CAP", default_value = "200")]
    pub filter_cap: NonZeroUsize,

    /// Maximum logs returned by one query. `0` disables the cap.
    #[arg(long, env = "GATEWAY_LOGS_CAP", default_value_t = 10_000)]
    pub logs_cap: usize,

    /// Maximum `toBlock - fromBlock` of one query. `0` disables the cap.
    #[arg(long, env = "GATEWAY_BLOCK_RANGE_CAP", default_value_t = 10_000)]
    pub block_range_cap: u64,

    /// Seconds a filter may go unpolled before it is removed.
    #[arg(long, env = "GATEWAY_FILTER_TTL_SECS", default_value = "300")]
    pub filter_ttl_secs: NonZeroU64,

    /// Queue depth of each subscription.
    #[arg(long, env = "GATEWAY_SUB_BUFFER", default_value = "1024")]
    pub sub_buffer: NonZeroUsize,

    /// Newline-delimited JSON block feed. Read from stdin when unset.
    #[arg(long, env = "GATEWAY_FEED_PATH")]
    pub feed_path: Option<PathBuf>,
}

impl NodeConfig {
    /// Limits for the filter registry, subscriptions and queries.
    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            max_filters: self.filter_cap.get(),
            filter_ttl: Duration::from_secs(self.filter_ttl_secs.get()),
            max_blocks_per_filter: self.block_range_cap,
            max_logs_per_response: self.logs_cap,
            subscription_buffer: self.sub_buffer.get(),
            ..Default::default()
        }
    }

    /// Transport bindings.
    pub fn serve_config(&self) -> ServeConfig {
        ServeConfig {
            http: vec![SocketAddr::new(self.host, self.http_port)],
            http_cors: self.cors.clone(),
            ws: vec![SocketAddr::new(self.host, self.ws_port)],
            ws_cors: self.cors.clone(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn flags_override_defaults() {
        let config = NodeConfig::try_parse_from([
            "gateway-node",
            "--host",
            "127.0.0.1",
            "--http-port",
            "9000",
            "--filter-cap",
            "5",
            "--filter-ttl-secs",
            "10",
            "--logs-cap",
            "0",
        ])
        .unwrap();

        let gateway = config.gateway_config();
        assert_eq!(gateway.max_filters, 5);
        assert_eq!(gateway.filter_ttl, Duration::from_secs(10));
        assert_eq!(gateway.max_logs_per_response, 0);
        assert_eq!(config.serve_config().http, vec!["127.0.0.1:9000".parse().unwrap()]);
    }

    #[test]
    fn rejects_zero_limits() {
        for flag in ["--filter-cap", "--filter-ttl-secs", "--sub-buffer"] {
            assert!(NodeConfig::try_parse_from(["gateway-node", flag, "0"]).is_err(), "{flag}");
        }
    }
}
