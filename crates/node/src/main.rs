use clap::Parser;
use gateway_node::{GatewayNode, NodeConfig, init_tracing};

#[tokio::main]
async fn main() -> eyre::Result<()> {
    init_tracing();
    let config = NodeConfig::parse();
    let (node, _status) = GatewayNode::new(config);
    node.start().await
}
