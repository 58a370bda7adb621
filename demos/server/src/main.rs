use std::path::PathBuf;

use anyhow::Context;
use demo_server_lib::reverse;
use demo_server_lib::DemoConfig;
use demo_server_lib::DEFAULT_LOG_FILTER;
use demo_server_lib::GreeterServer;
use demo_server_lib::MyGreeter;
use multi_serve::adapter::http::HttpService;
use multi_serve::adapter::jsonrpc::JsonRpcService;
use multi_serve::adapter::packet::PacketServer;
use multi_serve::adapter::packet::PacketService;
use multi_serve::adapter::packet::StaticSecret;
use multi_serve::MultiServer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match std::env::args_os().nth(1).map(PathBuf::from) {
        Some(path) => {
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("reading {}", path.display()))?;
            serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?
        }
        None => DemoConfig::default(),
    };
    tracing::info!(?config, "configuration loaded");

    let greeter = MyGreeter::new("Chauncey");
    let packets = PacketService::from_config(
        &config.packet,
        PacketServer::new(reverse, StaticSecret::new(&config.packet_secret)),
    )?;

    let http = HttpService::from_config(&config.http, greeter.router());
    #[cfg(feature = "tls")]
    let http = match &config.tls {
        Some(files) => http.tls(files.load().await.context("loading TLS files")?),
        None => http,
    };

    let server = MultiServer::builder()
        .add(http)
        .add(JsonRpcService::from_config(&config.jsonrpc, greeter.clone().into_rpc()))
        .add(packets)
        .build();

    server.run().await?;

    tracing::info!("gracefully stopped");
    Ok(())
}
