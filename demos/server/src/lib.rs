// multi-serve/demos/server/src/lib.rs

use std::sync::Arc;

use axum::extract::Path;
use axum::routing::get;
use axum::Router;
use jsonrpsee::core::async_trait;
use jsonrpsee::core::RpcResult;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::types::ErrorObjectOwned;
use multi_serve::adapter::packet::Packet;
use multi_serve::config::HttpConfig;
use multi_serve::config::JsonRpcConfig;
use multi_serve::config::PacketConfig;
#[cfg(feature = "tls")]
use multi_serve::config::TlsFiles;
use serde::Deserialize;
use serde::Serialize;

/// Log filter used when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "multi_serve=debug,demo_server_lib=info,demo_server_bin=info";

/// Settings for every listener of the demo, loadable from a JSON file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DemoConfig {
    pub http: HttpConfig,
    pub jsonrpc: JsonRpcConfig,
    pub packet: PacketConfig,
    /// Shared secret for every UDP peer.
    pub packet_secret: String,
    /// Serves the HTTP listener over TLS when set.
    #[cfg(feature = "tls")]
    pub tls: Option<TlsFiles>,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            http: HttpConfig {
                addr: "127.0.0.1:9002".into(),
                ..HttpConfig::default()
            },
            jsonrpc: JsonRpcConfig {
                addr: "127.0.0.1:9003".into(),
                ..JsonRpcConfig::default()
            },
            packet: PacketConfig {
                addr: "127.0.0.1:9004".into(),
                ..PacketConfig::default()
            },
            packet_secret: "s3cret".into(),
            #[cfg(feature = "tls")]
            tls: None,
        }
    }
}

#[rpc(server)]
pub trait Greeter {
    /// A simple method that takes one positional parameter.
    #[method(name = "greet")]
    async fn greet(&self, name: String) -> RpcResult<String>;
}

#[derive(Clone)]
pub struct MyGreeter(pub Arc<String>);

impl MyGreeter {
    pub fn new(name: impl Into<String>) -> Self {
        Self(Arc::new(name.into()))
    }

    fn greeting(&self, name: &str) -> Result<String, String> {
        if name.is_empty() {
            return Err("Name cannot be empty".to_string());
        }
        Ok(format!("Hello, {}! My name is {}.", name, self.0))
    }

    /// REST routes served by the HTTP listener.
    pub fn router(&self) -> Router {
        let greeter = self.clone();
        Router::new().route(
            "/greet/{name}",
            get(move |Path(name): Path<String>| async move {
                tracing::info!(%name, "[greet] REST call");
                greeter.greeting(&name).unwrap_or_else(|e| e)
            }),
        )
    }
}

#[async_trait]
impl GreeterServer for MyGreeter {
    async fn greet(&self, name: String) -> RpcResult<String> {
        tracing::info!(%name, "[greet] JSON-RPC call");
        self.greeting(&name)
            .map_err(|e| ErrorObjectOwned::owned(-32000, e, None::<()>))
    }
}

/// UDP handler answering every datagram with its payload reversed.
pub async fn reverse(packet: Packet) -> Option<Vec<u8>> {
    tracing::debug!(peer = %packet.peer, len = packet.payload.len(), "[reverse] datagram");
    let mut payload = packet.payload;
    payload.reverse();
    Some(payload)
}
