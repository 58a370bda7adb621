#![cfg(feature = "jsonrpsee")]

use jsonrpsee::core::{async_trait, RpcResult};
use jsonrpsee::proc_macros::rpc;
use multi_serve::config::JsonRpcConfig;
use multi_serve::error::Error;
use multi_serve::prelude::*;
use serde_json::json;

mod common;
use common::{free_tcp_addr, has_listener};

#[rpc(server)]
pub trait Greeter {
    #[method(name = "greet")]
    async fn greet(&self, name: String) -> RpcResult<String>;
}

struct MyGreeter;

#[async_trait]
impl GreeterServer for MyGreeter {
    async fn greet(&self, name: String) -> RpcResult<String> {
        Ok(format!("Hello, {name}!"))
    }
}

#[tokio::test]
async fn bad_addr() {
    let mut srv = JsonRpcService::new("", MyGreeter.into_rpc());
    assert!(matches!(srv.start().await, Err(Error::MissingAddr)));
    assert!(srv.stop().await.is_ok());

    let mut srv = JsonRpcService::new("foo", MyGreeter.into_rpc());
    assert!(matches!(srv.start().await, Err(Error::Bind { .. })));
    assert!(srv.stop().await.is_ok());
}

#[tokio::test]
async fn skip_errors() {
    let config = JsonRpcConfig {
        addr: "foo".into(),
        skip_errors: true,
    };
    let mut srv = JsonRpcService::from_config(&config, MyGreeter.into_rpc());
    assert!(srv.start().await.is_ok());
    assert!(srv.stop().await.is_ok());
}

#[tokio::test]
async fn serves_calls_until_stopped() {
    let addr = free_tcp_addr();
    let mut srv = JsonRpcService::new(addr.to_string(), MyGreeter.into_rpc());
    srv.start().await.unwrap();
    assert_eq!(srv.local_addr(), Some(addr));

    let client = reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap();
    let response: serde_json::Value = client
        .post(format!("http://{addr}"))
        .json(&json!({"jsonrpc": "2.0", "id": 1, "method": "greet", "params": ["Sally"]}))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response["result"], "Hello, Sally!");

    srv.stop().await.unwrap();
    assert!(!has_listener(addr).await);
    assert!(srv.stop().await.is_ok());
}
