//! Aggregator behaviour: fail-fast start, total stop, error aggregation.

use multi_serve::error::Error;
use multi_serve::prelude::*;

mod common;
use common::{has_listener, FakeService};

#[tokio::test]
async fn start_failure_skips_later_services_and_stop_reaches_the_rest() {
    let (a, a_calls) = FakeService::new("a");
    let (b, b_calls) = FakeService::new("b");
    let (c, c_calls) = FakeService::new("c");
    let mut server = MultiServer::new([
        a.failing_stop("a stop").boxed(),
        b.failing_start("b start").failing_stop("b stop").boxed(),
        c.boxed(),
    ]);

    let err = server.start().await.unwrap_err();
    assert_eq!(err.to_string(), "b start");
    assert_eq!(a_calls.starts(), 1);
    assert_eq!(b_calls.starts(), 1);
    assert_eq!(c_calls.starts(), 0);

    let err = server.stop().await.unwrap_err();
    assert_eq!(a_calls.stops(), 1);
    assert_eq!(b_calls.stops(), 1);
    assert_eq!(c_calls.stops(), 1);

    let Error::Stop(failures) = err else {
        panic!("expected aggregated stop error, got {err:?}");
    };
    let names: Vec<_> = failures.iter().map(|f| (f.index, f.name.as_str())).collect();
    assert_eq!(names, vec![(0, "a"), (1, "b")]);
}

#[tokio::test]
async fn absent_entries_are_ignored() {
    let (a, a_calls) = FakeService::new("a");
    let (b, b_calls) = FakeService::new("b");
    let mut server = MultiServer::new([
        None,
        Some(a.boxed()),
        None,
        Some(b.failing_stop("b stop").boxed()),
        None,
    ]);
    assert_eq!(server.len(), 2);

    server.start().await.unwrap();
    let Err(Error::Stop(failures)) = server.stop().await else {
        panic!("expected aggregated stop error");
    };
    // Indexes count present services only.
    assert_eq!(failures.len(), 1);
    assert_eq!(failures.iter().next().unwrap().index, 1);
    assert_eq!((a_calls.starts(), a_calls.stops()), (1, 1));
    assert_eq!((b_calls.starts(), b_calls.stops()), (1, 1));
}

#[tokio::test]
async fn one_failed_stop_out_of_three() {
    let (first, first_calls) = FakeService::new("first");
    let (second, second_calls) = FakeService::new("second");
    let (third, third_calls) = FakeService::new("third");
    let mut server = MultiServer::builder()
        .add(first)
        .add(second.failing_stop("test"))
        .add(third)
        .build();

    server.start().await.unwrap();
    let err = server.stop().await.unwrap_err();

    match err {
        Error::Stop(failures) => {
            assert_eq!(failures.len(), 1);
            let failure = failures.into_inner().remove(0);
            assert_eq!(failure.index, 1);
            assert_eq!(failure.name, "second");
            assert_eq!(failure.error.to_string(), "test");
        }
        other => panic!("unexpected error {other:?}"),
    }
    assert_eq!(first_calls.stops(), 1);
    assert_eq!(second_calls.stops(), 1);
    assert_eq!(third_calls.stops(), 1);
}

#[tokio::test]
async fn builder_skips_absent_services() {
    let (a, calls) = FakeService::new("a");
    let mut server = MultiServer::builder()
        .add_optional(None)
        .add_optional(Some(a.boxed()))
        .build();
    assert_eq!(server.len(), 1);

    server.start().await.unwrap();
    server.stop().await.unwrap();
    assert_eq!((calls.starts(), calls.stops()), (1, 1));
}

#[tokio::test]
async fn empty_group_starts_and_stops() {
    let mut server = MultiServer::new(Vec::<Box<dyn Service>>::new());
    assert!(server.is_empty());
    server.start().await.unwrap();
    server.stop().await.unwrap();
}

#[cfg(all(feature = "http", feature = "jsonrpsee"))]
mod transports {
    use super::*;
    use common::free_tcp_addr;
    use multi_serve::axum::{routing::get, Router};
    use multi_serve::jsonrpsee::RpcModule;

    #[tokio::test]
    async fn start_stop_http_and_jsonrpc() {
        let rpc_addr = free_tcp_addr();
        let http_addr = free_tcp_addr();
        let mut server = MultiServer::new([
            Box::new(JsonRpcService::new(rpc_addr.to_string(), RpcModule::new(()))) as Box<dyn Service>,
            Box::new(HttpService::new(http_addr.to_string(), Router::new())),
        ]);

        server.start().await.unwrap();
        assert!(has_listener(rpc_addr).await);
        assert!(has_listener(http_addr).await);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn failed_start_leaves_later_services_unbound() {
        let http_addr = free_tcp_addr();
        let mut server = MultiServer::builder()
            .add(JsonRpcService::new("foo", RpcModule::new(())))
            .add(HttpService::new(http_addr.to_string(), Router::new()))
            .build();

        assert!(server.start().await.is_err());
        assert!(!has_listener(http_addr).await);
        server.stop().await.unwrap();
    }

    #[tokio::test]
    async fn two_http_servers_accept_then_refuse() {
        let first = free_tcp_addr();
        let second = free_tcp_addr();
        let app = Router::new().route("/", get(|| async { "ok" }));
        let mut server = MultiServer::builder()
            .add(HttpService::new(first.to_string(), app.clone()))
            .add(HttpService::new(second.to_string(), app))
            .build();

        server.start().await.unwrap();
        assert!(has_listener(first).await);
        assert!(has_listener(second).await);

        server.stop().await.unwrap();
        assert!(!has_listener(first).await);
        assert!(!has_listener(second).await);
    }
}
