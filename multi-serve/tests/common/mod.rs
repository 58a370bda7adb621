//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use multi_serve::error::Error;
use multi_serve::service::{Service, ServiceFuture};

/// Returns a loopback TCP address that was free a moment ago.
pub fn free_tcp_addr() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap()
}

/// Returns a loopback UDP address that was free a moment ago.
pub fn free_udp_addr() -> SocketAddr {
    let socket = std::net::UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.local_addr().unwrap()
}

/// Whether something accepts TCP connections on `addr`.
pub async fn has_listener(addr: SocketAddr) -> bool {
    matches!(
        tokio::time::timeout(Duration::from_millis(200), tokio::net::TcpStream::connect(addr)).await,
        Ok(Ok(_))
    )
}

/// Call counters shared between a test and its fake services.
#[derive(Debug, Default)]
pub struct Calls {
    pub start: AtomicUsize,
    pub stop: AtomicUsize,
}

impl Calls {
    pub fn starts(&self) -> usize {
        self.start.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stop.load(Ordering::SeqCst)
    }
}

/// A service whose outcomes are scripted by the test.
pub struct FakeService {
    pub name: String,
    pub start_err: Option<String>,
    pub stop_err: Option<String>,
    pub calls: Arc<Calls>,
}

impl FakeService {
    pub fn new(name: &str) -> (Self, Arc<Calls>) {
        let calls = Arc::new(Calls::default());
        let svc = Self {
            name: name.to_string(),
            start_err: None,
            stop_err: None,
            calls: calls.clone(),
        };
        (svc, calls)
    }

    pub fn failing_start(mut self, msg: &str) -> Self {
        self.start_err = Some(msg.to_string());
        self
    }

    pub fn failing_stop(mut self, msg: &str) -> Self {
        self.stop_err = Some(msg.to_string());
        self
    }

    pub fn boxed(self) -> Box<dyn Service> {
        Box::new(self)
    }
}

impl Service for FakeService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> ServiceFuture<'_> {
        self.calls.start.fetch_add(1, Ordering::SeqCst);
        let err = self.start_err.clone();
        Box::pin(async move {
            match err {
                Some(msg) => Err(Error::other(msg)),
                None => Ok(()),
            }
        })
    }

    fn stop(&mut self) -> ServiceFuture<'_> {
        self.calls.stop.fetch_add(1, Ordering::SeqCst);
        let err = self.stop_err.clone();
        Box::pin(async move {
            match err {
                Some(msg) => Err(Error::other(msg)),
                None => Ok(()),
            }
        })
    }
}
