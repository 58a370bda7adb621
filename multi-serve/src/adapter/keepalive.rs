use std::time::Duration;

use axum_server::accept::Accept;
use socket2::SockRef;
use socket2::TcpKeepalive;
use tokio::net::TcpStream;

/// Acceptor that enables TCP keep-alive on every accepted connection before
/// handing it to the wrapped acceptor (plain or TLS).
#[derive(Debug, Clone)]
pub(crate) struct KeepAliveAcceptor<A> {
    inner: A,
    period: Option<Duration>,
}

impl<A> KeepAliveAcceptor<A> {
    pub(crate) fn new(inner: A, period: Option<Duration>) -> Self {
        Self { inner, period }
    }
}

impl<A, S> Accept<TcpStream, S> for KeepAliveAcceptor<A>
where
    A: Accept<TcpStream, S>,
{
    type Stream = A::Stream;
    type Service = A::Service;
    type Future = A::Future;

    fn accept(&self, stream: TcpStream, service: S) -> Self::Future {
        if let Some(period) = self.period {
            if let Err(err) = set_keepalive(&stream, period) {
                tracing::debug!(error = %err, "failed to enable tcp keep-alive");
            }
        }
        self.inner.accept(stream, service)
    }
}

fn set_keepalive(stream: &TcpStream, period: Duration) -> std::io::Result<()> {
    let keepalive = TcpKeepalive::new().with_time(period);
    SockRef::from(stream).set_tcp_keepalive(&keepalive)
}
