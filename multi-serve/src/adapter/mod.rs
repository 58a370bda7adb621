//! [`Service`](crate::service::Service) implementations for concrete transports.
//!
//! Each adapter owns its listener exclusively and carries the same small set
//! of lifecycle options: a shutdown timeout, a skip-errors flag and the
//! [`Reporter`](crate::report::Reporter) that receives serve-loop failures.

use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::time::Duration;

use crate::error::Error;
use crate::report::default_reporter;
use crate::report::Fault;
use crate::report::SharedReporter;

#[cfg(feature = "http")]
pub mod http;
#[cfg(feature = "http")]
mod keepalive;
#[cfg(feature = "jsonrpsee")]
pub mod jsonrpc;
pub mod packet;

/// Lifecycle options shared by every adapter.
#[derive(Clone)]
pub(crate) struct Options {
    pub(crate) shutdown_timeout: Duration,
    pub(crate) skip_errors: bool,
    pub(crate) reporter: SharedReporter,
}

impl Options {
    pub(crate) fn new(shutdown_timeout: Duration) -> Self {
        Self {
            shutdown_timeout,
            skip_errors: false,
            reporter: default_reporter(),
        }
    }

    /// Options for an adapter whose `stop` bounds itself; `shutdown_timeout`
    /// is never read.
    pub(crate) fn untimed() -> Self {
        Self::new(Duration::MAX)
    }

    /// Applies the skip-errors policy to an operation outcome.
    pub(crate) fn outcome(&self, result: Result<(), Error>) -> Result<(), Error> {
        match result {
            Err(err) if self.skip_errors => {
                tracing::debug!(error = %err, "skipping error");
                Ok(())
            }
            other => other,
        }
    }

    /// Hands a serve-loop failure to the reporter unless errors are skipped.
    pub(crate) fn fault(&self, service: &str, error: Error) {
        if self.skip_errors {
            tracing::debug!(service, error = %error, "skipping serve error");
            return;
        }
        self.reporter.report(Fault::new(service, error));
    }
}

/// Resolves `addr`, keeping only addresses accepted by `family`.
pub(crate) fn resolve(
    addr: &str,
    family: impl Fn(&SocketAddr) -> bool,
) -> Result<Vec<SocketAddr>, Error> {
    if addr.is_empty() {
        return Err(Error::MissingAddr);
    }
    let addrs: Vec<SocketAddr> = addr
        .to_socket_addrs()
        .map_err(|e| Error::bind(addr, e))?
        .filter(|a| family(a))
        .collect();
    if addrs.is_empty() {
        return Err(Error::bind(
            addr,
            std::io::Error::new(
                std::io::ErrorKind::AddrNotAvailable,
                "no usable address for this network",
            ),
        ));
    }
    Ok(addrs)
}

/// Tries each resolved address in turn, returning the first successful bind.
pub(crate) fn bind_first<T>(
    addr: &str,
    candidates: &[SocketAddr],
    bind: impl Fn(SocketAddr) -> std::io::Result<T>,
) -> Result<T, Error> {
    let mut last = None;
    for candidate in candidates {
        match bind(*candidate) {
            Ok(bound) => return Ok(bound),
            Err(err) => last = Some(err),
        }
    }
    Err(Error::bind(
        addr,
        last.unwrap_or_else(|| std::io::Error::from(std::io::ErrorKind::AddrNotAvailable)),
    ))
}
