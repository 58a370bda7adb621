use std::fmt;
use std::io;
use std::time::Duration;

use thiserror::Error;

/// The error type returned by every [`Service`](crate::service::Service) operation.
#[derive(Error, Debug)]
pub enum Error {
    /// The service was configured without a bind address.
    #[error("missing bind addr")]
    MissingAddr,

    /// A required setting is missing or invalid.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// The transport could not be opened.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The background serve loop exited for a reason other than a requested shutdown.
    #[error("serve returned unexpected error: {0}")]
    Serve(#[source] io::Error),

    /// The background serve task panicked or was cancelled.
    #[error("serve task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Graceful shutdown did not finish before the deadline; remaining work was force-closed.
    #[error("graceful shutdown did not complete within {0:?}")]
    ShutdownTimeout(Duration),

    /// `start` was called on a service that was already started.
    #[error("service already started")]
    AlreadyStarted,

    /// One or more services failed to stop.
    #[error(transparent)]
    Stop(#[from] StopErrors),

    /// A failure raised by a service implementation outside this crate.
    #[error(transparent)]
    Other(Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl Error {
    /// Wraps an arbitrary error, for use by custom [`Service`](crate::service::Service) impls.
    pub fn other<E>(err: E) -> Self
    where
        E: Into<Box<dyn std::error::Error + Send + Sync + 'static>>,
    {
        Error::Other(err.into())
    }

    pub(crate) fn bind(addr: impl Into<String>, source: io::Error) -> Self {
        Error::Bind {
            addr: addr.into(),
            source,
        }
    }
}

impl From<Box<dyn std::error::Error + Send + Sync + 'static>> for Error {
    fn from(err: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        Error::Other(err)
    }
}

/// A single service's failure during a group stop.
#[derive(Debug)]
pub struct StopFailure {
    /// Registration position of the service within its group.
    pub index: usize,
    /// The service's [`name`](crate::service::Service::name).
    pub name: String,
    pub error: Error,
}

/// Every failure collected while stopping a [`MultiServer`](crate::server::MultiServer),
/// in registration order.
#[derive(Debug, Default)]
pub struct StopErrors {
    failures: Vec<StopFailure>,
}

impl StopErrors {
    pub(crate) fn push(&mut self, index: usize, name: impl Into<String>, error: Error) {
        self.failures.push(StopFailure {
            index,
            name: name.into(),
            error,
        });
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StopFailure> {
        self.failures.iter()
    }

    pub fn into_inner(self) -> Vec<StopFailure> {
        self.failures
    }
}

impl fmt::Display for StopErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} service(s) failed to stop", self.failures.len())?;
        for failure in &self.failures {
            write!(f, "; [{}] {}: {}", failure.index, failure.name, failure.error)?;
        }
        Ok(())
    }
}

impl std::error::Error for StopErrors {}

impl<'a> IntoIterator for &'a StopErrors {
    type Item = &'a StopFailure;
    type IntoIter = std::slice::Iter<'a, StopFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.failures.iter()
    }
}
