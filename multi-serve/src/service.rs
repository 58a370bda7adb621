use futures::future::BoxFuture;

use crate::error::Error;

/// A type alias for the future returned by [`Service::start`] and [`Service::stop`].
pub type ServiceFuture<'a> = BoxFuture<'a, Result<(), Error>>;

/// A long-running listener that can be started and stopped as part of a
/// [`MultiServer`](crate::server::MultiServer).
///
/// # Contract
///
/// * `start` opens the underlying transport before it returns, so bind
///   failures are reported to the caller. The accept/serve loop runs on a
///   spawned task; `start` does not wait for it.
/// * `stop` asks the serve loop to finish, waits for in-flight work up to the
///   service's own shutdown timeout and then forces the transport closed.
///   It must return `Ok(())` when the service was never started, when
///   `start` failed, or when it was already stopped.
pub trait Service: Send {
    /// A short human-readable label used in logs and errors.
    fn name(&self) -> &str {
        "service"
    }

    /// Opens the transport and launches the serve loop in the background.
    fn start(&mut self) -> ServiceFuture<'_>;

    /// Gracefully stops the serve loop.
    fn stop(&mut self) -> ServiceFuture<'_>;
}

impl<S> Service for Box<S>
where
    S: Service + ?Sized,
{
    fn name(&self) -> &str {
        (**self).name()
    }

    fn start(&mut self) -> ServiceFuture<'_> {
        (**self).start()
    }

    fn stop(&mut self) -> ServiceFuture<'_> {
        (**self).stop()
    }
}
