use futures::future::join_all;

use crate::builder::MultiServerBuilder;
use crate::error::Error;
use crate::error::StopErrors;
use crate::service::Service;
use crate::service::ServiceFuture;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Idle,
    /// `start` ran, successfully or not. Some services may be running.
    Started,
    Stopped,
}

/// Starts and stops a fixed group of services as one unit.
///
/// Startup is sequential and fail-fast: services start in registration order
/// and the first failure aborts the sequence, leaving the services before it
/// running. Shutdown is total: every service is stopped, concurrently, no
/// matter how the others fare, and all failures are returned together.
///
/// `MultiServer` is itself a [`Service`], so groups can be nested.
pub struct MultiServer {
    services: Vec<Box<dyn Service>>,
    phase: Phase,
}

impl MultiServer {
    /// Creates a group from `services` in order. `None` entries are dropped.
    ///
    /// ```
    /// # use multi_serve::prelude::*;
    /// let maybe_metrics: Option<Box<dyn Service>> = None;
    /// let server = MultiServer::new([maybe_metrics]);
    /// assert!(server.is_empty());
    /// ```
    pub fn new<I>(services: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Option<Box<dyn Service>>>,
    {
        Self {
            services: services.into_iter().filter_map(Into::into).collect(),
            phase: Phase::Idle,
        }
    }

    /// Creates a [`MultiServerBuilder`].
    pub fn builder() -> MultiServerBuilder {
        MultiServerBuilder::new()
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Starts every service in registration order, stopping at the first failure.
    ///
    /// The failing service's error is returned unchanged. Services started
    /// before it keep running; call [`stop`](Self::stop) to release them.
    pub async fn start(&mut self) -> Result<(), Error> {
        if self.phase != Phase::Idle {
            return Err(Error::AlreadyStarted);
        }
        self.phase = Phase::Started;

        tracing::info!(services = self.services.len(), "starting servers");
        for (index, service) in self.services.iter_mut().enumerate() {
            if let Err(err) = service.start().await {
                tracing::error!(index, service = %service.name(), error = %err, "server failed to start");
                return Err(err);
            }
            tracing::debug!(index, service = %service.name(), "server started");
        }
        Ok(())
    }

    /// Stops every service concurrently and collects all failures.
    ///
    /// Safe to call at any time, including after a failed `start` or a
    /// previous `stop`, which makes it a no-op.
    pub async fn stop(&mut self) -> Result<(), Error> {
        if self.phase == Phase::Stopped {
            return Ok(());
        }
        self.phase = Phase::Stopped;

        tracing::info!(services = self.services.len(), "stopping servers");
        let outcomes = join_all(self.services.iter_mut().map(|service| async move {
            let result = service.stop().await;
            (service.name().to_string(), result)
        }))
        .await;

        let mut errors = StopErrors::default();
        for (index, (name, result)) in outcomes.into_iter().enumerate() {
            if let Err(err) = result {
                tracing::warn!(index, service = %name, error = %err, "server failed to stop");
                errors.push(index, name, err);
            }
        }

        if errors.is_empty() {
            tracing::info!("all servers stopped");
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

impl Service for MultiServer {
    fn name(&self) -> &str {
        "multi-server"
    }

    fn start(&mut self) -> ServiceFuture<'_> {
        Box::pin(MultiServer::start(self))
    }

    fn stop(&mut self) -> ServiceFuture<'_> {
        Box::pin(MultiServer::stop(self))
    }
}
