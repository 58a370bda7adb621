use crate::server::MultiServer;
use crate::service::Service;

/// A builder for assembling a [`MultiServer`] from heterogeneous services.
///
/// This provides a fluent interface mirroring [`MultiServer::new`]; services
/// are started in the order they are added.
#[derive(Default)]
pub struct MultiServerBuilder {
    services: Vec<Box<dyn Service>>,
}

impl MultiServerBuilder {
    /// Creates a new, empty `MultiServerBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a service to the group.
    ///
    /// # Arguments
    ///
    /// * `service` - Any [`Service`], for example an
    ///   [`HttpService`](crate::adapter::http::HttpService) or a nested [`MultiServer`].
    pub fn add<S>(self, service: S) -> Self
    where
        S: Service + 'static,
    {
        self.add_boxed(Box::new(service))
    }

    /// Adds an already boxed service.
    pub fn add_boxed(mut self, service: Box<dyn Service>) -> Self {
        self.services.push(service);
        self
    }

    /// Adds `service` if present. Absent services are skipped, so a
    /// constructor that yields "no service" can be passed straight through.
    pub fn add_optional(self, service: Option<Box<dyn Service>>) -> Self {
        match service {
            Some(service) => self.add_boxed(service),
            None => {
                tracing::debug!("skipping absent service");
                self
            }
        }
    }

    /// Consumes the builder, returning the assembled group. Nothing is started yet.
    pub fn build(self) -> MultiServer {
        MultiServer::new(self.services)
    }
}
