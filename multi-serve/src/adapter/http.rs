//! HTTP(S) listener backed by an axum [`Router`].

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use axum_server::Handle;
use futures::future::BoxFuture;
use futures::FutureExt;
use tokio::task::JoinHandle;

#[cfg(feature = "tls")]
use axum_server::tls_rustls::RustlsConfig;

use super::bind_first;
use super::keepalive::KeepAliveAcceptor;
use super::resolve;
use super::Options;
use crate::config::HttpConfig;
use crate::config::DEFAULT_HTTP_SHUTDOWN_TIMEOUT;
use crate::config::DEFAULT_KEEPALIVE;
use crate::error::Error;
use crate::report::SharedReporter;
use crate::service::Service;
use crate::service::ServiceFuture;

/// Serves an axum [`Router`] on one TCP address, optionally behind TLS.
///
/// On [`stop`](Service::stop) new connections are refused and in-flight
/// requests get up to the shutdown timeout (5s by default) to finish before
/// every remaining connection is force-closed. A zero timeout force-closes
/// immediately.
pub struct HttpService {
    name: String,
    addr: String,
    listener: Option<std::net::TcpListener>,
    router: Router,
    keepalive: Option<Duration>,
    #[cfg(feature = "tls")]
    tls: Option<RustlsConfig>,
    options: Options,
    running: Option<Running>,
}

struct Running {
    handle: Handle,
    task: JoinHandle<()>,
    local_addr: SocketAddr,
}

impl HttpService {
    /// Creates a service that binds `addr` when started.
    pub fn new(addr: impl Into<String>, router: Router) -> Self {
        let addr = addr.into();
        Self {
            name: format!("http://{}", addr),
            addr,
            listener: None,
            router,
            keepalive: Some(DEFAULT_KEEPALIVE),
            #[cfg(feature = "tls")]
            tls: None,
            options: Options::new(DEFAULT_HTTP_SHUTDOWN_TIMEOUT),
            running: None,
        }
    }

    /// Creates a service that serves on an already bound listener.
    pub fn from_listener(listener: std::net::TcpListener, router: Router) -> Self {
        let addr = listener
            .local_addr()
            .map(|a| a.to_string())
            .unwrap_or_default();
        let mut service = Self::new(addr, router);
        service.listener = Some(listener);
        service
    }

    pub fn from_config(config: &HttpConfig, router: Router) -> Self {
        Self::new(config.addr.clone(), router)
            .shutdown_timeout(config.shutdown_timeout)
            .skip_errors(config.skip_errors)
            .keepalive(config.keepalive)
    }

    /// Sets how long `stop` waits for in-flight requests. Zero means hard stop.
    pub fn shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.options.shutdown_timeout = timeout;
        self
    }

    /// When set, every `start`/`stop` failure is reported as success and
    /// serve-loop faults are not reported.
    pub fn skip_errors(mut self, skip: bool) -> Self {
        self.options.skip_errors = skip;
        self
    }

    /// Keep-alive period for accepted connections; `None` leaves the OS default.
    pub fn keepalive(mut self, period: Option<Duration>) -> Self {
        self.keepalive = period;
        self
    }

    pub fn reporter(mut self, reporter: SharedReporter) -> Self {
        self.options.reporter = reporter;
        self
    }

    /// Terminates TLS on accepted connections.
    #[cfg(feature = "tls")]
    pub fn tls(mut self, config: RustlsConfig) -> Self {
        self.name = format!("https://{}", self.addr);
        self.tls = Some(config);
        self
    }

    /// The bound address while the service is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    fn launch(&mut self) -> Result<(), Error> {
        if self.running.is_some() {
            return Err(Error::AlreadyStarted);
        }

        let listener = match self.listener.take() {
            Some(listener) => listener,
            None => {
                let candidates = resolve(&self.addr, |_| true)?;
                bind_first(&self.addr, &candidates, |a| std::net::TcpListener::bind(a))?
            }
        };
        listener
            .set_nonblocking(true)
            .map_err(|e| Error::bind(&self.addr, e))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::bind(&self.addr, e))?;

        let handle = Handle::new();
        let serve = self.serve(listener, handle.clone());

        let name = self.name.clone();
        let options = self.options.clone();
        let task = tokio::spawn(async move {
            // Ok is returned only once a requested shutdown has closed the listener.
            if let Err(err) = serve.await {
                options.fault(&name, Error::Serve(err));
            }
        });

        tracing::info!(address = %local_addr, service = %self.name, "HTTP server listening");
        self.running = Some(Running {
            handle,
            task,
            local_addr,
        });
        Ok(())
    }

    fn serve(
        &self,
        listener: std::net::TcpListener,
        handle: Handle,
    ) -> BoxFuture<'static, std::io::Result<()>> {
        let app = self.router.clone().into_make_service();
        let keepalive = self.keepalive;

        #[cfg(feature = "tls")]
        if let Some(tls) = self.tls.clone() {
            return axum_server::from_tcp_rustls(listener, tls)
                .map(|acceptor| KeepAliveAcceptor::new(acceptor, keepalive))
                .handle(handle)
                .serve(app)
                .boxed();
        }

        axum_server::from_tcp(listener)
            .map(|acceptor| KeepAliveAcceptor::new(acceptor, keepalive))
            .handle(handle)
            .serve(app)
            .boxed()
    }

    async fn shutdown(&mut self) -> Result<(), Error> {
        let Some(Running {
            handle,
            mut task,
            local_addr,
        }) = self.running.take()
        else {
            return Ok(());
        };

        let timeout = self.options.shutdown_timeout;
        if timeout.is_zero() {
            tracing::info!(address = %local_addr, "HTTP server closing");
            handle.shutdown();
            task.await?;
            return Ok(());
        }

        tracing::info!(address = %local_addr, ?timeout, "HTTP server shutting down");
        handle.graceful_shutdown(Some(timeout));
        match tokio::time::timeout(timeout, &mut task).await {
            Ok(joined) => {
                joined?;
                tracing::debug!(address = %local_addr, "HTTP server stopped");
                Ok(())
            }
            Err(_) => {
                handle.shutdown();
                task.await?;
                tracing::warn!(address = %local_addr, ?timeout, "HTTP connections force-closed");
                Err(Error::ShutdownTimeout(timeout))
            }
        }
    }
}

impl Service for HttpService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> ServiceFuture<'_> {
        Box::pin(async move {
            let result = self.launch();
            self.options.outcome(result)
        })
    }

    fn stop(&mut self) -> ServiceFuture<'_> {
        Box::pin(async move {
            let result = self.shutdown().await;
            self.options.outcome(result)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let svc = HttpService::new("127.0.0.1:8080", Router::new());
        assert_eq!(svc.name(), "http://127.0.0.1:8080");
        assert_eq!(svc.options.shutdown_timeout, Duration::from_secs(5));
        assert_eq!(svc.keepalive, Some(Duration::from_secs(180)));
        assert!(!svc.options.skip_errors);
        assert!(svc.local_addr().is_none());
    }

    #[test]
    fn from_config_applies_every_setting() {
        let config = HttpConfig {
            addr: "127.0.0.1:9000".into(),
            shutdown_timeout: Duration::ZERO,
            skip_errors: true,
            keepalive: None,
        };
        let svc = HttpService::from_config(&config, Router::new());
        assert_eq!(svc.addr, "127.0.0.1:9000");
        assert!(svc.options.shutdown_timeout.is_zero());
        assert!(svc.options.skip_errors);
        assert_eq!(svc.keepalive, None);
    }

    #[tokio::test]
    async fn stop_without_start_is_ok() {
        let mut svc = HttpService::new("", Router::new());
        assert!(svc.stop().await.is_ok());
        assert!(svc.stop().await.is_ok());
    }
}
