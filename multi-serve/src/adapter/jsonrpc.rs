//! JSON-RPC listener backed by a jsonrpsee server.

use std::net::SocketAddr;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use jsonrpsee::server::Methods;
use jsonrpsee::server::Server;
use jsonrpsee::server::ServerHandle;

use super::Options;
use crate::config::JsonRpcConfig;
use crate::error::Error;
use crate::report::SharedReporter;
use crate::service::Service;
use crate::service::ServiceFuture;

/// Serves a set of jsonrpsee [`Methods`] (for example an `RpcModule`) over
/// HTTP and WebSocket on one address.
///
/// Unlike [`HttpService`](crate::adapter::http::HttpService), `stop` adds no
/// timeout of its own: jsonrpsee's graceful stop waits for in-flight calls
/// and bounds itself.
pub struct JsonRpcService {
    name: String,
    addr: String,
    methods: Methods,
    options: Options,
    running: Option<Running>,
}

struct Running {
    handle: ServerHandle,
    stopping: Arc<AtomicBool>,
    local_addr: SocketAddr,
}

impl JsonRpcService {
    pub fn new(addr: impl Into<String>, methods: impl Into<Methods>) -> Self {
        let addr = addr.into();
        Self {
            name: format!("jsonrpc://{}", addr),
            addr,
            methods: methods.into(),
            options: Options::untimed(),
            running: None,
        }
    }

    pub fn from_config(config: &JsonRpcConfig, methods: impl Into<Methods>) -> Self {
        Self::new(config.addr.clone(), methods).skip_errors(config.skip_errors)
    }

    /// When set, every `start`/`stop` failure is reported as success and an
    /// unexpected server exit is not reported.
    pub fn skip_errors(mut self, skip: bool) -> Self {
        self.options.skip_errors = skip;
        self
    }

    pub fn reporter(mut self, reporter: SharedReporter) -> Self {
        self.options.reporter = reporter;
        self
    }

    /// The bound address while the service is running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.running.as_ref().map(|r| r.local_addr)
    }

    async fn launch(&mut self) -> Result<(), Error> {
        if self.running.is_some() {
            return Err(Error::AlreadyStarted);
        }
        if self.addr.is_empty() {
            return Err(Error::MissingAddr);
        }

        let server = Server::builder()
            .build(self.addr.as_str())
            .await
            .map_err(|e| Error::bind(&self.addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| Error::bind(&self.addr, e))?;
        let handle = server.start(self.methods.clone());

        let stopping = Arc::new(AtomicBool::new(false));
        let watcher = handle.clone();
        let requested = stopping.clone();
        let name = self.name.clone();
        let options = self.options.clone();
        tokio::spawn(async move {
            watcher.stopped().await;
            if !requested.load(Ordering::SeqCst) {
                options.fault(
                    &name,
                    Error::Serve(std::io::Error::other("server stopped without a stop request")),
                );
            }
        });

        tracing::info!(address = %local_addr, service = %self.name, "JSON-RPC server listening");
        self.running = Some(Running {
            handle,
            stopping,
            local_addr,
        });
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<(), Error> {
        let Some(running) = self.running.take() else {
            return Ok(());
        };

        tracing::info!(address = %running.local_addr, "JSON-RPC server shutting down");
        running.stopping.store(true, Ordering::SeqCst);
        // An already stopped server is the goal state.
        let _ = running.handle.stop();
        running.handle.stopped().await;
        tracing::debug!(address = %running.local_addr, "JSON-RPC server stopped");
        Ok(())
    }
}

impl Service for JsonRpcService {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(&mut self) -> ServiceFuture<'_> {
        Box::pin(async move {
            let result = self.launch().await;
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
